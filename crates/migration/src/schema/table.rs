//! Table specifications

use super::column::ColumnDef;
use super::validations::{validate_constraint_name, validate_table_name};
use crate::error::{MigrationError, MigrationResult};

/// Validated description of a table to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: Vec<String>,
    pk_constraint_name: String,
    auto_increment: bool,
}

impl TableSpec {
    /// Check every table-level invariant and freeze the specification.
    ///
    /// `columns` holds every column, primary key ones included, in creation
    /// order; `primary_key` lists key columns in key order.
    pub fn new(
        name: &str,
        columns: Vec<ColumnDef>,
        primary_key: Vec<String>,
        pk_constraint_name: Option<String>,
        auto_increment: bool,
    ) -> MigrationResult<Self> {
        validate_table_name(name)?;
        let invalid = |reason: String| {
            MigrationError::Specification(format!("Table '{}': {}", name, reason))
        };

        if columns.is_empty() {
            return Err(invalid("at least one column must be specified".to_string()));
        }

        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name() == column.name()) {
                return Err(invalid(format!("column '{}' is declared twice", column.name())));
            }
        }

        for pk in &primary_key {
            let column = columns
                .iter()
                .find(|c| c.name() == pk)
                .ok_or_else(|| {
                    invalid(format!("primary key column '{}' is not a column of the table", pk))
                })?;
            if column.is_nullable() {
                return Err(invalid(format!("primary key column '{}' must not be nullable", pk)));
            }
        }

        if auto_increment {
            let [pk] = primary_key.as_slice() else {
                return Err(invalid(
                    "auto increment requires exactly one primary key column".to_string(),
                ));
            };
            let column = columns.iter().find(|c| c.name() == pk).map(ColumnDef::column_type);
            if !column.map_or(false, |t| t.is_auto_increment_capable()) {
                return Err(invalid(format!(
                    "auto increment column '{}' must be an INTEGER or a BIGINT",
                    pk
                )));
            }
        }

        let pk_constraint_name = pk_constraint_name.unwrap_or_else(|| format!("pk_{}", name));
        if !primary_key.is_empty() {
            validate_constraint_name(&pk_constraint_name)?;
        }

        Ok(Self {
            name: name.to_string(),
            columns,
            primary_key,
            pk_constraint_name,
            auto_increment,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn pk_constraint_name(&self) -> &str {
        &self.pk_constraint_name
    }

    /// The auto-increment column, if the table has one
    pub fn auto_increment_column(&self) -> Option<&ColumnDef> {
        if self.auto_increment {
            self.primary_key.first().and_then(|pk| self.column(pk))
        } else {
            None
        }
    }
}
