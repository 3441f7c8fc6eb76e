//! Column type and nullability changes

use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};
use crate::schema::validations::validate_table_name;
use crate::schema::ColumnDef;

/// Redefine existing columns with a new type and nullability.
///
/// Default values are not altered; columns carrying one are rejected.
#[derive(Debug, Clone)]
pub struct AlterColumnsBuilder {
    dialect: Dialect,
    table_name: String,
    columns: Vec<ColumnDef>,
}

impl AlterColumnsBuilder {
    pub fn new(dialect: Dialect, table_name: &str) -> Self {
        Self {
            dialect,
            table_name: table_name.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn update_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.table_name)?;
        if self.columns.is_empty() {
            return Err(MigrationError::Specification(
                "At least one column must be altered".to_string(),
            ));
        }
        if let Some(column) = self.columns.iter().find(|c| c.default_value().is_some()) {
            return Err(MigrationError::Specification(format!(
                "Default value of column '{}' can't be altered",
                column.name()
            )));
        }

        let table = &self.table_name;
        let dialect = self.dialect;
        match dialect {
            Dialect::PostgreSql => {
                let mut clauses = Vec::with_capacity(self.columns.len() * 2);
                for column in &self.columns {
                    clauses.push(format!(
                        "ALTER COLUMN {} TYPE {}",
                        column.name(),
                        column.sql_type(dialect)?
                    ));
                    clauses.push(format!(
                        "ALTER COLUMN {} {}",
                        column.name(),
                        if column.is_nullable() { "DROP NOT NULL" } else { "SET NOT NULL" }
                    ));
                }
                Ok(vec![format!("ALTER TABLE {} {}", table, clauses.join(", "))])
            }
            Dialect::Oracle => {
                let definitions = self
                    .columns
                    .iter()
                    .map(|c| c.sql_definition(dialect))
                    .collect::<MigrationResult<Vec<_>>>()?;
                Ok(vec![format!("ALTER TABLE {} MODIFY ({})", table, definitions.join(", "))])
            }
            Dialect::MsSql | Dialect::H2 => self
                .columns
                .iter()
                .map(|c| {
                    Ok(format!(
                        "ALTER TABLE {} ALTER COLUMN {}",
                        table,
                        c.sql_definition(dialect)?
                    ))
                })
                .collect(),
        }
    }
}
