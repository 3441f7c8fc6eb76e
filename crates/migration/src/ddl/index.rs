//! Index creation and removal

use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};
use crate::schema::validations::{validate_column_name, validate_index_name, validate_table_name};

#[derive(Debug, Clone)]
pub struct CreateIndexBuilder {
    table_name: String,
    index_name: String,
    unique: bool,
    columns: Vec<String>,
}

impl CreateIndexBuilder {
    pub fn new(table_name: &str, index_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            index_name: index_name.to_string(),
            unique: false,
            columns: Vec::new(),
        }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Add a column to the index, in index order
    pub fn add_column(mut self, column: &str) -> Self {
        self.columns.push(column.to_string());
        self
    }

    /// The statement is the same for every dialect
    pub fn build(self) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.table_name)?;
        validate_index_name(&self.index_name)?;
        if self.columns.is_empty() {
            return Err(MigrationError::Specification(format!(
                "Index '{}' must have at least one column",
                self.index_name
            )));
        }
        for column in &self.columns {
            validate_column_name(column)?;
        }

        Ok(vec![format!(
            "CREATE {}INDEX {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            self.index_name,
            self.table_name,
            self.columns.join(", ")
        )])
    }
}

#[derive(Debug, Clone)]
pub struct DropIndexBuilder {
    dialect: Dialect,
    table_name: String,
    index_name: String,
}

impl DropIndexBuilder {
    pub fn new(dialect: Dialect, table_name: &str, index_name: &str) -> Self {
        Self {
            dialect,
            table_name: table_name.to_string(),
            index_name: index_name.to_string(),
        }
    }

    pub fn build(self) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.table_name)?;
        validate_index_name(&self.index_name)?;
        let sql = match self.dialect {
            Dialect::MsSql => format!("DROP INDEX {} ON {}", self.index_name, self.table_name),
            Dialect::PostgreSql | Dialect::Oracle | Dialect::H2 => {
                format!("DROP INDEX {}", self.index_name)
            }
        };
        Ok(vec![sql])
    }
}
