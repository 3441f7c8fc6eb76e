//! Column and table renames

use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};
use crate::schema::validations::{validate_column_name, validate_table_name};

/// Rename columns of one table, one statement per column
#[derive(Debug, Clone)]
pub struct RenameColumnsBuilder {
    dialect: Dialect,
    table_name: String,
    renames: Vec<(String, String)>,
}

impl RenameColumnsBuilder {
    pub fn new(dialect: Dialect, table_name: &str) -> Self {
        Self {
            dialect,
            table_name: table_name.to_string(),
            renames: Vec::new(),
        }
    }

    pub fn rename(mut self, from: &str, to: &str) -> Self {
        self.renames.push((from.to_string(), to.to_string()));
        self
    }

    pub fn build(self) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.table_name)?;
        if self.renames.is_empty() {
            return Err(MigrationError::Specification(
                "At least one column must be renamed".to_string(),
            ));
        }

        let table = &self.table_name;
        let mut statements = Vec::with_capacity(self.renames.len());
        for (from, to) in &self.renames {
            validate_column_name(from)?;
            validate_column_name(to)?;
            if from == to {
                return Err(MigrationError::Specification(format!(
                    "Column '{}' can't be renamed to itself",
                    from
                )));
            }
            statements.push(match self.dialect {
                Dialect::PostgreSql | Dialect::Oracle => {
                    format!("ALTER TABLE {} RENAME COLUMN {} TO {}", table, from, to)
                }
                Dialect::H2 => {
                    format!("ALTER TABLE {} ALTER COLUMN {} RENAME TO {}", table, from, to)
                }
                Dialect::MsSql => {
                    format!("EXEC sp_rename '{}.{}', '{}', 'COLUMN'", table, from, to)
                }
            });
        }
        Ok(statements)
    }
}

/// Rename a table. Tables with an auto-increment column are not supported
/// as their sequence and trigger keep the old name.
#[derive(Debug, Clone)]
pub struct RenameTableBuilder {
    dialect: Dialect,
    from: String,
    to: String,
}

impl RenameTableBuilder {
    pub fn new(dialect: Dialect, from: &str, to: &str) -> Self {
        Self {
            dialect,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn build(self) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.from)?;
        validate_table_name(&self.to)?;
        if self.from == self.to {
            return Err(MigrationError::Specification(format!(
                "Table '{}' can't be renamed to itself",
                self.from
            )));
        }

        let sql = match self.dialect {
            Dialect::PostgreSql | Dialect::H2 => {
                format!("ALTER TABLE {} RENAME TO {}", self.from, self.to)
            }
            Dialect::Oracle => format!("RENAME {} TO {}", self.from, self.to),
            Dialect::MsSql => format!("EXEC sp_rename '{}', '{}'", self.from, self.to),
        };
        Ok(vec![sql])
    }
}
