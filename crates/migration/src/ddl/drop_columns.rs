//! ALTER TABLE ... DROP

use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};
use crate::schema::validations::{validate_column_name, validate_table_name};

#[derive(Debug, Clone)]
pub struct DropColumnsBuilder {
    dialect: Dialect,
    table_name: String,
    columns: Vec<String>,
}

impl DropColumnsBuilder {
    pub fn new(dialect: Dialect, table_name: &str, columns: &[&str]) -> Self {
        Self {
            dialect,
            table_name: table_name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn build(self) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.table_name)?;
        if self.columns.is_empty() {
            return Err(MigrationError::Specification(
                "At least one column must be dropped".to_string(),
            ));
        }
        for column in &self.columns {
            validate_column_name(column)?;
        }

        let table = &self.table_name;
        let statements = match self.dialect {
            Dialect::PostgreSql => {
                let clauses: Vec<String> =
                    self.columns.iter().map(|c| format!("DROP COLUMN {}", c)).collect();
                vec![format!("ALTER TABLE {} {}", table, clauses.join(", "))]
            }
            Dialect::MsSql => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                table,
                self.columns.join(", ")
            )],
            // columns are only marked unused, space is reclaimed later by the DBA
            Dialect::Oracle => vec![format!(
                "ALTER TABLE {} SET UNUSED ({})",
                table,
                self.columns.join(", ")
            )],
            Dialect::H2 => self
                .columns
                .iter()
                .map(|c| format!("ALTER TABLE {} DROP COLUMN {}", table, c))
                .collect(),
        };
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_dialect_syntax() {
        let build = |dialect| {
            DropColumnsBuilder::new(dialect, "projects", &["kee", "name"])
                .build()
                .unwrap()
        };
        assert_eq!(
            build(Dialect::PostgreSql),
            vec!["ALTER TABLE projects DROP COLUMN kee, DROP COLUMN name"]
        );
        assert_eq!(build(Dialect::MsSql), vec!["ALTER TABLE projects DROP COLUMN kee, name"]);
        assert_eq!(build(Dialect::Oracle), vec!["ALTER TABLE projects SET UNUSED (kee, name)"]);
        assert_eq!(
            build(Dialect::H2),
            vec![
                "ALTER TABLE projects DROP COLUMN kee",
                "ALTER TABLE projects DROP COLUMN name",
            ]
        );
    }

    #[test]
    fn test_requires_columns() {
        assert!(DropColumnsBuilder::new(Dialect::H2, "projects", &[]).build().is_err());
        assert!(DropColumnsBuilder::new(Dialect::H2, "projects", &["Bad"]).build().is_err());
    }
}
