//! ALTER TABLE ... ADD

use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};
use crate::schema::validations::validate_table_name;
use crate::schema::ColumnDef;

/// Add columns to an existing table.
///
/// A NOT NULL column needs a default value, as existing rows have to get one;
/// otherwise add it nullable, backfill it and alter it to NOT NULL.
#[derive(Debug, Clone)]
pub struct AddColumnsBuilder {
    dialect: Dialect,
    table_name: String,
    columns: Vec<ColumnDef>,
}

impl AddColumnsBuilder {
    pub fn new(dialect: Dialect, table_name: &str) -> Self {
        Self {
            dialect,
            table_name: table_name.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn add_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.table_name)?;
        if self.columns.is_empty() {
            return Err(MigrationError::Specification(
                "At least one column must be added".to_string(),
            ));
        }
        if let Some(column) = self
            .columns
            .iter()
            .find(|c| !c.is_nullable() && c.default_value().is_none())
        {
            return Err(MigrationError::Specification(format!(
                "Column '{}' can't be added as NOT NULL without a default value",
                column.name()
            )));
        }

        let dialect = self.dialect;
        let definitions = self
            .columns
            .iter()
            .map(|c| c.sql_definition(dialect))
            .collect::<MigrationResult<Vec<_>>>()?;
        let table = &self.table_name;

        let statements = match dialect {
            Dialect::PostgreSql => {
                let clauses: Vec<String> =
                    definitions.iter().map(|d| format!("ADD COLUMN {}", d)).collect();
                vec![format!("ALTER TABLE {} {}", table, clauses.join(", "))]
            }
            Dialect::MsSql => vec![format!("ALTER TABLE {} ADD {}", table, definitions.join(", "))],
            Dialect::Oracle | Dialect::H2 => {
                vec![format!("ALTER TABLE {} ADD ({})", table, definitions.join(", "))]
            }
        };
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DefaultValue;

    fn builder(dialect: Dialect) -> AddColumnsBuilder {
        AddColumnsBuilder::new(dialect, "projects")
            .add_column(ColumnDef::boolean("measures_migrated").build().unwrap())
            .add_column(
                ColumnDef::integer("version")
                    .not_null()
                    .default_value(DefaultValue::Int(0))
                    .build()
                    .unwrap(),
            )
    }

    #[test]
    fn test_per_dialect_syntax() {
        assert_eq!(
            builder(Dialect::PostgreSql).build().unwrap(),
            vec!["ALTER TABLE projects ADD COLUMN measures_migrated BOOLEAN NULL, \
                  ADD COLUMN version INTEGER DEFAULT 0 NOT NULL"]
        );
        assert_eq!(
            builder(Dialect::MsSql).build().unwrap(),
            vec!["ALTER TABLE projects ADD measures_migrated BIT NULL, version INT DEFAULT 0 NOT NULL"]
        );
        assert_eq!(
            builder(Dialect::Oracle).build().unwrap(),
            vec!["ALTER TABLE projects ADD (measures_migrated NUMBER(1) NULL, \
                  version NUMBER(38,0) DEFAULT 0 NOT NULL)"]
        );
        assert_eq!(
            builder(Dialect::H2).build().unwrap(),
            vec!["ALTER TABLE projects ADD (measures_migrated BOOLEAN NULL, \
                  version INTEGER DEFAULT 0 NOT NULL)"]
        );
    }

    #[test]
    fn test_not_null_without_default_is_rejected() {
        let result = AddColumnsBuilder::new(Dialect::PostgreSql, "projects")
            .add_column(ColumnDef::boolean("measures_migrated").not_null().build().unwrap())
            .build();
        assert!(result.is_err());
        assert!(AddColumnsBuilder::new(Dialect::PostgreSql, "projects").build().is_err());
    }
}
