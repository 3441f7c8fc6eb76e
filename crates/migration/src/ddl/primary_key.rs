//! Primary key constraints on existing tables

use super::drop_table::{drop_oracle_sequence, drop_oracle_trigger};
use crate::backends::DatabaseConnection;
use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};
use crate::introspection::find_primary_key_constraint;
use crate::schema::validations::{
    validate_column_name, validate_constraint_name, validate_table_name,
};

#[derive(Debug, Clone)]
pub struct AddPrimaryKeyBuilder {
    table_name: String,
    columns: Vec<String>,
    constraint_name: Option<String>,
}

impl AddPrimaryKeyBuilder {
    pub fn new(table_name: &str, columns: &[&str]) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            constraint_name: None,
        }
    }

    /// Defaults to `pk_<table>`
    pub fn with_constraint_name(mut self, name: &str) -> Self {
        self.constraint_name = Some(name.to_string());
        self
    }

    pub fn build(self) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.table_name)?;
        if self.columns.is_empty() {
            return Err(MigrationError::Specification(format!(
                "Primary key of table '{}' must have at least one column",
                self.table_name
            )));
        }
        for column in &self.columns {
            validate_column_name(column)?;
        }
        let constraint = self
            .constraint_name
            .unwrap_or_else(|| format!("pk_{}", self.table_name));
        validate_constraint_name(&constraint)?;

        Ok(vec![format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.table_name,
            constraint,
            self.columns.join(", ")
        )])
    }
}

/// Drops a primary key whatever its name, looked up in the catalog.
///
/// An auto-increment key also loses its value generator, except on SQL Server
/// where an IDENTITY column can't be altered.
#[derive(Debug, Clone)]
pub struct DropPrimaryKeySqlGenerator {
    table_name: String,
    auto_increment_column: Option<String>,
}

impl DropPrimaryKeySqlGenerator {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            auto_increment_column: None,
        }
    }

    pub fn with_auto_increment(mut self, column: &str) -> Self {
        self.auto_increment_column = Some(column.to_string());
        self
    }

    /// Statements dropping the key; empty when the table has no primary key
    pub async fn generate(
        &self,
        conn: &mut dyn DatabaseConnection,
    ) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.table_name)?;
        if let Some(column) = &self.auto_increment_column {
            validate_column_name(column)?;
        }

        let dialect = conn.dialect();
        let Some(constraint) = find_primary_key_constraint(conn, &self.table_name).await? else {
            tracing::debug!(table = %self.table_name, "no primary key to drop");
            return Ok(Vec::new());
        };
        Ok(self.statements(dialect, &constraint))
    }

    fn statements(&self, dialect: Dialect, constraint: &str) -> Vec<String> {
        let table = &self.table_name;
        let auto_increment = self.auto_increment_column.as_deref();

        match dialect {
            Dialect::PostgreSql => {
                let mut statements = Vec::new();
                if let Some(column) = auto_increment {
                    statements.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                        table, column
                    ));
                }
                statements.push(format!("ALTER TABLE {} DROP CONSTRAINT {}", table, constraint));
                if let Some(column) = auto_increment {
                    statements.push(format!("DROP SEQUENCE IF EXISTS {}_{}_seq", table, column));
                }
                statements
            }
            Dialect::Oracle => {
                let mut statements = Vec::new();
                if auto_increment.is_some() {
                    statements.push(drop_oracle_trigger(table));
                    statements.push(drop_oracle_sequence(table));
                }
                statements.push(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {} DROP INDEX",
                    table, constraint
                ));
                statements
            }
            Dialect::H2 => {
                let mut statements =
                    vec![format!("ALTER TABLE {} DROP CONSTRAINT {}", table, constraint)];
                if let Some(column) = auto_increment {
                    statements.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} DROP IDENTITY",
                        table, column
                    ));
                }
                statements
            }
            Dialect::MsSql => vec![format!("ALTER TABLE {} DROP CONSTRAINT {}", table, constraint)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fake::{s, FakeDatabase};

    #[test]
    fn test_add_primary_key() {
        assert_eq!(
            AddPrimaryKeyBuilder::new("metrics", &["uuid"]).build().unwrap(),
            vec!["ALTER TABLE metrics ADD CONSTRAINT pk_metrics PRIMARY KEY (uuid)"]
        );
        assert_eq!(
            AddPrimaryKeyBuilder::new("measures", &["component_uuid", "metric_uuid"])
                .with_constraint_name("pk_measures_comp")
                .build()
                .unwrap(),
            vec!["ALTER TABLE measures ADD CONSTRAINT pk_measures_comp PRIMARY KEY (component_uuid, metric_uuid)"]
        );
        assert!(AddPrimaryKeyBuilder::new("metrics", &[]).build().is_err());
    }

    #[tokio::test]
    async fn test_drop_uses_resolved_name() {
        let db = FakeDatabase::new(Dialect::MsSql);
        db.on_query("sys.key_constraints", vec![vec![s("PK__metrics__7D4E1A2B")]]);
        let mut conn = db.pool().acquire().await.unwrap();

        let statements = DropPrimaryKeySqlGenerator::new("metrics")
            .generate(conn.as_mut())
            .await
            .unwrap();
        assert_eq!(statements, vec!["ALTER TABLE metrics DROP CONSTRAINT PK__metrics__7D4E1A2B"]);
    }

    #[tokio::test]
    async fn test_postgres_auto_increment_drops_default_and_sequence() {
        let db = FakeDatabase::new(Dialect::PostgreSql);
        db.on_query("current_schema()", vec![vec![s("public")]]);
        db.on_query("pg_constraint", vec![vec![s("pk_toto")]]);
        let mut conn = db.pool().acquire().await.unwrap();

        let statements = DropPrimaryKeySqlGenerator::new("toto")
            .with_auto_increment("id")
            .generate(conn.as_mut())
            .await
            .unwrap();
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE toto ALTER COLUMN id DROP DEFAULT",
                "ALTER TABLE toto DROP CONSTRAINT pk_toto",
                "DROP SEQUENCE IF EXISTS toto_id_seq",
            ]
        );
    }

    #[tokio::test]
    async fn test_oracle_drops_trigger_and_sequence() {
        let db = FakeDatabase::new(Dialect::Oracle);
        db.on_query("user_constraints", vec![vec![s("PK_TOTO")]]);
        let mut conn = db.pool().acquire().await.unwrap();

        let statements = DropPrimaryKeySqlGenerator::new("toto")
            .with_auto_increment("id")
            .generate(conn.as_mut())
            .await
            .unwrap();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("DROP TRIGGER toto_idt"));
        assert!(statements[1].contains("DROP SEQUENCE toto_seq"));
        assert_eq!(statements[2], "ALTER TABLE toto DROP CONSTRAINT PK_TOTO DROP INDEX");
    }

    #[tokio::test]
    async fn test_no_primary_key_is_a_no_op() {
        let db = FakeDatabase::new(Dialect::H2);
        let mut conn = db.pool().acquire().await.unwrap();
        let statements = DropPrimaryKeySqlGenerator::new("metrics")
            .generate(conn.as_mut())
            .await
            .unwrap();
        assert!(statements.is_empty());
    }
}
