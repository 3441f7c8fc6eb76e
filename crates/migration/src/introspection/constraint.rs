//! Primary key constraint lookup
//!
//! Primary keys created by older versions may carry vendor-generated names,
//! so they are resolved from the system catalog before being dropped.

use crate::backends::DatabaseConnection;
use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};
use crate::sql::SelectQuery;

const POSTGRES_CURRENT_SCHEMA: &str = "SELECT current_schema()";

const POSTGRES_PK: &str = "SELECT con.conname FROM pg_constraint con \
     JOIN pg_class cls ON con.conrelid = cls.oid \
     JOIN pg_namespace nsp ON con.connamespace = nsp.oid \
     WHERE cls.relname = ? AND nsp.nspname = ? AND con.contype = 'p'";

const ORACLE_PK: &str = "SELECT constraint_name FROM user_constraints \
     WHERE table_name = ? AND constraint_type = 'P'";

const MSSQL_PK: &str = "SELECT name FROM sys.key_constraints \
     WHERE type = 'PK' AND OBJECT_NAME(parent_object_id) = ?";

const H2_PK: &str = "SELECT constraint_name FROM information_schema.table_constraints \
     WHERE table_name = ? AND constraint_type = 'PRIMARY KEY'";

/// Name of the primary key constraint of `table`, `None` when it has none
pub async fn find_primary_key_constraint(
    conn: &mut dyn DatabaseConnection,
    table: &str,
) -> MigrationResult<Option<String>> {
    let dialect = conn.dialect();
    let table_name = dialect.normalize_identifier(table);

    let query = match dialect {
        Dialect::PostgreSql => {
            let schema = current_schema(conn).await?;
            SelectQuery::new(POSTGRES_PK)
                .set_string(1, Some(&table_name))
                .set_string(2, Some(&schema))
        }
        Dialect::Oracle => SelectQuery::new(ORACLE_PK).set_string(1, Some(&table_name)),
        Dialect::MsSql => SelectQuery::new(MSSQL_PK).set_string(1, Some(&table_name)),
        Dialect::H2 => SelectQuery::new(H2_PK).set_string(1, Some(&table_name)),
    };

    let row = query.first(conn).await?;
    let name = row.map(|r| r.get_string(1)).transpose()?;
    tracing::debug!(table, constraint = ?name, "resolved primary key constraint");
    Ok(name)
}

async fn current_schema(conn: &mut dyn DatabaseConnection) -> MigrationResult<String> {
    let row = SelectQuery::new(POSTGRES_CURRENT_SCHEMA).first(conn).await?;
    row.map(|r| r.get_nullable_string(1))
        .transpose()?
        .flatten()
        .ok_or_else(|| MigrationError::Database("No current schema is set".to_string()))
}
