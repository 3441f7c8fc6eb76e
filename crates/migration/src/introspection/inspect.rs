//! Existence checks against the system catalogs

use crate::backends::DatabaseConnection;
use crate::dialect::Dialect;
use crate::error::MigrationResult;
use crate::sql::SelectQuery;

pub async fn table_exists(conn: &mut dyn DatabaseConnection, table: &str) -> MigrationResult<bool> {
    let dialect = conn.dialect();
    let sql = match dialect {
        Dialect::PostgreSql => {
            "SELECT 1 FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = ?"
        }
        Dialect::H2 => {
            "SELECT 1 FROM information_schema.tables WHERE table_schema = SCHEMA() AND table_name = ?"
        }
        Dialect::Oracle => "SELECT 1 FROM user_tables WHERE table_name = ?",
        Dialect::MsSql => "SELECT 1 FROM information_schema.tables WHERE table_name = ?",
    };
    let query = SelectQuery::new(sql).set_string(1, Some(&dialect.normalize_identifier(table)));
    Ok(query.first(conn).await?.is_some())
}

pub async fn column_exists(
    conn: &mut dyn DatabaseConnection,
    table: &str,
    column: &str,
) -> MigrationResult<bool> {
    let dialect = conn.dialect();
    let sql = match dialect {
        Dialect::PostgreSql => {
            "SELECT 1 FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = ? AND column_name = ?"
        }
        Dialect::H2 => {
            "SELECT 1 FROM information_schema.columns \
             WHERE table_schema = SCHEMA() AND table_name = ? AND column_name = ?"
        }
        Dialect::Oracle => {
            "SELECT 1 FROM user_tab_columns WHERE table_name = ? AND column_name = ?"
        }
        Dialect::MsSql => {
            "SELECT 1 FROM information_schema.columns WHERE table_name = ? AND column_name = ?"
        }
    };
    let query = SelectQuery::new(sql)
        .set_string(1, Some(&dialect.normalize_identifier(table)))
        .set_string(2, Some(&dialect.normalize_identifier(column)));
    Ok(query.first(conn).await?.is_some())
}

pub async fn index_exists(
    conn: &mut dyn DatabaseConnection,
    table: &str,
    index: &str,
) -> MigrationResult<bool> {
    let dialect = conn.dialect();
    let sql = match dialect {
        Dialect::PostgreSql => {
            "SELECT 1 FROM pg_indexes WHERE schemaname = current_schema() AND tablename = ? AND indexname = ?"
        }
        Dialect::H2 => {
            "SELECT 1 FROM information_schema.indexes \
             WHERE table_schema = SCHEMA() AND table_name = ? AND index_name = ?"
        }
        Dialect::Oracle => "SELECT 1 FROM user_indexes WHERE table_name = ? AND index_name = ?",
        Dialect::MsSql => {
            "SELECT 1 FROM sys.indexes i JOIN sys.tables t ON i.object_id = t.object_id \
             WHERE t.name = ? AND i.name = ?"
        }
    };
    let query = SelectQuery::new(sql)
        .set_string(1, Some(&dialect.normalize_identifier(table)))
        .set_string(2, Some(&dialect.normalize_identifier(index)));
    Ok(query.first(conn).await?.is_some())
}
