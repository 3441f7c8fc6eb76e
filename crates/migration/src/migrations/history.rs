//! Migration ledger
//!
//! One row per applied step, never updated nor deleted.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::definitions::MigrationRecord;
use crate::backends::{DatabaseConnection, DatabasePool};
use crate::ddl::CreateTableBuilder;
use crate::error::MigrationResult;
use crate::introspection::table_exists;
use crate::schema::ColumnDef;
use crate::sql::{SelectQuery, Upsert};

pub struct MigrationHistory {
    pool: Arc<dyn DatabasePool>,
    table: String,
}

impl MigrationHistory {
    pub fn new(pool: Arc<dyn DatabasePool>, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it doesn't exist yet
    pub async fn start(&self) -> MigrationResult<()> {
        if self.exists().await? {
            tracing::debug!(table = %self.table, "migration ledger already exists");
            return Ok(());
        }

        let mut conn = self.pool.acquire().await?;
        let statements = CreateTableBuilder::new(conn.dialect(), &self.table)
            .add_pk_column(ColumnDef::big_integer("version").not_null().build()?)
            .add_column(ColumnDef::big_integer("applied_at").not_null().build()?)
            .build()?;
        for statement in &statements {
            conn.execute(statement, &[]).await?;
        }
        tracing::info!(table = %self.table, "created migration ledger");
        Ok(())
    }

    pub async fn exists(&self) -> MigrationResult<bool> {
        let mut conn = self.pool.acquire().await?;
        table_exists(conn.as_mut(), &self.table).await
    }

    /// Applied steps in id order; empty when the ledger doesn't exist
    pub async fn records(&self) -> MigrationResult<Vec<MigrationRecord>> {
        if !self.exists().await? {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.acquire().await?;
        SelectQuery::new(format!(
            "SELECT version, applied_at FROM {} ORDER BY version",
            self.table
        ))
        .list(conn.as_mut(), |row| {
            Ok(MigrationRecord::from_millis(row.get_long(1)?, row.get_long(2)?))
        })
        .await
    }

    pub async fn applied_ids(&self) -> MigrationResult<BTreeSet<i64>> {
        Ok(self.records().await?.into_iter().map(|r| r.id).collect())
    }

    /// Highest applied step id
    pub async fn last_migration_number(&self) -> MigrationResult<Option<i64>> {
        if !self.exists().await? {
            return Ok(None);
        }
        let mut conn = self.pool.acquire().await?;
        let row = SelectQuery::new(format!("SELECT MAX(version) FROM {}", self.table))
            .first(conn.as_mut())
            .await?;
        Ok(row.map(|r| r.get_nullable_long(1)).transpose()?.flatten())
    }

    /// Record a step as applied, in its own transaction
    pub async fn done(&self, id: i64, applied_at: i64) -> MigrationResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert(conn.as_mut(), &self.table, id, applied_at).await
    }
}

async fn insert(
    conn: &mut dyn DatabaseConnection,
    table: &str,
    id: i64,
    applied_at: i64,
) -> MigrationResult<()> {
    let mut upsert = Upsert::new(
        conn,
        format!("INSERT INTO {} (version, applied_at) VALUES (?, ?)", table),
    );
    upsert.set_long(1, Some(id)).set_long(2, Some(applied_at));
    upsert.execute().await?;
    upsert.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fake::FakeDatabase;
    use crate::backends::DatabaseValue;
    use crate::dialect::Dialect;

    #[tokio::test]
    async fn test_start_creates_missing_ledger() {
        let db = FakeDatabase::new(Dialect::PostgreSql);
        let history = MigrationHistory::new(db.pool(), "schema_migrations");
        history.start().await.unwrap();

        let created = db.executed_matching("CREATE TABLE");
        assert_eq!(
            created[0].sql,
            "CREATE TABLE schema_migrations (version BIGINT NOT NULL, applied_at BIGINT NOT NULL, \
             CONSTRAINT pk_schema_migrations PRIMARY KEY (version))"
        );
    }

    #[tokio::test]
    async fn test_start_keeps_existing_ledger() {
        let db = FakeDatabase::new(Dialect::PostgreSql);
        db.on_query("information_schema.tables", vec![vec![DatabaseValue::Int32(1)]]);
        MigrationHistory::new(db.pool(), "schema_migrations").start().await.unwrap();
        assert!(db.executed_matching("CREATE TABLE").is_empty());
    }

    #[tokio::test]
    async fn test_reads_applied_steps() {
        let db = FakeDatabase::new(Dialect::H2);
        db.on_query("information_schema.tables", vec![vec![DatabaseValue::Int32(1)]]);
        db.on_query("MAX(version)", vec![vec![DatabaseValue::Int64(20)]]);
        db.on_query(
            "SELECT version, applied_at",
            vec![
                vec![DatabaseValue::Int64(10), DatabaseValue::Int64(1_000)],
                vec![DatabaseValue::Int64(20), DatabaseValue::Int64(2_000)],
            ],
        );
        let history = MigrationHistory::new(db.pool(), "schema_migrations");

        let ids: Vec<i64> = history.applied_ids().await.unwrap().into_iter().collect();
        assert_eq!(ids, vec![10, 20]);
        assert_eq!(history.last_migration_number().await.unwrap(), Some(20));
    }

    #[tokio::test]
    async fn test_missing_ledger_reads_empty() {
        let db = FakeDatabase::new(Dialect::Oracle);
        let history = MigrationHistory::new(db.pool(), "schema_migrations");
        assert!(!history.exists().await.unwrap());
        assert!(history.applied_ids().await.unwrap().is_empty());
        assert_eq!(history.last_migration_number().await.unwrap(), None);
        assert!(db.executed_matching("MAX(version)").is_empty());
    }

    #[tokio::test]
    async fn test_done_inserts_and_commits() {
        let db = FakeDatabase::new(Dialect::MsSql);
        MigrationHistory::new(db.pool(), "schema_migrations").done(30, 1_234).await.unwrap();
        let sql: Vec<String> = db.executed().into_iter().map(|e| e.sql).collect();
        assert_eq!(
            sql,
            vec![
                "BEGIN",
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)",
                "COMMIT",
            ]
        );
        assert_eq!(
            db.executed()[1].params,
            vec![DatabaseValue::Int64(30), DatabaseValue::Int64(1_234)]
        );
    }
}
