//! Migration steps and their execution context

use std::sync::Arc;

use async_trait::async_trait;

use crate::backends::{execute_all, DatabaseConnection, DatabasePool};
use crate::config::MigrationConfig;
use crate::dialect::Dialect;
use crate::error::MigrationResult;
use crate::sql::MassUpdate;

/// One numbered change of the schema or of the data.
///
/// A step must be safe to run again after a failure: DDL steps check what
/// already exists, data steps track their own progress.
#[async_trait]
pub trait MigrationStep: Send + Sync {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()>;
}

/// Source of the timestamps written by migrations
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Everything a step needs, cheap to clone into worker tasks
#[derive(Clone)]
pub struct Context {
    dialect: Dialect,
    pool: Arc<dyn DatabasePool>,
    config: Arc<MigrationConfig>,
    clock: Arc<dyn Clock>,
}

impl Context {
    /// The dialect is the one detected by the pool
    pub fn new(pool: Arc<dyn DatabasePool>, config: MigrationConfig) -> Self {
        Self {
            dialect: pool.dialect(),
            pool,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn pool(&self) -> &Arc<dyn DatabasePool> {
        &self.pool
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub async fn connection(&self) -> MigrationResult<Box<dyn DatabaseConnection>> {
        self.pool.acquire().await
    }

    /// Run DDL statements in order on a fresh connection.
    ///
    /// Several statements run in one transaction where the dialect allows
    /// transactional DDL, so a failure leaves none of them applied.
    pub async fn execute_ddl(&self, statements: &[String]) -> MigrationResult<()> {
        let mut conn = self.connection().await?;
        if statements.len() < 2 || !self.dialect().supports_transactional_ddl() {
            return execute_all(conn.as_mut(), statements).await;
        }

        conn.begin().await?;
        if let Err(e) = execute_all(conn.as_mut(), statements).await {
            if let Err(rollback) = conn.rollback().await {
                tracing::warn!("Rollback of DDL batch failed: {}", rollback);
            }
            return Err(e);
        }
        conn.commit().await
    }

    /// Mass update on two fresh connections, batched as configured
    pub async fn mass_update(&self) -> MigrationResult<MassUpdate> {
        let read = self.connection().await?;
        let write = self.connection().await?;
        Ok(MassUpdate::new(read, write).batch_size(self.config.batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fake::FakeDatabase;

    #[tokio::test]
    async fn test_context_uses_pool_dialect_and_clock() {
        let db = FakeDatabase::new(Dialect::Oracle);
        let ctx = Context::new(db.pool(), MigrationConfig::default())
            .with_clock(Arc::new(FixedClock(42)));
        assert_eq!(ctx.dialect(), Dialect::Oracle);
        assert_eq!(ctx.now_millis(), 42);

        ctx.execute_ddl(&["DROP TABLE live_measures".to_string()]).await.unwrap();
        assert_eq!(db.executed_matching("DROP TABLE").len(), 1);
    }

    fn ddl_batch() -> Vec<String> {
        vec![
            "CREATE TABLE measures (id BIGINT)".to_string(),
            "CREATE INDEX measures_id ON measures (id)".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_ddl_batch_is_atomic_where_supported() {
        let db = FakeDatabase::new(Dialect::PostgreSql);
        let ctx = Context::new(db.pool(), MigrationConfig::default());
        ctx.execute_ddl(&ddl_batch()).await.unwrap();

        let sql: Vec<String> = db.executed().into_iter().map(|e| e.sql).collect();
        assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(sql.last().map(String::as_str), Some("COMMIT"));
        assert_eq!(sql.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_ddl_batch_rolls_back() {
        let db = FakeDatabase::new(Dialect::MsSql);
        db.fail_on("CREATE INDEX", None, "permission denied");
        let ctx = Context::new(db.pool(), MigrationConfig::default());

        let err = ctx.execute_ddl(&ddl_batch()).await.unwrap_err();
        assert!(err.to_string().contains("permission denied"));
        assert_eq!(db.executed_matching("ROLLBACK").len(), 1);
        assert!(db.executed_matching("COMMIT").is_empty());
    }

    #[tokio::test]
    async fn test_oracle_ddl_runs_without_transaction() {
        let db = FakeDatabase::new(Dialect::Oracle);
        let ctx = Context::new(db.pool(), MigrationConfig::default());
        ctx.execute_ddl(&ddl_batch()).await.unwrap();

        let sql: Vec<String> = db.executed().into_iter().map(|e| e.sql).collect();
        assert_eq!(sql, ddl_batch());
    }
}
