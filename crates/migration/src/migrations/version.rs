//! Database version status

use super::definitions::DatabaseVersionStatus;
use super::history::MigrationHistory;
use super::registry::MigrationSteps;
use crate::error::MigrationResult;

/// Compares the ledger with the registered steps
pub struct DatabaseVersion<'a> {
    history: &'a MigrationHistory,
    steps: &'a MigrationSteps,
}

impl<'a> DatabaseVersion<'a> {
    pub fn new(history: &'a MigrationHistory, steps: &'a MigrationSteps) -> Self {
        Self { history, steps }
    }

    pub async fn status(&self) -> MigrationResult<DatabaseVersionStatus> {
        let applied = self.history.applied_ids().await?;
        let Some(last) = applied.iter().next_back().copied() else {
            return Ok(DatabaseVersionStatus::FreshInstall);
        };

        if self.steps.max_id().map_or(true, |max| last > max) {
            return Ok(DatabaseVersionStatus::RequiresDowngrade);
        }
        if self.steps.all().iter().any(|s| !applied.contains(&s.id())) {
            return Ok(DatabaseVersionStatus::RequiresUpgrade);
        }
        Ok(DatabaseVersionStatus::UpToDate)
    }

    /// Ids of registered steps missing from the ledger
    pub async fn pending_ids(&self) -> MigrationResult<Vec<i64>> {
        let applied = self.history.applied_ids().await?;
        Ok(self
            .steps
            .all()
            .iter()
            .map(|s| s.id())
            .filter(|id| !applied.contains(id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fake::FakeDatabase;
    use crate::backends::DatabaseValue;
    use crate::dialect::Dialect;
    use crate::error::MigrationResult;
    use crate::migrations::registry::MigrationStepRegistry;
    use crate::migrations::step::{Context, MigrationStep};
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl MigrationStep for Noop {
        async fn execute(&self, _ctx: &Context) -> MigrationResult<()> {
            Ok(())
        }
    }

    fn steps(ids: &[i64]) -> MigrationSteps {
        let mut registry = MigrationStepRegistry::new();
        for id in ids {
            registry.add(*id, "step", Noop).unwrap();
        }
        registry.build()
    }

    fn ledger(ids: &[i64]) -> FakeDatabase {
        let db = FakeDatabase::new(Dialect::PostgreSql);
        db.on_query("information_schema.tables", vec![vec![DatabaseValue::Int32(1)]]);
        let rows = ids
            .iter()
            .map(|id| vec![DatabaseValue::Int64(*id), DatabaseValue::Int64(0)])
            .collect();
        db.on_query("SELECT version, applied_at", rows);
        db
    }

    async fn status(applied: &[i64], registered: &[i64]) -> DatabaseVersionStatus {
        let db = ledger(applied);
        let history = MigrationHistory::new(db.pool(), "schema_migrations");
        let steps = steps(registered);
        DatabaseVersion::new(&history, &steps).status().await.unwrap()
    }

    #[tokio::test]
    async fn test_status() {
        assert_eq!(status(&[], &[10, 20]).await, DatabaseVersionStatus::FreshInstall);
        assert_eq!(status(&[10, 20], &[10, 20]).await, DatabaseVersionStatus::UpToDate);
        assert_eq!(status(&[10], &[10, 20]).await, DatabaseVersionStatus::RequiresUpgrade);
        assert_eq!(
            status(&[10, 20, 30], &[10, 20]).await,
            DatabaseVersionStatus::RequiresDowngrade
        );
    }

    #[tokio::test]
    async fn test_pending_ids() {
        let db = ledger(&[10, 20]);
        let history = MigrationHistory::new(db.pool(), "schema_migrations");
        let steps = steps(&[10, 20, 30]);
        assert_eq!(DatabaseVersion::new(&history, &steps).pending_ids().await.unwrap(), vec![30]);
    }
}
