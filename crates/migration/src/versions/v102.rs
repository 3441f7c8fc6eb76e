//! Version 10.2: metrics keyed by uuid, live measures retired

use async_trait::async_trait;

use super::common::DropTable;
use crate::ddl::{AddPrimaryKeyBuilder, DropPrimaryKeySqlGenerator};
use crate::error::MigrationResult;
use crate::introspection::find_primary_key_constraint;
use crate::migrations::{Context, DbVersion, MigrationStep, MigrationStepRegistry};

pub struct DbVersion102;

impl DbVersion for DbVersion102 {
    fn add_steps(&self, registry: &mut MigrationStepRegistry) -> MigrationResult<()> {
        registry
            .add(102_001, "Drop primary key of 'metrics'", DropMetricsPrimaryKey)?
            .add(102_002, "Add primary key on 'metrics.uuid'", AddMetricsUuidPrimaryKey)?
            .add(102_003, "Drop table 'live_measures'", DropTable::new("live_measures"))?;
        Ok(())
    }
}

/// No-op when the table has no primary key any more
pub struct DropMetricsPrimaryKey;

#[async_trait]
impl MigrationStep for DropMetricsPrimaryKey {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()> {
        let statements = {
            let mut conn = ctx.connection().await?;
            DropPrimaryKeySqlGenerator::new("metrics").generate(conn.as_mut()).await?
        };
        ctx.execute_ddl(&statements).await
    }
}

pub struct AddMetricsUuidPrimaryKey;

#[async_trait]
impl MigrationStep for AddMetricsUuidPrimaryKey {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()> {
        let mut conn = ctx.connection().await?;
        if let Some(constraint) = find_primary_key_constraint(conn.as_mut(), "metrics").await? {
            tracing::debug!(%constraint, "metrics already has a primary key");
            return Ok(());
        }
        let statements = AddPrimaryKeyBuilder::new("metrics", &["uuid"]).build()?;
        ctx.execute_ddl(&statements).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fake::{s, FakeDatabase};
    use crate::config::MigrationConfig;
    use crate::dialect::Dialect;

    #[test]
    fn test_registers_three_steps() {
        let mut registry = MigrationStepRegistry::new();
        DbVersion102.add_steps(&mut registry).unwrap();
        let ids: Vec<i64> = registry.build().all().iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![102_001, 102_002, 102_003]);
    }

    #[tokio::test]
    async fn test_drop_primary_key_uses_catalog_name() {
        let db = FakeDatabase::new(Dialect::MsSql);
        db.on_query("sys.key_constraints", vec![vec![s("PK__metrics__72E12F1A")]]);
        let ctx = Context::new(db.pool(), MigrationConfig::default());

        DropMetricsPrimaryKey.execute(&ctx).await.unwrap();
        assert_eq!(
            db.executed_matching("ALTER TABLE")[0].sql,
            "ALTER TABLE metrics DROP CONSTRAINT PK__metrics__72E12F1A"
        );
    }

    #[tokio::test]
    async fn test_drop_missing_primary_key_is_a_no_op() {
        let db = FakeDatabase::new(Dialect::MsSql);
        let ctx = Context::new(db.pool(), MigrationConfig::default());
        DropMetricsPrimaryKey.execute(&ctx).await.unwrap();
        assert!(db.executed_matching("ALTER TABLE").is_empty());
    }

    #[tokio::test]
    async fn test_add_primary_key_once() {
        let db = FakeDatabase::new(Dialect::H2);
        let ctx = Context::new(db.pool(), MigrationConfig::default());
        AddMetricsUuidPrimaryKey.execute(&ctx).await.unwrap();
        assert_eq!(
            db.executed_matching("ALTER TABLE")[0].sql,
            "ALTER TABLE metrics ADD CONSTRAINT pk_metrics PRIMARY KEY (uuid)"
        );

        db.clear_executed();
        db.on_query("table_constraints", vec![vec![s("PK_METRICS")]]);
        AddMetricsUuidPrimaryKey.execute(&ctx).await.unwrap();
        assert!(db.executed_matching("ALTER TABLE").is_empty());
    }
}
