//! Fan-in of `live_measures` into `measures`
//!
//! Each component gets one row holding all its measures as a JSON object
//! keyed by metric name. Projects are migrated independently: a project's
//! rows are deleted from `measures`, re-inserted, and only then is the
//! project flagged as migrated. A failure leaves the project unflagged and
//! the next run redoes it from scratch.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::MigrationResult;
use crate::migrations::{Context, MigrationStep};
use crate::sql::{Progress, ProgressLogger, Row, RowHandler, SelectQuery, Upsert};
use crate::workers::UnitPool;

const SELECT_UNMIGRATED_PROJECTS: &str =
    "SELECT uuid FROM projects WHERE measures_migrated = ? ORDER BY uuid";

const DELETE_PROJECT_MEASURES: &str = "DELETE FROM measures WHERE project_uuid = ?";

const SELECT_LIVE_MEASURES: &str = "SELECT lm.component_uuid, m.name, lm.value, lm.text_value \
     FROM live_measures lm INNER JOIN metrics m ON m.uuid = lm.metric_uuid \
     WHERE lm.project_uuid = ? ORDER BY lm.component_uuid";

const INSERT_MEASURE: &str = "INSERT INTO measures \
     (component_uuid, project_uuid, json_value, json_value_hash, created_at, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?)";

const FLAG_PROJECT: &str = "UPDATE projects SET measures_migrated = ? WHERE uuid = ?";

pub struct MigrateLiveMeasuresToMeasures;

#[async_trait]
impl MigrationStep for MigrateLiveMeasuresToMeasures {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()> {
        let projects = {
            let mut conn = ctx.connection().await?;
            SelectQuery::new(SELECT_UNMIGRATED_PROJECTS)
                .set_boolean(1, Some(false))
                .list(conn.as_mut(), |row| row.get_string(1))
                .await?
        };
        if projects.is_empty() {
            tracing::debug!("every project already has its measures migrated");
            return Ok(());
        }
        tracing::info!("{} projects to migrate", projects.len());

        let progress = Arc::new(Progress::with_total(projects.len() as u64));
        let logger = ProgressLogger::start(
            "live measures to measures",
            "projects",
            Arc::clone(&progress),
            ctx.config().progress_interval,
        );

        let pool = {
            let (workers, queue_capacity) = (ctx.config().workers, ctx.config().queue_capacity);
            let ctx = ctx.clone();
            let progress = Arc::clone(&progress);
            UnitPool::new(
                workers,
                queue_capacity,
                move |project: String| {
                    let ctx = ctx.clone();
                    let progress = Arc::clone(&progress);
                    async move {
                        migrate_project(&ctx, &project).await?;
                        progress.advance(1);
                        Ok(())
                    }
                },
            )
        };

        for project in projects {
            if pool.is_failed() {
                break;
            }
            pool.submit(project).await?;
        }
        let result = pool.shutdown().await;
        logger.stop();
        result
    }
}

/// Migrate one project; holds at most two connections at a time
async fn migrate_project(ctx: &Context, project_uuid: &str) -> MigrationResult<()> {
    {
        let mut conn = ctx.connection().await?;
        let mut delete = Upsert::new(conn.as_mut(), DELETE_PROJECT_MEASURES);
        delete.set_string(1, Some(project_uuid));
        delete.execute().await?;
        delete.commit().await?;
    }

    let mut grouper = MeasureGrouper::new(project_uuid, ctx.now_millis());
    let rows = ctx
        .mass_update()
        .await?
        .select(SelectQuery::new(SELECT_LIVE_MEASURES).set_string(1, Some(project_uuid)))
        .update(INSERT_MEASURE)
        .row_plural_name("live measures")
        .execute_with(&mut grouper)
        .await?;

    let mut conn = ctx.connection().await?;
    let mut flag = Upsert::new(conn.as_mut(), FLAG_PROJECT);
    flag.set_boolean(1, Some(true)).set_string(2, Some(project_uuid));
    flag.execute().await?;
    flag.commit().await?;

    tracing::debug!(
        unit = project_uuid,
        rows,
        components = grouper.components(),
        "project measures migrated"
    );
    Ok(())
}

/// Accumulates the measures of one component at a time; rows must come
/// ordered by component
struct MeasureGrouper {
    project_uuid: String,
    now: i64,
    component: Option<String>,
    values: BTreeMap<String, Value>,
    components: u64,
}

impl MeasureGrouper {
    fn new(project_uuid: &str, now: i64) -> Self {
        Self {
            project_uuid: project_uuid.to_string(),
            now,
            component: None,
            values: BTreeMap::new(),
            components: 0,
        }
    }

    fn components(&self) -> u64 {
        self.components
    }

    /// Write the current component and reset the accumulator
    fn flush(&mut self, update: &mut Upsert<'_>) -> MigrationResult<bool> {
        let Some(component) = self.component.take() else {
            return Ok(false);
        };
        let json = serde_json::to_string(&self.values)?;
        self.values.clear();

        update
            .set_string(1, Some(&component))
            .set_string(2, Some(&self.project_uuid))
            .set_long(4, Some(json_hash(&json)))
            .set_string(3, Some(&json))
            .set_long(5, Some(self.now))
            .set_long(6, Some(self.now));
        self.components += 1;
        Ok(true)
    }
}

impl RowHandler for MeasureGrouper {
    fn handle(&mut self, row: &Row, update: &mut Upsert<'_>) -> MigrationResult<bool> {
        let component = row.get_string(1)?;
        let metric = row.get_string(2)?;

        let flushed = if self.component.as_deref() != Some(component.as_str()) {
            let flushed = self.flush(update)?;
            self.component = Some(component);
            flushed
        } else {
            false
        };

        let value = measure_value(row.get_nullable_double(3)?, row.get_nullable_string(4)?);
        if let Some(value) = value {
            self.values.insert(metric, value);
        }
        Ok(flushed)
    }

    fn finish(&mut self, update: &mut Upsert<'_>) -> MigrationResult<bool> {
        self.flush(update)
    }
}

/// Numeric value first, text otherwise; NaN and infinities are dropped
fn measure_value(value: Option<f64>, text_value: Option<String>) -> Option<Value> {
    match value {
        Some(v) => serde_json::Number::from_f64(v).map(Value::Number),
        None => text_value.map(Value::String),
    }
}

/// First 8 bytes of the SHA-256 of the JSON
pub fn json_hash(json: &str) -> i64 {
    let digest = Sha256::digest(json.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fake::{s, FakeDatabase};
    use crate::backends::{DatabaseValue, ValueKind};
    use crate::config::MigrationConfig;
    use crate::dialect::Dialect;
    use crate::migrations::FixedClock;
    use std::sync::Mutex;

    const NO_VALUE: DatabaseValue = DatabaseValue::Null(ValueKind::Float64);

    fn measure(
        component: &str,
        metric: &str,
        value: DatabaseValue,
        text: Option<&str>,
    ) -> Vec<DatabaseValue> {
        vec![s(component), s(metric), value, text.into()]
    }

    fn context(db: &FakeDatabase, workers: usize) -> Context {
        let config = MigrationConfig {
            workers,
            ..MigrationConfig::default()
        };
        Context::new(db.pool(), config).with_clock(Arc::new(FixedClock(1_000)))
    }

    /// Projects still unflagged are shared with the script answering the project query
    fn scripted(unflagged: &Arc<Mutex<Vec<String>>>) -> FakeDatabase {
        let db = FakeDatabase::new(Dialect::PostgreSql);
        let projects = Arc::clone(unflagged);
        db.on_query_with("FROM projects WHERE measures_migrated", move |_| {
            projects.lock().unwrap().iter().map(|p| vec![s(p)]).collect()
        });
        db.on_query_with("FROM live_measures", |params| {
            let project = match params.first() {
                Some(DatabaseValue::String(p)) => p.clone(),
                _ => return vec![],
            };
            vec![
                measure(&format!("{}-c1", project), "lines", DatabaseValue::Float64(10.0), None),
                measure(&format!("{}-c1", project), "bugs", DatabaseValue::Float64(2.0), None),
                measure(&format!("{}-c2", project), "alert", NO_VALUE, Some("OK")),
            ]
        });
        db
    }

    fn inserted_components(db: &FakeDatabase) -> Vec<DatabaseValue> {
        db.executed_matching("INSERT INTO measures")
            .into_iter()
            .map(|e| e.params[0].clone())
            .collect()
    }

    #[tokio::test]
    async fn test_groups_are_flushed_including_the_last_one() {
        let db = FakeDatabase::new(Dialect::PostgreSql);
        db.on_query("FROM projects WHERE measures_migrated", vec![vec![s("p")]]);
        db.on_query(
            "FROM live_measures",
            vec![
                measure("a", "m1", DatabaseValue::Float64(1.0), None),
                measure("a", "m2", DatabaseValue::Float64(2.5), None),
                measure("a", "m3", NO_VALUE, Some("text")),
                measure("b", "m1", DatabaseValue::Int64(4), None),
                measure("c", "m1", DatabaseValue::Float64(5.0), None),
                measure("c", "m2", NO_VALUE, None),
            ],
        );

        MigrateLiveMeasuresToMeasures.execute(&context(&db, 0)).await.unwrap();

        let inserts = db.executed_matching("INSERT INTO measures");
        assert_eq!(inserts.len(), 3);
        assert_eq!(inserted_components(&db), vec![s("a"), s("b"), s("c")]);

        let json = r#"{"m1":1.0,"m2":2.5,"m3":"text"}"#;
        assert_eq!(
            inserts[0].params,
            vec![
                s("a"),
                s("p"),
                s(json),
                DatabaseValue::Int64(json_hash(json)),
                DatabaseValue::Int64(1_000),
                DatabaseValue::Int64(1_000),
            ]
        );
        assert_eq!(inserts[1].params[2], s(r#"{"m1":4.0}"#));
        assert_eq!(inserts[2].params[2], s(r#"{"m1":5.0}"#));
    }

    #[tokio::test]
    async fn test_project_is_cleaned_before_insert_and_flagged_after() {
        let unflagged = Arc::new(Mutex::new(vec!["p1".to_string()]));
        let db = scripted(&unflagged);

        MigrateLiveMeasuresToMeasures.execute(&context(&db, 0)).await.unwrap();

        let sql: Vec<String> = db
            .executed()
            .into_iter()
            .map(|e| e.sql)
            .filter(|sql| !sql.starts_with("SELECT") && sql != "BEGIN" && sql != "COMMIT")
            .collect();
        assert_eq!(
            sql,
            vec![
                DELETE_PROJECT_MEASURES.to_string(),
                INSERT_MEASURE.to_string(),
                INSERT_MEASURE.to_string(),
                FLAG_PROJECT.to_string(),
            ]
        );
        let flag = &db.executed_matching("UPDATE projects")[0];
        assert_eq!(flag.params, vec![DatabaseValue::Bool(true), s("p1")]);
    }

    #[tokio::test]
    async fn test_rerun_after_failure_only_redoes_unflagged_project() {
        let unflagged = Arc::new(Mutex::new(vec!["A".to_string(), "B".to_string()]));
        let db = scripted(&unflagged);
        db.fail_on("INSERT INTO measures", Some(s("B")), "connection reset");

        let err = MigrateLiveMeasuresToMeasures
            .execute(&context(&db, 0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));

        let flagged: Vec<Vec<DatabaseValue>> = db
            .executed_matching("UPDATE projects")
            .into_iter()
            .map(|e| e.params)
            .collect();
        assert_eq!(flagged, vec![vec![DatabaseValue::Bool(true), s("A")]]);
        let a_rows = db
            .executed_matching("INSERT INTO measures")
            .iter()
            .filter(|e| e.params[1] == s("A"))
            .count();
        assert_eq!(a_rows, 2);

        // what the database now holds: only B is left to migrate
        unflagged.lock().unwrap().retain(|p| p == "B");
        db.clear_failures();
        db.clear_executed();

        MigrateLiveMeasuresToMeasures.execute(&context(&db, 0)).await.unwrap();

        let touched_a = db.executed().into_iter().any(|e| e.params.contains(&s("A")));
        assert!(!touched_a);
        assert_eq!(db.executed_matching("DELETE FROM measures")[0].params, vec![s("B")]);
        assert_eq!(inserted_components(&db), vec![s("B-c1"), s("B-c2")]);
        assert_eq!(
            db.executed_matching("UPDATE projects")[0].params,
            vec![DatabaseValue::Bool(true), s("B")]
        );
    }

    #[tokio::test]
    async fn test_workers_migrate_every_project() {
        let projects: Vec<String> = (0..12).map(|i| format!("p{:02}", i)).collect();
        let unflagged = Arc::new(Mutex::new(projects.clone()));
        let db = scripted(&unflagged);

        MigrateLiveMeasuresToMeasures.execute(&context(&db, 3)).await.unwrap();

        let mut flagged: Vec<DatabaseValue> = db
            .executed_matching("UPDATE projects")
            .into_iter()
            .map(|e| e.params[1].clone())
            .collect();
        flagged.sort_by_key(|v| format!("{:?}", v));
        assert_eq!(flagged, projects.iter().map(|p| s(p)).collect::<Vec<_>>());
        assert_eq!(db.executed_matching("INSERT INTO measures").len(), 24);
    }

    #[tokio::test]
    async fn test_nothing_to_migrate() {
        let db = FakeDatabase::new(Dialect::PostgreSql);
        MigrateLiveMeasuresToMeasures.execute(&context(&db, 2)).await.unwrap();
        assert_eq!(db.executed().len(), 1);
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(json_hash("{}"), json_hash("{}"));
        assert_ne!(json_hash(r#"{"m1":1.0}"#), json_hash(r#"{"m1":2.0}"#));
    }
}
