//! Scripted in-memory backend for unit tests
//!
//! Queries are answered from scripts matched on a SQL fragment; every
//! statement, including transaction boundaries, is recorded in order.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::core::*;
use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};

type RowsFn = Box<dyn Fn(&[DatabaseValue]) -> Vec<Vec<DatabaseValue>> + Send + Sync>;

struct Script {
    fragment: String,
    rows: RowsFn,
}

struct Failure {
    fragment: String,
    param: Option<DatabaseValue>,
    message: String,
}

/// Statement seen by the fake database
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub connection: usize,
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

#[derive(Default)]
struct FakeState {
    scripts: Vec<Script>,
    failures: Vec<Failure>,
    executed: Vec<Executed>,
    connections: usize,
}

/// Fake pool handing out connections that share one scripted state
#[derive(Clone)]
pub struct FakeDatabase {
    dialect: Dialect,
    state: Arc<Mutex<FakeState>>,
}

impl FakeDatabase {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Answer queries containing `fragment` with fixed rows
    pub fn on_query(&self, fragment: &str, rows: Vec<Vec<DatabaseValue>>) -> &Self {
        self.on_query_with(fragment, move |_| rows.clone())
    }

    /// Answer queries containing `fragment` with rows computed from the parameters
    pub fn on_query_with<F>(&self, fragment: &str, rows: F) -> &Self
    where
        F: Fn(&[DatabaseValue]) -> Vec<Vec<DatabaseValue>> + Send + Sync + 'static,
    {
        self.state.lock().unwrap().scripts.push(Script {
            fragment: fragment.to_string(),
            rows: Box::new(rows),
        });
        self
    }

    /// Fail statements containing `fragment`, optionally only when bound to `param`
    pub fn fail_on(&self, fragment: &str, param: Option<DatabaseValue>, message: &str) -> &Self {
        self.state.lock().unwrap().failures.push(Failure {
            fragment: fragment.to_string(),
            param,
            message: message.to_string(),
        });
        self
    }

    /// Remove all failure rules
    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// Every statement executed so far
    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().unwrap().executed.clone()
    }

    /// SQL of executed statements containing `fragment`
    pub fn executed_matching(&self, fragment: &str) -> Vec<Executed> {
        self.executed()
            .into_iter()
            .filter(|e| e.sql.contains(fragment))
            .collect()
    }

    pub fn clear_executed(&self) {
        self.state.lock().unwrap().executed.clear();
    }

    /// Wrap the fake in the pool trait object used by the engine
    pub fn pool(&self) -> Arc<dyn DatabasePool> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl DatabasePool for FakeDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn acquire(&self) -> MigrationResult<Box<dyn DatabaseConnection>> {
        let mut state = self.state.lock().unwrap();
        state.connections += 1;
        Ok(Box::new(FakeConnection {
            id: state.connections,
            dialect: self.dialect,
            state: Arc::clone(&self.state),
        }))
    }

    async fn close(&self) -> MigrationResult<()> {
        Ok(())
    }
}

struct FakeConnection {
    id: usize,
    dialect: Dialect,
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnection {
    fn record(&self, sql: &str, params: &[DatabaseValue]) -> MigrationResult<()> {
        let mut state = self.state.lock().unwrap();
        let failure = state.failures.iter().find(|f| {
            sql.contains(&f.fragment) && f.param.as_ref().map_or(true, |p| params.contains(p))
        });
        if let Some(failure) = failure {
            return Err(MigrationError::Database(failure.message.clone()));
        }
        state.executed.push(Executed {
            connection: self.id,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        Ok(())
    }

    fn rows(&self, sql: &str, params: &[DatabaseValue]) -> Vec<Vec<DatabaseValue>> {
        let state = self.state.lock().unwrap();
        state
            .scripts
            .iter()
            .find(|s| sql.contains(&s.fragment))
            .map(|s| (s.rows)(params))
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseConnection for FakeConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigrationResult<u64> {
        self.record(sql, params)?;
        Ok(1)
    }

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrationResult<Option<Box<dyn DatabaseRow>>> {
        self.record(sql, params)?;
        Ok(self
            .rows(sql, params)
            .into_iter()
            .next()
            .map(|values| Box::new(FakeRow(values)) as Box<dyn DatabaseRow>))
    }

    fn fetch<'a>(&'a mut self, sql: &'a str, params: Vec<DatabaseValue>) -> RowStream<'a> {
        let rows: Vec<MigrationResult<Box<dyn DatabaseRow>>> = match self.record(sql, &params) {
            Ok(()) => self
                .rows(sql, &params)
                .into_iter()
                .map(|values| Ok(Box::new(FakeRow(values)) as Box<dyn DatabaseRow>))
                .collect(),
            Err(e) => vec![Err(e)],
        };
        Box::pin(futures::stream::iter(rows))
    }

    async fn begin(&mut self) -> MigrationResult<()> {
        self.record("BEGIN", &[])
    }

    async fn commit(&mut self) -> MigrationResult<()> {
        self.record("COMMIT", &[])
    }

    async fn rollback(&mut self) -> MigrationResult<()> {
        self.record("ROLLBACK", &[])
    }
}

struct FakeRow(Vec<DatabaseValue>);

impl DatabaseRow for FakeRow {
    fn get_by_index(&self, index: usize) -> MigrationResult<DatabaseValue> {
        self.0
            .get(index)
            .cloned()
            .ok_or_else(|| MigrationError::Conversion(format!("No column at index {}", index)))
    }

    fn column_count(&self) -> usize {
        self.0.len()
    }
}

/// Shorthand for a scripted string cell
pub fn s(value: &str) -> DatabaseValue {
    DatabaseValue::String(value.to_string())
}
