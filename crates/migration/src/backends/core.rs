//! Core Database Backend Traits
//!
//! The engine never talks to a driver directly. Hosts provide a pool of
//! connections speaking parameterized SQL; statements use `?` placeholders,
//! bound by position.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::dialect::Dialect;
use crate::error::MigrationResult;

/// Forward-only stream of result rows
pub type RowStream<'a> = BoxStream<'a, MigrationResult<Box<dyn DatabaseRow>>>;

/// Abstract database connection trait
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Dialect of the database behind this connection
    fn dialect(&self) -> Dialect;

    /// Execute a statement and return affected rows count
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigrationResult<u64>;

    /// Execute a query and return the first result row
    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrationResult<Option<Box<dyn DatabaseRow>>>;

    /// Execute a query and stream its rows without buffering the result set
    fn fetch<'a>(&'a mut self, sql: &'a str, params: Vec<DatabaseValue>) -> RowStream<'a>;

    /// Start a transaction; statements run in autocommit mode until then
    async fn begin(&mut self) -> MigrationResult<()>;

    /// Commit the current transaction
    async fn commit(&mut self) -> MigrationResult<()>;

    /// Roll back the current transaction
    async fn rollback(&mut self) -> MigrationResult<()>;
}

/// Abstract database connection pool trait
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Dialect detected when the pool was created
    fn dialect(&self) -> Dialect;

    /// Acquire a connection from the pool
    async fn acquire(&self) -> MigrationResult<Box<dyn DatabaseConnection>>;

    /// Close the pool
    async fn close(&self) -> MigrationResult<()>;
}

/// Abstract database row trait
pub trait DatabaseRow: Send + Sync {
    /// Get a column value by zero-based index
    fn get_by_index(&self, index: usize) -> MigrationResult<DatabaseValue>;

    /// Get column count
    fn column_count(&self) -> usize;
}

/// Type carried by a null value; drivers bind nulls as typed parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int32,
    Int64,
    Float64,
    String,
    Bytes,
}

/// Parameter or column value; `Int32` only comes back from the driver
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null(ValueKind),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl DatabaseValue {
    /// Name of the variant, for conversion error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null(_) => "null",
            DatabaseValue::Bool(_) => "boolean",
            DatabaseValue::Int32(_) => "integer",
            DatabaseValue::Int64(_) => "bigint",
            DatabaseValue::Float64(_) => "double",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
        }
    }
}

/// Rust types a parameter can be set from
pub trait ValueType: Into<DatabaseValue> {
    const KIND: ValueKind;
}

impl ValueType for bool {
    const KIND: ValueKind = ValueKind::Bool;
}

impl ValueType for i64 {
    const KIND: ValueKind = ValueKind::Int64;
}

impl ValueType for f64 {
    const KIND: ValueKind = ValueKind::Float64;
}

impl ValueType for String {
    const KIND: ValueKind = ValueKind::String;
}

impl ValueType for &str {
    const KIND: ValueKind = ValueKind::String;
}

impl ValueType for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytes;
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl<T: ValueType> From<Option<T>> for DatabaseValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null(T::KIND),
        }
    }
}

/// Execute every statement in order on one connection
pub async fn execute_all(
    conn: &mut dyn DatabaseConnection,
    statements: &[String],
) -> MigrationResult<()> {
    for statement in statements {
        tracing::debug!(sql = %statement, "executing DDL");
        conn.execute(statement, &[]).await?;
    }
    Ok(())
}
