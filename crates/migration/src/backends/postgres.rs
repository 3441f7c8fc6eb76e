//! PostgreSQL Backend Implementation
//!
//! This module provides the PostgreSQL-specific implementation of the database
//! backend traits using sqlx as the underlying database driver.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Pool, Postgres, Row, TypeInfo, ValueRef};

use super::core::*;
use crate::config::{redact_url, PoolConfig};
use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};

/// Create a PostgreSQL connection pool
pub async fn create_pool(
    database_url: &str,
    config: &PoolConfig,
) -> MigrationResult<Arc<dyn DatabasePool>> {
    tracing::debug!(
        "Creating database pool with config: max={}, min={}, timeout={}s, idle_timeout={:?}s",
        config.max_connections,
        config.min_connections,
        config.acquire_timeout,
        config.idle_timeout
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout))
        .test_before_acquire(config.test_before_acquire);

    if let Some(idle_timeout) = config.idle_timeout {
        options = options.idle_timeout(Duration::from_secs(idle_timeout));
    }

    let pool = options.connect(database_url).await.map_err(|e| {
        tracing::error!("Failed to create database pool: {}", e);
        MigrationError::Connection(format!(
            "Failed to connect to {}: {}",
            redact_url(database_url),
            e
        ))
    })?;

    tracing::info!(
        "Database pool created with {} max connections",
        config.max_connections
    );
    Ok(Arc::new(PostgresPool::new(pool)))
}

/// PostgreSQL connection pool implementation
pub struct PostgresPool {
    pool: Pool<Postgres>,
}

impl PostgresPool {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabasePool for PostgresPool {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    async fn acquire(&self) -> MigrationResult<Box<dyn DatabaseConnection>> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| {
                MigrationError::Connection(format!("Failed to acquire connection: {}", e))
            })?;

        Ok(Box::new(PostgresConnection::new(conn)))
    }

    async fn close(&self) -> MigrationResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// PostgreSQL connection implementation
pub struct PostgresConnection {
    conn: sqlx::pool::PoolConnection<Postgres>,
}

impl PostgresConnection {
    pub fn new(conn: sqlx::pool::PoolConnection<Postgres>) -> Self {
        Self { conn }
    }

    async fn simple(&mut self, sql: &str) -> MigrationResult<u64> {
        let result = sqlx::Executor::execute(&mut *self.conn, sql)
            .await
            .map_err(|e| MigrationError::Database(format!("Failed to execute '{}': {}", sql, e)))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DatabaseConnection for PostgresConnection {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigrationResult<u64> {
        if params.is_empty() {
            return self.simple(sql).await;
        }

        let sql = rewrite_placeholders(sql);
        let result = bind_all(sqlx::query(&sql), params)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| MigrationError::Database(format!("Failed to execute '{}': {}", sql, e)))?;

        Ok(result.rows_affected())
    }

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrationResult<Option<Box<dyn DatabaseRow>>> {
        let sql = rewrite_placeholders(sql);
        let row = bind_all(sqlx::query(&sql), params)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| MigrationError::Database(format!("Failed to query '{}': {}", sql, e)))?;

        Ok(row.map(|r| Box::new(PostgresRow::new(r)) as Box<dyn DatabaseRow>))
    }

    fn fetch<'a>(&'a mut self, sql: &'a str, params: Vec<DatabaseValue>) -> RowStream<'a> {
        let conn = &mut *self.conn;
        Box::pin(async_stream::try_stream! {
            let sql = rewrite_placeholders(sql);
            let mut rows = bind_all(sqlx::query(&sql), &params).fetch(&mut *conn);
            while let Some(row) = rows.try_next().await? {
                yield Box::new(PostgresRow::new(row)) as Box<dyn DatabaseRow>;
            }
        })
    }

    async fn begin(&mut self) -> MigrationResult<()> {
        self.simple("BEGIN").await.map(|_| ())
    }

    async fn commit(&mut self) -> MigrationResult<()> {
        self.simple("COMMIT").await.map(|_| ())
    }

    async fn rollback(&mut self) -> MigrationResult<()> {
        self.simple("ROLLBACK").await.map(|_| ())
    }
}

/// PostgreSQL row implementation
pub struct PostgresRow {
    row: PgRow,
}

impl PostgresRow {
    pub fn new(row: PgRow) -> Self {
        Self { row }
    }
}

impl DatabaseRow for PostgresRow {
    fn get_by_index(&self, index: usize) -> MigrationResult<DatabaseValue> {
        postgres_value_to_database_value(&self.row, index)
    }

    fn column_count(&self) -> usize {
        self.row.len()
    }
}

/// Replace positional `?` placeholders with `$1`, `$2`, ... outside quoted text
pub fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut in_literal = false;
    let mut in_identifier = false;

    for c in sql.chars() {
        match c {
            '\'' if !in_identifier => in_literal = !in_literal,
            '"' if !in_literal => in_identifier = !in_identifier,
            '?' if !in_literal && !in_identifier => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
                continue;
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[DatabaseValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            DatabaseValue::Null(kind) => match kind {
                ValueKind::Bool => query.bind(Option::<bool>::None),
                ValueKind::Int32 => query.bind(Option::<i32>::None),
                ValueKind::Int64 => query.bind(Option::<i64>::None),
                ValueKind::Float64 => query.bind(Option::<f64>::None),
                ValueKind::String => query.bind(Option::<String>::None),
                ValueKind::Bytes => query.bind(Option::<Vec<u8>>::None),
            },
            DatabaseValue::Bool(b) => query.bind(*b),
            DatabaseValue::Int32(i) => query.bind(*i),
            DatabaseValue::Int64(i) => query.bind(*i),
            DatabaseValue::Float64(f) => query.bind(*f),
            DatabaseValue::String(s) => query.bind(s.clone()),
            DatabaseValue::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

fn null_kind(type_name: &str) -> ValueKind {
    match type_name {
        "BOOL" => ValueKind::Bool,
        "INT2" | "INT4" => ValueKind::Int32,
        "INT8" => ValueKind::Int64,
        "FLOAT4" | "FLOAT8" | "NUMERIC" => ValueKind::Float64,
        "BYTEA" => ValueKind::Bytes,
        _ => ValueKind::String,
    }
}

/// Convert a PostgreSQL column value to DatabaseValue
fn postgres_value_to_database_value(row: &PgRow, index: usize) -> MigrationResult<DatabaseValue> {
    let column = row
        .columns()
        .get(index)
        .ok_or_else(|| MigrationError::Conversion(format!("No column at index {}", index)))?;
    let type_name = column.type_info().name().to_string();

    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(DatabaseValue::Null(null_kind(&type_name)));
    }

    let value = match type_name.as_str() {
        "BOOL" => DatabaseValue::Bool(row.try_get(index)?),
        "INT2" => DatabaseValue::Int32(row.try_get::<i16, _>(index)? as i32),
        "INT4" => DatabaseValue::Int32(row.try_get(index)?),
        "INT8" => DatabaseValue::Int64(row.try_get(index)?),
        "FLOAT4" => DatabaseValue::Float64(row.try_get::<f32, _>(index)? as f64),
        "FLOAT8" => DatabaseValue::Float64(row.try_get(index)?),
        "NUMERIC" => {
            let decimal: rust_decimal::Decimal = row.try_get(index)?;
            let value = decimal.to_f64().ok_or_else(|| {
                MigrationError::Conversion(format!("NUMERIC value {} out of range", decimal))
            })?;
            DatabaseValue::Float64(value)
        }
        "BYTEA" => DatabaseValue::Bytes(row.try_get(index)?),
        _ => {
            let value: String = row.try_get(index).map_err(|e| {
                MigrationError::Conversion(format!(
                    "Failed to get value as string for type '{}': {}",
                    type_name, e
                ))
            })?;
            DatabaseValue::String(value)
        }
    };
    Ok(value)
}
