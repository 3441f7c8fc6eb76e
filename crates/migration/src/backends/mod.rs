//! Database Backend Abstractions
//!
//! The hosting database-access layer owns physical connections; the engine
//! only sees these traits. PostgreSQL ships with a sqlx implementation.

pub mod core;
pub mod postgres;

#[cfg(test)]
pub mod fake;

pub use self::core::*;

use std::sync::Arc;

use crate::config::MigrationConfig;
use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};

/// Open a connection pool for the configured database
pub async fn connect(config: &MigrationConfig) -> MigrationResult<Arc<dyn DatabasePool>> {
    let dialect = config.resolve_dialect()?;
    let url = config.database_url.as_deref().ok_or_else(|| {
        MigrationError::Config(crate::config::ConfigError::Missing {
            field: "DATABASE_URL".to_string(),
        })
    })?;

    match dialect {
        Dialect::PostgreSql => postgres::create_pool(url, &config.pool).await,
        other => Err(MigrationError::Connection(format!(
            "No runtime backend available for dialect {}; DDL generation is supported, execution is not",
            other
        ))),
    }
}
