//! # strata-migration: versioned schema and data migrations
//!
//! Upgrades a relational database from whatever version it is at to the
//! latest one, one numbered step at a time:
//!
//! - DDL builders rendering vendor-specific SQL for H2, PostgreSQL, Oracle
//!   and SQL Server from a single column model
//! - a ledger of applied steps, so a run only executes what is missing
//! - streaming `Select`/`Upsert`/`MassUpdate` statements for data
//!   migrations of unbounded size
//! - a bounded worker pool for data migrations split into independent units

pub mod backends;
pub mod config;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod introspection;
pub mod migrations;
pub mod schema;
pub mod sql;
pub mod versions;
pub mod workers;

pub use backends::{connect, DatabaseConnection, DatabasePool, DatabaseValue, ValueKind};
pub use config::{ConfigError, MigrationConfig, PoolConfig};
pub use dialect::Dialect;
pub use error::{MigrationError, MigrationResult};
pub use migrations::{
    Context, DatabaseVersion, DatabaseVersionStatus, DbVersion, MigrationHistory,
    MigrationRunReport, MigrationStep, MigrationStepRegistry, MigrationSteps,
    MigrationStepsExecutor,
};
pub use workers::UnitPool;
