//! Error types for the migration engine
//!
//! Authoring bugs (bad column specifications, unsupported dialect/type
//! combinations, broken registries) are reported while statements are being
//! built, before anything touches the database. Everything else is an
//! operational failure of the step that raised it.

use crate::config::ConfigError;
use crate::migrations::MigrationRunReport;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error types for migration operations
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Invalid table, column, index or constraint specification
    #[error("Invalid specification: {0}")]
    Specification(String),

    /// Broken step registry (duplicate, negative or out-of-order ids)
    #[error("Registry error: {0}")]
    Registry(String),

    /// SQL execution failure
    #[error("Database error: {0}")]
    Database(String),

    /// Connection pool or connectivity failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// A column value could not be read as the requested type
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Worker pool failure
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A migration step failed; the ledger was left untouched for it.
    /// `report` covers the run up to and including the failed step.
    #[error("Execution of migration step #{id} '{description}' failed: {source}")]
    StepFailed {
        id: i64,
        description: String,
        #[source]
        source: Box<MigrationError>,
        report: Box<MigrationRunReport>,
    },
}

impl MigrationError {
    /// Whether running the same migration again could succeed.
    ///
    /// Specification, registry and configuration errors are authoring bugs
    /// and fail identically on every run.
    pub fn is_retryable(&self) -> bool {
        match self {
            MigrationError::Specification(_)
            | MigrationError::Registry(_)
            | MigrationError::Config(_) => false,
            MigrationError::StepFailed { source, .. } => source.is_retryable(),
            _ => true,
        }
    }

    /// Innermost cause, unwrapping step failures
    pub fn root_cause(&self) -> &MigrationError {
        match self {
            MigrationError::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                MigrationError::Connection(err.to_string())
            }
            other => MigrationError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        MigrationError::Serialization(err.to_string())
    }
}
