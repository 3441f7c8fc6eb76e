//! Migration Definitions - Core types shared by the ledger and the executor

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Row of the migration ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Step id
    pub id: i64,
    /// When the step was applied
    pub applied_at: DateTime<Utc>,
}

impl MigrationRecord {
    pub fn from_millis(id: i64, applied_at: i64) -> Self {
        Self {
            id,
            applied_at: Utc
                .timestamp_millis_opt(applied_at)
                .single()
                .unwrap_or_default(),
        }
    }
}

/// Lifecycle of a step within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    Pending,
    Running,
    Applied,
    Failed,
}

/// What happened to one step during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub id: i64,
    pub description: String,
    pub state: StepState,
    /// Execution time, 0 when the step did not run
    pub elapsed_ms: u128,
}

/// Result of running migrations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationRunReport {
    /// Ids of the steps applied by this run, in order
    pub applied: Vec<i64>,
    /// Number of registered steps already in the ledger
    pub skipped_count: usize,
    /// Every step considered by this run, in order
    pub outcomes: Vec<StepOutcome>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// First step that failed, if any
    pub fn failed_step(&self) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.state == StepState::Failed)
    }
}

/// How the database compares to the registered steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseVersionStatus {
    /// No ledger, or an empty one
    FreshInstall,
    UpToDate,
    /// Some registered steps are not applied yet
    RequiresUpgrade,
    /// The ledger holds steps newer than anything registered
    RequiresDowngrade,
}
