//! Migration registry, ledger and executor
//!
//! Versions register numbered steps into a [`MigrationStepRegistry`]; the
//! [`MigrationStepsExecutor`] applies the ones missing from the ledger kept by
//! [`MigrationHistory`], in id order, on a single task.

pub mod definitions;
pub mod executor;
pub mod history;
pub mod registry;
pub mod step;
pub mod version;

pub use definitions::{
    DatabaseVersionStatus, MigrationRecord, MigrationRunReport, StepOutcome, StepState,
};
pub use executor::MigrationStepsExecutor;
pub use history::MigrationHistory;
pub use registry::{DbVersion, MigrationStepRegistry, MigrationSteps, RegisteredMigrationStep};
pub use step::{Clock, Context, FixedClock, MigrationStep, SystemClock};
pub use version::DatabaseVersion;
