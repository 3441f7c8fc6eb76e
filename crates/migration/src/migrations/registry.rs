//! Ordered catalog of migration steps

use std::fmt;
use std::sync::Arc;

use super::step::MigrationStep;
use crate::error::{MigrationError, MigrationResult};

/// Steps shipped with one product version
pub trait DbVersion: Send + Sync {
    fn add_steps(&self, registry: &mut MigrationStepRegistry) -> MigrationResult<()>;
}

/// Step with its id and description
#[derive(Clone)]
pub struct RegisteredMigrationStep {
    id: i64,
    description: String,
    step: Arc<dyn MigrationStep>,
}

impl RegisteredMigrationStep {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn step(&self) -> &Arc<dyn MigrationStep> {
        &self.step
    }
}

impl fmt::Debug for RegisteredMigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} '{}'", self.id, self.description)
    }
}

impl fmt::Display for RegisteredMigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} '{}'", self.id, self.description)
    }
}

/// Collects steps while versions register them
#[derive(Default)]
pub struct MigrationStepRegistry {
    steps: Vec<RegisteredMigrationStep>,
}

impl MigrationStepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step; ids are non-negative and strictly increasing
    pub fn add<S>(&mut self, id: i64, description: &str, step: S) -> MigrationResult<&mut Self>
    where
        S: MigrationStep + 'static,
    {
        if id < 0 {
            return Err(MigrationError::Registry(format!(
                "Migration number must be >= 0, got {}",
                id
            )));
        }
        if let Some(last) = self.steps.last() {
            if id <= last.id {
                return Err(MigrationError::Registry(format!(
                    "Migration number must be strictly greater than the last one ({}), got {}",
                    last.id, id
                )));
            }
        }
        if description.trim().is_empty() {
            return Err(MigrationError::Registry(format!(
                "Description of migration #{} can't be empty",
                id
            )));
        }

        self.steps.push(RegisteredMigrationStep {
            id,
            description: description.to_string(),
            step: Arc::new(step),
        });
        Ok(self)
    }

    /// Freeze the catalog
    pub fn build(self) -> MigrationSteps {
        MigrationSteps { steps: self.steps }
    }

    /// Register every version in order and freeze the result
    pub fn from_versions(versions: &[Box<dyn DbVersion>]) -> MigrationResult<MigrationSteps> {
        let mut registry = Self::new();
        for version in versions {
            version.add_steps(&mut registry)?;
        }
        Ok(registry.build())
    }
}

/// Immutable, ordered steps
#[derive(Debug, Clone, Default)]
pub struct MigrationSteps {
    steps: Vec<RegisteredMigrationStep>,
}

impl MigrationSteps {
    pub fn all(&self) -> &[RegisteredMigrationStep] {
        &self.steps
    }

    /// Steps with an id greater than or equal to `id`
    pub fn read_from(&self, id: i64) -> &[RegisteredMigrationStep] {
        let start = self.steps.partition_point(|s| s.id < id);
        &self.steps[start..]
    }

    /// Catalog truncated after `id`, for partial upgrades
    pub fn up_to(&self, id: i64) -> MigrationSteps {
        let end = self.steps.partition_point(|s| s.id <= id);
        MigrationSteps {
            steps: self.steps[..end].to_vec(),
        }
    }

    pub fn max_id(&self) -> Option<i64> {
        self.steps.last().map(|s| s.id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
