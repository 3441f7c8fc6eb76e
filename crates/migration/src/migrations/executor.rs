//! Migration Executor - Applies pending steps in order

use std::time::Instant;

use super::definitions::{MigrationRunReport, StepOutcome, StepState};
use super::history::MigrationHistory;
use super::registry::{MigrationSteps, RegisteredMigrationStep};
use super::step::Context;
use crate::error::{MigrationError, MigrationResult};

/// Runs every step missing from the ledger, one after the other.
///
/// The first failure stops the run. Steps applied before it stay recorded,
/// the failed step is not, so the next run starts again from it.
pub struct MigrationStepsExecutor {
    ctx: Context,
    history: MigrationHistory,
}

impl MigrationStepsExecutor {
    pub fn new(ctx: Context) -> Self {
        let history = MigrationHistory::new(ctx.pool().clone(), &ctx.config().ledger_table);
        Self { ctx, history }
    }

    pub fn history(&self) -> &MigrationHistory {
        &self.history
    }

    pub async fn execute(&self, steps: &MigrationSteps) -> MigrationResult<MigrationRunReport> {
        let start_time = Instant::now();

        self.history.start().await?;
        let applied = self.history.applied_ids().await?;

        let pending: Vec<&RegisteredMigrationStep> =
            steps.all().iter().filter(|s| !applied.contains(&s.id())).collect();
        let mut report = MigrationRunReport {
            skipped_count: steps.len() - pending.len(),
            outcomes: pending
                .iter()
                .map(|s| StepOutcome {
                    id: s.id(),
                    description: s.description().to_string(),
                    state: StepState::Pending,
                    elapsed_ms: 0,
                })
                .collect(),
            ..Default::default()
        };

        if pending.is_empty() {
            tracing::info!(
                "Database is up to date, {} steps already applied",
                report.skipped_count
            );
            return Ok(report);
        }
        tracing::info!("{} migration steps to apply", pending.len());

        for (index, step) in pending.iter().enumerate() {
            report.outcomes[index].state = StepState::Running;
            tracing::info!(step = step.id(), "Executing migration step {}", step);
            let step_start = Instant::now();

            let result = self.execute_step(step).await;
            let elapsed_ms = step_start.elapsed().as_millis();
            report.outcomes[index].elapsed_ms = elapsed_ms;

            if let Err(e) = result {
                report.outcomes[index].state = StepState::Failed;
                report.execution_time_ms = start_time.elapsed().as_millis();
                tracing::error!(
                    step = step.id(),
                    "Migration step {} failed after {}ms: {}",
                    step,
                    elapsed_ms,
                    e
                );
                return Err(MigrationError::StepFailed {
                    id: step.id(),
                    description: step.description().to_string(),
                    source: Box::new(e),
                    report: Box::new(report),
                });
            }

            report.outcomes[index].state = StepState::Applied;
            report.applied.push(step.id());
            tracing::info!(step = step.id(), "Migration step {} done in {}ms", step, elapsed_ms);
        }

        report.execution_time_ms = start_time.elapsed().as_millis();
        tracing::info!(
            "Applied {} migration steps in {}ms",
            report.applied_count(),
            report.execution_time_ms
        );
        Ok(report)
    }

    async fn execute_step(&self, step: &RegisteredMigrationStep) -> MigrationResult<()> {
        step.step().execute(&self.ctx).await?;
        self.history.done(step.id(), self.ctx.now_millis()).await
    }
}
