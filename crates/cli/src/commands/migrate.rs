use std::collections::BTreeMap;

use anyhow::Context as _;
use strata_migration::config::redact_url;
use strata_migration::versions::migration_steps;
use strata_migration::{
    connect, Context, DatabasePool, DatabaseVersion, MigrationConfig, MigrationError,
    MigrationHistory, MigrationStepsExecutor,
};

async fn open() -> anyhow::Result<Context> {
    let config = MigrationConfig::from_env().context("Invalid migration configuration")?;
    if config.database_url.is_none() {
        anyhow::bail!("DATABASE_URL must be set");
    }
    tracing::info!(
        "Connecting to {}",
        config.database_url.as_deref().map(redact_url).unwrap_or_default()
    );
    let pool = connect(&config).await?;
    Ok(Context::new(pool, config))
}

fn history(ctx: &Context) -> MigrationHistory {
    MigrationHistory::new(ctx.pool().clone(), &ctx.config().ledger_table)
}

pub async fn status(json: bool) -> anyhow::Result<()> {
    let ctx = open().await?;
    let steps = migration_steps()?;
    let history = history(&ctx);
    let version = DatabaseVersion::new(&history, &steps);

    let status = version.status().await?;
    let pending = version.pending_ids().await?;
    let last = history.last_migration_number().await?;

    if json {
        let output = serde_json::json!({
            "dialect": ctx.dialect().id(),
            "status": status,
            "last_applied": last,
            "pending": pending,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Dialect:      {}", ctx.dialect());
        println!("Status:       {:?}", status);
        match last {
            Some(id) => println!("Last applied: #{}", id),
            None => println!("Last applied: none"),
        }
        println!("Pending:      {} of {} steps", pending.len(), steps.len());
    }

    ctx.pool().close().await?;
    Ok(())
}

pub async fn list() -> anyhow::Result<()> {
    let ctx = open().await?;
    let steps = migration_steps()?;
    let applied: BTreeMap<i64, String> = history(&ctx)
        .records()
        .await?
        .into_iter()
        .map(|r| (r.id, r.applied_at.to_rfc3339()))
        .collect();

    for step in steps.all() {
        match applied.get(&step.id()) {
            Some(at) => println!("  applied  {}  ({})", step, at),
            None => println!("  pending  {}", step),
        }
    }

    ctx.pool().close().await?;
    Ok(())
}

pub async fn up(to: Option<i64>, json: bool) -> anyhow::Result<()> {
    let ctx = open().await?;
    let steps = match to {
        Some(id) => migration_steps()?.up_to(id),
        None => migration_steps()?,
    };
    let executor = MigrationStepsExecutor::new(ctx.clone());

    let result = executor.execute(&steps).await;
    ctx.pool().close().await?;

    let report = match result {
        Ok(report) => report,
        Err(MigrationError::StepFailed { id, description, source, report }) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            anyhow::bail!(
                "Migration step #{} '{}' failed after {} applied steps: {}",
                id,
                description,
                report.applied_count(),
                source.root_cause()
            )
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.applied.is_empty() {
        println!("Database is up to date");
    } else {
        println!(
            "Applied {} steps in {}ms",
            report.applied_count(),
            report.execution_time_ms
        );
    }
    Ok(())
}
