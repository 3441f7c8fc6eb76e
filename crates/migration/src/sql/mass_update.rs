//! Streaming read-transform-write over two connections

use std::sync::Arc;

use super::progress::Progress;
use super::select::{Row, Select, SelectQuery};
use super::upsert::Upsert;
use crate::backends::DatabaseConnection;
use crate::error::{MigrationError, MigrationResult};

pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Per-row callback of a [`MassUpdate`].
///
/// `handle` fills the upsert parameters and returns `true` to queue them.
/// `finish` runs once after the last row so a handler that accumulates rows
/// can flush what it still holds.
pub trait RowHandler: Send {
    fn handle(&mut self, row: &Row, update: &mut Upsert<'_>) -> MigrationResult<bool>;

    fn finish(&mut self, _update: &mut Upsert<'_>) -> MigrationResult<bool> {
        Ok(false)
    }
}

struct FnHandler<F>(F);

impl<F> RowHandler for FnHandler<F>
where
    F: FnMut(&Row, &mut Upsert<'_>) -> MigrationResult<bool> + Send,
{
    fn handle(&mut self, row: &Row, update: &mut Upsert<'_>) -> MigrationResult<bool> {
        (self.0)(row, update)
    }
}

/// Rows are read on one connection and written on another, so the cursor
/// stays open while writes are committed every `batch_size` rows.
pub struct MassUpdate {
    read: Box<dyn DatabaseConnection>,
    write: Box<dyn DatabaseConnection>,
    select: Option<SelectQuery>,
    update: Option<String>,
    row_plural_name: String,
    batch_size: usize,
    progress: Arc<Progress>,
}

impl MassUpdate {
    pub fn new(read: Box<dyn DatabaseConnection>, write: Box<dyn DatabaseConnection>) -> Self {
        Self {
            read,
            write,
            select: None,
            update: None,
            row_plural_name: "rows".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            progress: Arc::new(Progress::new()),
        }
    }

    pub fn select(mut self, query: SelectQuery) -> Self {
        self.select = Some(query);
        self
    }

    pub fn update(mut self, sql: impl Into<String>) -> Self {
        self.update = Some(sql.into());
        self
    }

    pub fn row_plural_name(mut self, name: &str) -> Self {
        self.row_plural_name = name.to_string();
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Count read rows on a shared counter
    pub fn progress(mut self, progress: Arc<Progress>) -> Self {
        self.progress = progress;
        self
    }

    /// Run with a closure as row handler
    pub async fn execute<F>(self, handler: F) -> MigrationResult<u64>
    where
        F: FnMut(&Row, &mut Upsert<'_>) -> MigrationResult<bool> + Send,
    {
        let mut handler = FnHandler(handler);
        self.execute_with(&mut handler).await
    }

    /// Stream every selected row through `handler`; returns the number of rows read
    pub async fn execute_with<H: RowHandler>(self, handler: &mut H) -> MigrationResult<u64> {
        let MassUpdate {
            mut read,
            mut write,
            select,
            update,
            row_plural_name,
            batch_size,
            progress,
        } = self;

        let select = select.ok_or_else(|| {
            MigrationError::Specification("MassUpdate requires a select query".to_string())
        })?;
        let update = update.ok_or_else(|| {
            MigrationError::Specification("MassUpdate requires an update statement".to_string())
        })?;

        let mut upsert = Upsert::new(write.as_mut(), update);
        let mut rows = select.open(read.as_mut())?;

        match drive(&mut rows, &mut upsert, handler, batch_size, &progress).await {
            Ok(count) => {
                tracing::debug!("{} {} processed", count, row_plural_name);
                Ok(count)
            }
            Err(e) => {
                if let Err(rollback) = upsert.rollback().await {
                    tracing::warn!("Rollback after failed mass update failed: {}", rollback);
                }
                Err(e)
            }
        }
    }
}

async fn drive<H: RowHandler>(
    rows: &mut Select<'_>,
    upsert: &mut Upsert<'_>,
    handler: &mut H,
    batch_size: usize,
    progress: &Progress,
) -> MigrationResult<u64> {
    let mut count = 0;
    while let Some(row) = rows.next().await? {
        if handler.handle(&row, upsert)? {
            upsert.add_batch()?;
        }
        count += 1;
        progress.advance(1);

        if upsert.batch_len() >= batch_size {
            upsert.execute().await?;
            upsert.commit().await?;
        }
    }

    if handler.finish(upsert)? {
        upsert.add_batch()?;
    }
    if upsert.batch_len() > 0 {
        upsert.execute().await?;
    }
    upsert.commit().await?;
    Ok(count)
}
