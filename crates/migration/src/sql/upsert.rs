//! Parameterized write statements with batching

use super::Parameters;
use crate::backends::{DatabaseConnection, DatabaseValue};
use crate::error::MigrationResult;

/// INSERT, UPDATE or DELETE executed on a borrowed connection.
///
/// The first execution opens a transaction which stays open until
/// [`Upsert::commit`]. A failed execution rolls it back.
pub struct Upsert<'c> {
    conn: &'c mut dyn DatabaseConnection,
    sql: String,
    params: Parameters,
    batch: Vec<Vec<DatabaseValue>>,
    in_transaction: bool,
    affected_rows: u64,
}

impl<'c> Upsert<'c> {
    pub fn new(conn: &'c mut dyn DatabaseConnection, sql: impl Into<String>) -> Self {
        Self {
            conn,
            sql: sql.into(),
            params: Parameters::default(),
            batch: Vec::new(),
            in_transaction: false,
            affected_rows: 0,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn set_string(&mut self, index: usize, value: Option<&str>) -> &mut Self {
        self.params.set(index, value.into());
        self
    }

    pub fn set_long(&mut self, index: usize, value: Option<i64>) -> &mut Self {
        self.params.set(index, value.into());
        self
    }

    pub fn set_double(&mut self, index: usize, value: Option<f64>) -> &mut Self {
        self.params.set(index, value.into());
        self
    }

    pub fn set_boolean(&mut self, index: usize, value: Option<bool>) -> &mut Self {
        self.params.set(index, value.into());
        self
    }

    pub fn set_bytes(&mut self, index: usize, value: Option<Vec<u8>>) -> &mut Self {
        self.params.set(index, value.into());
        self
    }

    /// Queue the current parameters and start a fresh set
    pub fn add_batch(&mut self) -> MigrationResult<()> {
        let values = self.params.resolve()?;
        self.batch.push(values);
        self.params.clear();
        Ok(())
    }

    /// Number of queued parameter sets
    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    /// Execute the queued batch, or the current parameters when nothing was
    /// queued. Returns the rows affected by this call.
    pub async fn execute(&mut self) -> MigrationResult<u64> {
        if self.batch.is_empty() {
            self.add_batch()?;
        }

        if !self.in_transaction {
            self.conn.begin().await?;
            self.in_transaction = true;
        }

        let batch = std::mem::take(&mut self.batch);
        let mut affected = 0;
        for params in &batch {
            match self.conn.execute(&self.sql, params).await {
                Ok(rows) => affected += rows,
                Err(e) => {
                    if let Err(rollback) = self.rollback().await {
                        tracing::warn!("Rollback after failed statement also failed: {}", rollback);
                    }
                    return Err(e);
                }
            }
        }

        self.affected_rows += affected;
        Ok(affected)
    }

    pub async fn commit(&mut self) -> MigrationResult<()> {
        if self.in_transaction {
            self.conn.commit().await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    /// Discard uncommitted writes and any queued batch
    pub async fn rollback(&mut self) -> MigrationResult<()> {
        self.batch.clear();
        self.params.clear();
        if self.in_transaction {
            self.in_transaction = false;
            self.conn.rollback().await?;
        }
        Ok(())
    }

    /// Rows affected by every execution so far
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }
}
