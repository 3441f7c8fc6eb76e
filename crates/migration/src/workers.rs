//! Bounded worker pool for migration units
//!
//! A fixed number of tokio tasks consume units from a bounded queue. When the
//! queue is full the submitting task runs the unit itself, which throttles the
//! producer and caps memory whatever the number of units.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{MigrationError, MigrationResult};

type UnitRunner<T> = Arc<dyn Fn(T) -> BoxFuture<'static, MigrationResult<()>> + Send + Sync>;

/// Outcome shared by the workers and the submitter; the first error wins
#[derive(Default)]
struct Failure {
    failed: AtomicBool,
    error: Mutex<Option<MigrationError>>,
}

impl Failure {
    fn record(&self, error: MigrationError) {
        tracing::error!("Migration unit failed: {}", error);
        if let Ok(mut first) = self.error.lock() {
            if first.is_none() {
                *first = Some(error);
            }
        }
        self.failed.store(true, Ordering::Release);
    }

    fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn take(&self) -> Option<MigrationError> {
        self.error.lock().ok().and_then(|mut first| first.take())
    }
}

pub struct UnitPool<T> {
    sender: Option<mpsc::Sender<T>>,
    workers: Vec<JoinHandle<()>>,
    runner: UnitRunner<T>,
    failure: Arc<Failure>,
}

impl<T: Send + 'static> UnitPool<T> {
    /// Spawn `workers` tasks running `run` on each unit. With no workers every
    /// unit runs on the submitting task.
    pub fn new<F, Fut>(workers: usize, queue_capacity: usize, run: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MigrationResult<()>> + Send + 'static,
    {
        let runner: UnitRunner<T> = Arc::new(move |unit| Box::pin(run(unit)));
        let failure = Arc::new(Failure::default());

        if workers == 0 {
            return Self {
                sender: None,
                workers: Vec::new(),
                runner,
                failure,
            };
        }

        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let handles = (0..workers)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let runner = Arc::clone(&runner);
                let failure = Arc::clone(&failure);
                tokio::spawn(async move {
                    loop {
                        let unit = receiver.lock().await.recv().await;
                        let Some(unit) = unit else { break };
                        // drain the queue once a unit failed
                        if failure.is_failed() {
                            continue;
                        }
                        if let Err(e) = runner(unit).await {
                            failure.record(e);
                        }
                    }
                    tracing::debug!(worker, "Migration worker stopped");
                })
            })
            .collect();

        Self {
            sender: Some(sender),
            workers: handles,
            runner,
            failure,
        }
    }

    /// Queue a unit, or run it right away when the queue is full. Units
    /// submitted after a failure are dropped.
    pub async fn submit(&self, unit: T) -> MigrationResult<()> {
        if self.failure.is_failed() {
            tracing::debug!("Skipping migration unit after an earlier failure");
            return Ok(());
        }

        let unit = match &self.sender {
            None => unit,
            Some(sender) => match sender.try_send(unit) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(unit)) => unit,
                Err(TrySendError::Closed(_)) => {
                    return Err(MigrationError::Concurrency(
                        "Migration unit pool is shut down".to_string(),
                    ))
                }
            },
        };

        if let Err(e) = (self.runner)(unit).await {
            self.failure.record(e);
        }
        Ok(())
    }

    /// Whether a unit failed; producers should stop submitting
    pub fn is_failed(&self) -> bool {
        self.failure.is_failed()
    }

    /// Close the queue, wait for every worker and report the first error.
    /// A worker panic is reported before unit failures.
    pub async fn shutdown(mut self) -> MigrationResult<()> {
        self.sender.take();
        let mut panicked = None;
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!("Migration worker panicked: {}", e);
                panicked.get_or_insert_with(|| {
                    MigrationError::Concurrency(format!("Migration worker panicked: {}", e))
                });
            }
        }
        match panicked.or_else(|| self.failure.take()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
