//! Worker pool and batch handle.
//!
//! `run_batch` validates the profile, loads shared assets, plans output
//! names and then starts a fixed number of worker tasks. Workers pull
//! source indices from a shared atomic cursor and run the CPU-bound
//! pipeline on tokio's blocking pool, one item at a time.

use super::cancel::CancelToken;
use super::job::*;
use super::naming::{PlannedOutput, plan_outputs};
use super::pipeline::process_item;
use crate::engine::PreparedProfile;
use crate::stats::summarize;
use crate::types::{Result, WatermarkError};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Called on the worker after each item finishes
pub type ItemCallback = Arc<dyn Fn(&ItemResult, BatchProgress) + Send + Sync>;

/// Number of workers when none is configured
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Clone)]
pub struct BatchOptions {
    /// Size of the worker pool, at least 1
    pub workers: usize,
    pub on_item: Option<ItemCallback>,
    /// Flag observed by the batch; clones can cancel it from anywhere
    pub cancel: CancelToken,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            on_item: None,
            cancel: CancelToken::new(),
        }
    }
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("workers", &self.workers)
            .field("on_item", &self.on_item.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl BatchOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn on_item<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ItemResult, BatchProgress) + Send + Sync + 'static,
    {
        self.on_item = Some(Arc::new(callback));
        self
    }
}

/// Handle to a running batch
pub struct BatchHandle {
    cancel: CancelToken,
    state: watch::Receiver<JobState>,
    results: mpsc::UnboundedReceiver<ItemResult>,
    driver: JoinHandle<BatchSummary>,
    total: usize,
}

impl BatchHandle {
    /// Request cancellation. Items already past encoding still finish.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Next finished item in completion order, `None` once all are reported
    pub async fn next_result(&mut self) -> Option<ItemResult> {
        self.results.recv().await
    }

    /// Wait for the batch to finish; results come back in submission order
    pub async fn wait(self) -> Result<BatchSummary> {
        Ok(self.driver.await?)
    }
}

struct Shared {
    sources: Vec<PathBuf>,
    plan: Vec<PlannedOutput>,
    prepared: Arc<PreparedProfile>,
    cancel: CancelToken,
    cursor: AtomicUsize,
    completed: AtomicUsize,
    on_item: Option<ItemCallback>,
}

/// Start a batch.
///
/// Fails before any item is touched when the profile is invalid, a logo
/// cannot be loaded or the destination directory cannot be created.
pub async fn run_batch(job: BatchJob, options: BatchOptions) -> Result<BatchHandle> {
    let BatchJob {
        sources,
        profile,
        dest_dir,
    } = job;

    let prepared = PreparedProfile::prepare_async(profile).await?;
    tokio::fs::create_dir_all(&dest_dir)
        .await
        .map_err(|e| WatermarkError::filesystem(&dest_dir, e))?;

    let plan = plan_outputs(&sources, &dest_dir, &prepared.profile().output);
    let total = sources.len();
    let workers = options.workers.max(1).min(total.max(1));

    log::info!(
        "Starting batch '{}': {} source(s), {} worker(s), output to {}",
        prepared.profile().name,
        total,
        workers,
        dest_dir.display()
    );

    let cancel = options.cancel;
    let (state_tx, state_rx) = watch::channel(JobState::Pending);
    let (result_tx, result_rx) = mpsc::unbounded_channel();

    let shared = Arc::new(Shared {
        sources,
        plan,
        prepared,
        cancel: cancel.clone(),
        cursor: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
        on_item: options.on_item,
    });

    let driver = tokio::spawn(drive(shared, workers, state_tx, result_tx));

    Ok(BatchHandle {
        cancel,
        state: state_rx,
        results: result_rx,
        driver,
        total,
    })
}

async fn drive(
    shared: Arc<Shared>,
    workers: usize,
    state: watch::Sender<JobState>,
    results: mpsc::UnboundedSender<ItemResult>,
) -> BatchSummary {
    let started = Instant::now();
    state.send_replace(JobState::Running);

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let handles: Vec<_> = (0..workers)
        .map(|_| tokio::spawn(worker(shared.clone(), done_tx.clone())))
        .collect();
    drop(done_tx);

    let mut slots: Vec<Option<ItemResult>> = vec![None; shared.sources.len()];
    while let Some(result) = done_rx.recv().await {
        let index = result.index;
        let _ = results.send(result.clone());
        slots[index] = Some(result);
    }

    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Batch worker stopped unexpectedly: {e}");
        }
    }

    // Empty slots are left only when workers died: claimed indices were
    // mid-flight, the rest never started
    let claimed = shared.cursor.load(Ordering::SeqCst);
    let results_in_order: Vec<ItemResult> = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                let source = shared.sources[index].clone();
                let planned = Some(shared.plan[index].path().to_path_buf());
                if index < claimed {
                    let err = WatermarkError::Encode("worker stopped before finishing".to_string());
                    ItemResult::from_error(index, source, planned, &err)
                } else {
                    ItemResult::aborted(index, source, planned)
                }
            })
        })
        .collect();

    let counts = summarize(&results_in_order);
    let final_state = if shared.cancel.is_cancelled() && counts.aborted > 0 {
        JobState::Aborted
    } else {
        JobState::Completed
    };

    let summary = BatchSummary {
        state: final_state,
        total: counts.total,
        succeeded: counts.succeeded,
        failed: counts.failed,
        aborted: counts.aborted,
        results: results_in_order,
        elapsed: started.elapsed(),
    };

    log::info!(
        "Batch {:?}: {} succeeded, {} failed, {} aborted in {:.2?}",
        summary.state,
        summary.succeeded,
        summary.failed,
        summary.aborted,
        summary.elapsed
    );

    // State turns terminal before the result stream closes
    state.send_replace(final_state);
    drop(results);
    summary
}

async fn worker(shared: Arc<Shared>, done: mpsc::UnboundedSender<ItemResult>) {
    let total = shared.sources.len();

    loop {
        let index = shared.cursor.fetch_add(1, Ordering::SeqCst);
        if index >= total {
            break;
        }
        let source = shared.sources[index].clone();
        let planned = shared.plan[index].path().to_path_buf();

        let result = if shared.cancel.is_cancelled() {
            ItemResult::aborted(index, source, Some(planned))
        } else {
            let task_shared = shared.clone();
            let task_source = source.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                process_item(
                    index,
                    task_source,
                    &task_shared.plan[index],
                    &task_shared.prepared,
                    &task_shared.cancel,
                )
            })
            .await;

            match outcome {
                Ok(result) => result,
                Err(e) => {
                    let err = WatermarkError::from(e);
                    log::warn!("Item #{index} ({}) failed: {err}", source.display());
                    ItemResult::from_error(index, source, Some(planned), &err)
                }
            }
        };

        let completed = shared.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(callback) = &shared.on_item {
            let progress = BatchProgress { completed, total };
            let call = AssertUnwindSafe(|| callback(&result, progress));
            if panic::catch_unwind(call).is_err() {
                log::error!("Item callback panicked on item #{index}; continuing");
            }
        }

        if done.send(result).is_err() {
            break;
        }
    }
}
