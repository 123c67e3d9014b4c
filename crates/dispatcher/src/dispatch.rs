//! Dispatch loop: fetch pending runs and drive each to a terminal status.
//!
//! All runs of one cycle execute as concurrent futures joined in a single
//! task: concurrency comes from suspension on child-process I/O, never
//! from extra OS threads. A new cycle starts only after every run of the
//! previous one has settled, which caps live child processes at the batch
//! limit.

use std::path::PathBuf;
use std::time::Duration;

use futures::future::join_all;
use patchrun_core::types::DbId;
use patchrun_db::models::run::{PendingRun, UpdateRun};
use patchrun_db::models::status::RunStatus;
use tokio_util::sync::CancellationToken;

use crate::config::DispatcherConfig;
use crate::runner::PatchflowRunner;
use crate::store::RunStore;

/// Drives batches of pending runs to completion.
pub struct Dispatcher {
    store: RunStore,
    runner: PatchflowRunner,
    output_dir: PathBuf,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(store: RunStore, runner: PatchflowRunner, config: &DispatcherConfig) -> Self {
        Self {
            store,
            runner,
            output_dir: PathBuf::from(&config.output_dir),
            poll_interval: config.poll_interval(),
        }
    }

    /// One poll cycle: fetch up to the batch limit of pending runs and wait
    /// for every one of them to settle.
    ///
    /// An error here means the cycle could not start (output directory or
    /// fetch failure). Once runs are launched, per-run failures are recorded
    /// against the individual run and never surface as a cycle error.
    pub async fn run_cycle(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let runs = self.store.fetch_pending().await?;
        if runs.is_empty() {
            tracing::info!("No pending runs found");
            return Ok(());
        }

        tracing::info!(count = runs.len(), "Dispatching pending runs");
        join_all(runs.iter().map(|run| self.process_run(run))).await;
        Ok(())
    }

    /// Drive a single run: claim, invoke, persist the terminal status, then
    /// attempt the outputs update.
    async fn process_run(&self, run: &PendingRun) {
        match self.store.claim(run.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(run_id = run.id, "Run already claimed elsewhere, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(run_id = run.id, error = %e, "Failed to claim run");
                return;
            }
        }

        let output_path = self.runner.output_path(run.id);
        let status = match self.runner.execute(run, &output_path).await {
            Ok(result) if result.exit_code == 0 => {
                tracing::info!(run_id = run.id, "Patchflow completed");
                RunStatus::PrCreated
            }
            Ok(result) => {
                tracing::error!(
                    run_id = run.id,
                    exit_code = result.exit_code,
                    "Patchflow failed"
                );
                RunStatus::Failed
            }
            Err(e) => {
                tracing::error!(run_id = run.id, error = %e, "Patchflow invocation failed");
                RunStatus::Failed
            }
        };

        self.persist_logged(
            run.id,
            &UpdateRun {
                status: Some(status),
                ..Default::default()
            },
        )
        .await;

        // The outputs update is independent of the status outcome: even a
        // failed flow may have produced a partial artifact worth keeping.
        match self.runner.read_outputs(&output_path).await {
            Some(outputs) => {
                self.persist_logged(
                    run.id,
                    &UpdateRun {
                        outputs: Some(outputs),
                        ..Default::default()
                    },
                )
                .await;
            }
            None => tracing::info!(run_id = run.id, "No outputs found for run"),
        }
    }

    /// Persist a field subset; a failure is logged and affects nothing else.
    async fn persist_logged(&self, run_id: DbId, changes: &UpdateRun) {
        if let Err(e) = self.store.persist(run_id, changes).await {
            tracing::error!(run_id, error = %e, "Failed to persist run update");
        }
    }

    /// Run cycles until `cancel` fires, idling `poll_interval` between them.
    ///
    /// A failed cycle is logged and the next one starts after the usual idle
    /// interval. Cancellation mid-cycle drops the in-flight futures (child
    /// processes die with them); a run already marked `running` at that
    /// moment is not rolled back.
    pub async fn run_daemon(&self, cancel: CancellationToken) {
        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Dispatcher daemon started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Dispatcher daemon cancelled mid-cycle");
                    break;
                }
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Dispatch cycle failed");
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Dispatcher daemon stopped");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
