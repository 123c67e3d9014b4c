//! Store gateway for run fetch and persistence.

use patchrun_core::types::DbId;
use patchrun_db::models::run::{PendingRun, UpdateRun};
use patchrun_db::models::status::RunStatus;
use patchrun_db::repositories::RunRepo;
use sqlx::PgPool;

use crate::config::DispatcherConfig;

/// Read/write surface against the run store.
///
/// Holds the selection filters and the read-only flag so callers never pass
/// ambient state. In read-only mode every write is replaced by a single log
/// line carrying the intended field values; fetches are unaffected.
pub struct RunStore {
    pool: PgPool,
    organization_id: DbId,
    private_runs_only: bool,
    batch_limit: i64,
    read_only: bool,
}

impl RunStore {
    pub fn new(pool: PgPool, config: &DispatcherConfig) -> Self {
        Self {
            pool,
            organization_id: config.organization_id,
            private_runs_only: config.private_runs_only,
            batch_limit: config.batch_limit,
            read_only: config.read_only,
        }
    }

    /// Fetch the next batch of pending runs with their flow definitions.
    pub async fn fetch_pending(&self) -> Result<Vec<PendingRun>, sqlx::Error> {
        RunRepo::fetch_pending(
            &self.pool,
            self.organization_id,
            self.private_runs_only,
            self.batch_limit,
        )
        .await
    }

    /// Claim `run_id` for this dispatch attempt.
    ///
    /// Returns `false` when another dispatcher already took the run. In
    /// read-only mode no write happens and the claim is reported as won, so
    /// a dry cycle still exercises the whole execution path.
    pub async fn claim(&self, run_id: DbId) -> Result<bool, sqlx::Error> {
        if self.read_only {
            tracing::info!(run_id, "Would claim run (read-only)");
            return Ok(true);
        }
        RunRepo::claim(&self.pool, run_id).await
    }

    /// Persist a partial update for `run_id`.
    ///
    /// A status change is checked against the run lifecycle first; an update
    /// the state machine forbids is logged and dropped rather than applied.
    pub async fn persist(&self, run_id: DbId, changes: &UpdateRun) -> Result<(), sqlx::Error> {
        if self.read_only {
            tracing::info!(
                run_id,
                changes = %serde_json::to_string(changes).unwrap_or_default(),
                "Would update run (read-only)"
            );
            return Ok(());
        }

        if let Some(next) = changes.status {
            if !self.transition_allowed(run_id, next).await? {
                return Ok(());
            }
        }

        RunRepo::update(&self.pool, run_id, changes).await
    }

    /// Check the stored status against the lifecycle before moving it.
    async fn transition_allowed(&self, run_id: DbId, next: RunStatus) -> Result<bool, sqlx::Error> {
        let Some(run) = RunRepo::find_by_id(&self.pool, run_id).await? else {
            tracing::warn!(run_id, "Run vanished from the store, dropping update");
            return Ok(false);
        };
        match run.run_status() {
            Some(current) if current.can_transition_to(next) => Ok(true),
            Some(current) => {
                tracing::warn!(
                    run_id,
                    current = %current,
                    next = %next,
                    "Refusing forbidden status transition"
                );
                Ok(false)
            }
            None => {
                tracing::warn!(
                    run_id,
                    status = %run.status,
                    "Run carries an unknown status literal, dropping update"
                );
                Ok(false)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    fn test_config(read_only: bool) -> DispatcherConfig {
        DispatcherConfig {
            organization_id: 42,
            patchwork_exec: "/usr/local/bin/patchwork".into(),
            output_dir: "/tmp/patchrun".into(),
            read_only,
            private_runs_only: true,
            batch_limit: 10,
            poll_interval_secs: 30,
            run_timeout_secs: 3600,
        }
    }

    /// A lazy pool never opens a connection until a query runs, so pointing
    /// it at a dead address proves read-only mode performs zero writes.
    fn dead_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://127.0.0.1:1/nowhere")
            .expect("lazy pool")
    }

    #[tokio::test]
    async fn read_only_claim_touches_nothing() {
        let store = RunStore::new(dead_pool(), &test_config(true));
        assert!(store.claim(1).await.expect("claim must not hit the store"));
    }

    #[tokio::test]
    async fn read_only_persist_touches_nothing() {
        let store = RunStore::new(dead_pool(), &test_config(true));
        store
            .persist(
                1,
                &UpdateRun {
                    status: Some(RunStatus::Failed),
                    outputs: Some(json!({"result": "ok"})),
                },
            )
            .await
            .expect("persist must not hit the store");
    }
}
