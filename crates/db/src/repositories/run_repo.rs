//! Repository for the `custom_patchflow_runs` table.
//!
//! Uses `RunStatus` from `models::status` for all status literals; no magic
//! strings in queries. Status writes go through the conditional [`claim`]
//! or the partial [`update`]; nothing here ever rewrites a whole row.
//!
//! [`claim`]: RunRepo::claim
//! [`update`]: RunRepo::update

use patchrun_core::types::DbId;
use sqlx::PgPool;

use crate::models::run::{PendingRun, Run, UpdateRun};
use crate::models::status::RunStatus;

/// Column list for run queries.
const COLUMNS: &str = "\
    id, custom_patchflow_id, organization_id, status, \
    inputs, outputs, meta, created_at, updated_at";

/// Provides read and partial-write operations for patchflow runs.
pub struct RunRepo;

impl RunRepo {
    /// Fetch up to `limit` pending runs for one organization, joined with
    /// their patchflow definition.
    ///
    /// `private_flag` must match the run's `meta->>'is_private'` selection
    /// flag. Results are ordered by id so a batch is reproducible.
    pub async fn fetch_pending(
        pool: &PgPool,
        organization_id: DbId,
        private_flag: bool,
        limit: i64,
    ) -> Result<Vec<PendingRun>, sqlx::Error> {
        sqlx::query_as::<_, PendingRun>(
            "SELECT r.id, r.organization_id, r.status, r.inputs, r.outputs, r.meta, \
                    p.name AS patchflow_name, p.graph AS patchflow_graph \
             FROM custom_patchflow_runs r \
             LEFT JOIN custom_patchflows p ON r.custom_patchflow_id = p.id \
             WHERE r.status = $1 \
               AND r.organization_id = $2 \
               AND r.meta->>'is_private' = $3 \
             ORDER BY r.id \
             LIMIT $4",
        )
        .bind(RunStatus::Pending.as_str())
        .bind(organization_id)
        .bind(if private_flag { "true" } else { "false" })
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Atomically claim a pending run for this dispatch attempt.
    ///
    /// Conditional update: `pending -> running` succeeds only if no other
    /// dispatcher got there first. Returns `false` when the claim was lost,
    /// in which case the run must be skipped.
    pub async fn claim(pool: &PgPool, run_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE custom_patchflow_runs \
             SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3",
        )
        .bind(run_id)
        .bind(RunStatus::Running.as_str())
        .bind(RunStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply a partial update.
    ///
    /// Only the DTO's `Some` fields are written; columns outside the subset
    /// are never touched. An empty changeset is a no-op.
    pub async fn update(
        pool: &PgPool,
        run_id: DbId,
        changes: &UpdateRun,
    ) -> Result<(), sqlx::Error> {
        if changes.is_empty() {
            tracing::debug!(run_id, "Empty changeset, skipping update");
            return Ok(());
        }

        let mut sets = Vec::new();
        let mut next_param = 2;
        if changes.status.is_some() {
            sets.push(format!("status = ${next_param}"));
            next_param += 1;
        }
        if changes.outputs.is_some() {
            sets.push(format!("outputs = ${next_param}"));
        }
        sets.push("updated_at = NOW()".to_string());

        let query = format!(
            "UPDATE custom_patchflow_runs SET {} WHERE id = $1",
            sets.join(", ")
        );

        let mut q = sqlx::query(&query).bind(run_id);
        if let Some(status) = changes.status {
            q = q.bind(status.as_str());
        }
        if let Some(outputs) = &changes.outputs {
            q = q.bind(outputs);
        }
        q.execute(pool).await?;
        Ok(())
    }

    /// Look up a single run by id.
    pub async fn find_by_id(pool: &PgPool, run_id: DbId) -> Result<Option<Run>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM custom_patchflow_runs WHERE id = $1");
        sqlx::query_as::<_, Run>(&query)
            .bind(run_id)
            .fetch_optional(pool)
            .await
    }
}
