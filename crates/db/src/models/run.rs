//! Patchflow run entity models and DTOs.

use patchrun_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::RunStatus;

/// A row from the `custom_patchflow_runs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Run {
    pub id: DbId,
    pub custom_patchflow_id: Option<DbId>,
    pub organization_id: DbId,
    /// Status literal; see [`RunStatus`].
    pub status: String,
    /// String-keyed map passed verbatim as `key=value` invocation arguments.
    pub inputs: serde_json::Value,
    /// Artifact produced by the invoked executable; `{}` until then.
    pub outputs: serde_json::Value,
    /// Opaque selection flags (`is_private` among them). Never mutated here.
    pub meta: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Run {
    /// Typed view of the stored status literal.
    pub fn run_status(&self) -> Option<RunStatus> {
        RunStatus::parse(&self.status)
    }
}

/// A pending run joined with its patchflow definition, as returned by
/// [`RunRepo::fetch_pending`](crate::repositories::RunRepo::fetch_pending).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PendingRun {
    pub id: DbId,
    pub organization_id: DbId,
    pub status: String,
    pub inputs: serde_json::Value,
    pub outputs: serde_json::Value,
    pub meta: serde_json::Value,
    /// `name` of the joined patchflow; `NULL` when the flow row is gone.
    pub patchflow_name: Option<String>,
    /// `graph` of the joined patchflow.
    pub patchflow_graph: Option<serde_json::Value>,
}

impl PendingRun {
    /// Name passed as the executable's first argument.
    ///
    /// The graph's own `name` key wins; the flow record's `name` is the
    /// fallback for graphs that do not carry one.
    pub fn invocation_name(&self) -> Option<&str> {
        self.patchflow_graph
            .as_ref()
            .and_then(|graph| graph.get("name"))
            .and_then(|name| name.as_str())
            .or(self.patchflow_name.as_deref())
    }
}

/// Partial-update DTO for a run.
///
/// Only `Some` fields reach the UPDATE statement; columns outside the subset
/// are never written.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateRun {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<serde_json::Value>,
}

impl UpdateRun {
    /// `true` when no field is set, i.e. an update would be a no-op.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.outputs.is_none()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
