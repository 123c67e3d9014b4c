//! Dispatcher configuration loaded from environment variables.

use std::time::Duration;

use patchrun_core::types::DbId;

/// Runs fetched per poll cycle unless overridden. Also the cap on
/// concurrent patchwork child processes.
const DEFAULT_BATCH_LIMIT: i64 = 10;

/// Idle seconds between daemon cycles.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Wall-clock ceiling per patchwork invocation.
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 3600;

/// Dispatcher configuration.
///
/// Constructed once at startup and passed by reference into the store
/// gateway, runner, and dispatch loop. No ambient globals.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Organization whose runs this dispatcher owns.
    pub organization_id: DbId,
    /// Path to the patchwork executable.
    pub patchwork_exec: String,
    /// Directory receiving per-run output artifacts.
    pub output_dir: String,
    /// When set, every store write is replaced by a log line.
    pub read_only: bool,
    /// Restrict fetches to runs whose `meta` marks them private.
    pub private_runs_only: bool,
    /// Maximum runs fetched (and executed concurrently) per cycle.
    pub batch_limit: i64,
    /// Idle time between daemon cycles.
    pub poll_interval_secs: u64,
    /// Per-invocation wall-clock ceiling.
    pub run_timeout_secs: u64,
}

impl DispatcherConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env var              | Required | Default |
    /// |----------------------|----------|---------|
    /// | `ORGANIZATION_ID`    | yes      | --      |
    /// | `PATCHWORK_EXEC`     | yes      | --      |
    /// | `OUTPUT_DIR`         | yes      | --      |
    /// | `READ_ONLY`          | no       | `false` |
    /// | `PRIVATE_RUNS_ONLY`  | no       | `true`  |
    /// | `BATCH_LIMIT`        | no       | `10`    |
    /// | `POLL_INTERVAL_SECS` | no       | `30`    |
    /// | `RUN_TIMEOUT_SECS`   | no       | `3600`  |
    pub fn from_env() -> Self {
        let organization_id: DbId = std::env::var("ORGANIZATION_ID")
            .expect("ORGANIZATION_ID must be set")
            .parse()
            .expect("ORGANIZATION_ID must be a valid integer");

        let patchwork_exec =
            std::env::var("PATCHWORK_EXEC").expect("PATCHWORK_EXEC must be set");

        let output_dir = std::env::var("OUTPUT_DIR").expect("OUTPUT_DIR must be set");

        let read_only = std::env::var("READ_ONLY")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let private_runs_only = std::env::var("PRIVATE_RUNS_ONLY")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let batch_limit: i64 = std::env::var("BATCH_LIMIT")
            .unwrap_or_else(|_| DEFAULT_BATCH_LIMIT.to_string())
            .parse()
            .expect("BATCH_LIMIT must be a valid integer");

        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_SECS.to_string())
            .parse()
            .expect("POLL_INTERVAL_SECS must be a valid u64");

        let run_timeout_secs: u64 = std::env::var("RUN_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_RUN_TIMEOUT_SECS.to_string())
            .parse()
            .expect("RUN_TIMEOUT_SECS must be a valid u64");

        Self {
            organization_id,
            patchwork_exec,
            output_dir,
            read_only,
            private_runs_only,
            batch_limit,
            poll_interval_secs,
            run_timeout_secs,
        }
    }

    /// Idle time between daemon cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Per-invocation wall-clock ceiling.
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}
