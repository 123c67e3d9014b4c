//! Shared helpers for dispatcher integration tests.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use patchrun_dispatcher::config::DispatcherConfig;
use serde_json::json;
use sqlx::PgPool;

pub const ORG: i64 = 42;

/// Config pointing at a given executable and artifact directory, with short
/// intervals suited to tests.
pub fn test_config(exec: &Path, output_dir: &Path) -> DispatcherConfig {
    DispatcherConfig {
        organization_id: ORG,
        patchwork_exec: exec.to_string_lossy().into_owned(),
        output_dir: output_dir.to_string_lossy().into_owned(),
        read_only: false,
        private_runs_only: true,
        batch_limit: 10,
        poll_interval_secs: 1,
        run_timeout_secs: 10,
    }
}

/// Fake patchwork executable.
///
/// Behavior keys off the flow name (first argument): `ok_flow` writes an
/// artifact to the `--output` path and exits 0, `fail_flow` exits 1 without
/// an artifact, `slow_flow` hangs long enough to be cancelled.
pub fn write_fake_patchwork(dir: &Path) -> PathBuf {
    let path = dir.join("fake-patchwork");
    let mut f = std::fs::File::create(&path).expect("create fake executable");
    write!(
        f,
        r#"#!/bin/sh
flow="$1"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--output" ]; then out="$a"; fi
  prev="$a"
done
case "$flow" in
  ok_flow)
    printf '{{"result": "ok"}}' > "$out"
    exit 0
    ;;
  fail_flow)
    echo "patch failed" >&2
    exit 1
    ;;
  slow_flow)
    sleep 30
    exit 0
    ;;
esac
exit 0
"#
    )
    .expect("write fake executable");
    drop(f);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("make executable");
    path
}

pub async fn seed_flow(pool: &PgPool, name: &str) -> i64 {
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO custom_patchflows (name, graph) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(json!({"name": name}))
            .fetch_one(pool)
            .await
            .expect("seed flow");
    id
}

pub async fn seed_run(pool: &PgPool, flow_id: i64, inputs: serde_json::Value) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO custom_patchflow_runs \
             (custom_patchflow_id, organization_id, status, inputs, meta) \
         VALUES ($1, $2, 'pending', $3, $4) RETURNING id",
    )
    .bind(flow_id)
    .bind(ORG)
    .bind(inputs)
    .bind(json!({"is_private": "true"}))
    .fetch_one(pool)
    .await
    .expect("seed run");
    id
}

pub async fn run_status(pool: &PgPool, run_id: i64) -> String {
    let (status,): (String,) =
        sqlx::query_as("SELECT status FROM custom_patchflow_runs WHERE id = $1")
            .bind(run_id)
            .fetch_one(pool)
            .await
            .expect("run status");
    status
}

pub async fn run_outputs(pool: &PgPool, run_id: i64) -> serde_json::Value {
    let (outputs,): (serde_json::Value,) =
        sqlx::query_as("SELECT outputs FROM custom_patchflow_runs WHERE id = $1")
            .bind(run_id)
            .fetch_one(pool)
            .await
            .expect("run outputs");
    outputs
}
