//! Patchwork process invocation.
//!
//! Builds the command line for one run, executes it through the shared
//! subprocess substrate, and reads back the output artifact. Captured
//! streams are stripped of ANSI escapes before logging, since patchwork
//! colors its output even under `--plain`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use patchrun_core::ansi::strip_ansi;
use patchrun_core::subprocess::{self, CommandOutput, SubprocessError};
use patchrun_core::types::DbId;
use patchrun_db::models::run::PendingRun;
use tokio::process::Command;

use crate::config::DispatcherConfig;

/// Captured result of one patchwork invocation.
#[derive(Debug)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Errors that prevent an exit code from being determined.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("run has no patchflow name to invoke")]
    MissingFlowName,

    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

/// Invokes the patchwork executable for individual runs.
pub struct PatchflowRunner {
    exec_path: String,
    output_dir: PathBuf,
    run_timeout: Duration,
}

impl PatchflowRunner {
    pub fn new(config: &DispatcherConfig) -> Self {
        Self {
            exec_path: config.patchwork_exec.clone(),
            output_dir: PathBuf::from(&config.output_dir),
            run_timeout: config.run_timeout(),
        }
    }

    /// Artifact path for one invocation.
    ///
    /// Timestamped and suffixed with the run id, so concurrent runs in one
    /// cycle never collide and every invocation leaves its own audit trail.
    pub fn output_path(&self, run_id: DbId) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S");
        self.output_dir.join(format!("{stamp}_run_{run_id}.json"))
    }

    /// Run patchwork for `run`, capturing both streams in full.
    ///
    /// The exit code is a first-class outcome; nonzero is not an error
    /// here. `Err` means no exit code could be determined at all (missing
    /// executable, I/O failure, timeout).
    pub async fn execute(
        &self,
        run: &PendingRun,
        output_path: &Path,
    ) -> Result<ProcessResult, RunnerError> {
        let args = build_args(run, output_path)?;
        tracing::info!(
            run_id = run.id,
            command = %format!("{} {}", self.exec_path, args.join(" ")),
            "Invoking patchwork"
        );

        let mut cmd = Command::new(&self.exec_path);
        cmd.args(&args);
        let output = subprocess::run_command(&mut cmd, self.run_timeout).await?;
        log_streams(run.id, &output);

        Ok(ProcessResult {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Read the artifact produced at `path`, if any.
    ///
    /// Absent or unparseable artifacts are expected for flows that publish
    /// nothing; the caller logs that case and moves on.
    pub async fn read_outputs(&self, path: &Path) -> Option<serde_json::Value> {
        let raw = tokio::fs::read(path).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }
}

/// Build the argument vector for one run.
///
/// The flow name leads, followed by the fixed operational flags, followed by
/// one `key=value` argument per entry in the run's inputs.
fn build_args(run: &PendingRun, output_path: &Path) -> Result<Vec<String>, RunnerError> {
    let flow_name = run.invocation_name().ok_or(RunnerError::MissingFlowName)?;

    let mut args = vec![
        flow_name.to_string(),
        "--log".to_string(),
        "debug".to_string(),
        "--output".to_string(),
        output_path.display().to_string(),
        "--disable_telemetry".to_string(),
        "--plain".to_string(),
    ];

    if let Some(inputs) = run.inputs.as_object() {
        for (key, value) in inputs {
            args.push(format!("{key}={}", render_input(value)));
        }
    }

    Ok(args)
}

/// Render one input value for the command line.
///
/// JSON strings are passed raw so the executable does not see quotes;
/// everything else uses compact JSON rendering.
fn render_input(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Log both captured streams, stripped of ANSI escapes.
fn log_streams(run_id: DbId, output: &CommandOutput) {
    tracing::info!(
        run_id,
        duration_ms = output.duration_ms,
        stdout = %strip_ansi(&output.stdout),
        "patchwork stdout"
    );
    if !output.stderr.is_empty() {
        tracing::error!(run_id, stderr = %strip_ansi(&output.stderr), "patchwork stderr");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
