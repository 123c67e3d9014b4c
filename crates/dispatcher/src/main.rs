//! `patchrun-dispatcher` -- polling dispatcher for patchflow runs.
//!
//! Scans the run store for `pending` rows, invokes the patchwork executable
//! once per run, and records the outcome. Runs a single poll cycle by
//! default (suited to an external scheduler); pass `daemon` as the first
//! argument to poll continuously until SIGINT/SIGTERM.
//!
//! Individual run failures are recorded in the store, not reflected in this
//! process's exit status: both modes exit 0 unless startup itself fails.
//!
//! # Environment variables
//!
//! | Variable             | Required | Default | Description                             |
//! |----------------------|----------|---------|-----------------------------------------|
//! | `DATABASE_URL`       | yes      | --      | Postgres connection string              |
//! | `ORGANIZATION_ID`    | yes      | --      | Organization whose runs are dispatched  |
//! | `PATCHWORK_EXEC`     | yes      | --      | Path to the patchwork executable        |
//! | `OUTPUT_DIR`         | yes      | --      | Directory for per-run output artifacts  |
//! | `READ_ONLY`          | no       | `false` | Log intended writes instead of applying |
//! | `PRIVATE_RUNS_ONLY`  | no       | `true`  | Restrict to runs marked `is_private`    |
//! | `BATCH_LIMIT`        | no       | `10`    | Max runs fetched per cycle              |
//! | `POLL_INTERVAL_SECS` | no       | `30`    | Idle time between daemon cycles         |
//! | `RUN_TIMEOUT_SECS`   | no       | `3600`  | Wall-clock ceiling per invocation       |

use patchrun_dispatcher::config::DispatcherConfig;
use patchrun_dispatcher::dispatch::Dispatcher;
use patchrun_dispatcher::runner::PatchflowRunner;
use patchrun_dispatcher::store::RunStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patchrun_dispatcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DispatcherConfig::from_env();
    tracing::info!(
        organization_id = config.organization_id,
        read_only = config.read_only,
        batch_limit = config.batch_limit,
        "Loaded dispatcher configuration"
    );

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = patchrun_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    patchrun_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection pool created");

    let store = RunStore::new(pool, &config);
    let runner = PatchflowRunner::new(&config);
    let dispatcher = Dispatcher::new(store, runner, &config);

    let daemon = std::env::args().nth(1).is_some_and(|arg| arg == "daemon");
    if daemon {
        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            signal_cancel.cancel();
        });

        dispatcher.run_daemon(cancel).await;
        tracing::info!("Dispatcher stopped");
    } else if let Err(e) = dispatcher.run_cycle().await {
        tracing::error!(error = %e, "Dispatch cycle failed");
    }
}

/// Wait for a termination signal to initiate a clean stop.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the daemon stops
/// cleanly whether interrupted interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
