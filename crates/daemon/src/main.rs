//! fleetd - supervises every process of an ecosystem file

mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fleet_api_rpc::{RpcServer, RpcServerConfig};
use fleet_core::application::supervisor::constants::SHUTDOWN_WAIT;
use fleet_core::application::{shutdown_channel, validate_ecosystem, RestartPolicy, Supervisor};
use fleet_core::port::id_provider::UuidProvider;
use fleet_core::port::time_provider::SystemTimeProvider;
use fleet_infra_fs::load_ecosystem;
use fleet_infra_system::{SubprocessLauncher, SysinfoProbe};
use settings::{Settings, DEFAULT_CONFIG_FILE};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "fleetd", version, about = "Fleet process supervisor daemon")]
struct Args {
    /// Settings file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Ecosystem file (overrides settings)
    #[arg(long)]
    ecosystem: Option<String>,

    /// JSON-RPC port (overrides settings)
    #[arg(long)]
    rpc_port: Option<u16>,

    /// Log directory (overrides settings)
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let mut settings = Settings::load(&args.config)?;
    if let Some(ecosystem) = args.ecosystem {
        settings.ecosystem = ecosystem;
    }
    if let Some(port) = args.rpc_port {
        settings.rpc_port = port;
    }
    if let Some(log_dir) = args.log_dir {
        settings.log_dir = log_dir;
    }
    let log_dir = settings.log_dir_path();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    // 2. Initialize logging
    let _log_guard = init_logging(&settings.log_format, &log_dir)?;
    info!("fleetd v{} starting...", VERSION);

    // 3. Load and validate the ecosystem
    let ecosystem_path = settings.ecosystem_path();
    info!(path = %ecosystem_path.display(), "Loading ecosystem");
    let ecosystem = load_ecosystem(&ecosystem_path)
        .await
        .with_context(|| format!("Failed to load {}", ecosystem_path.display()))?;

    let report = validate_ecosystem(&ecosystem);
    for issue in report.warnings() {
        warn!("{}", issue);
    }
    if report.has_errors() {
        for issue in report.errors() {
            error!("{}", issue);
        }
        anyhow::bail!(
            "{} has {} validation error(s)",
            ecosystem_path.display(),
            report.errors().count()
        );
    }

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let launcher = Arc::new(SubprocessLauncher::new(
        time_provider.clone(),
        &log_dir,
        settings.env_allowlist.clone(),
    ));
    let probe = Arc::new(SysinfoProbe::new());
    let policy = Arc::new(RestartPolicy::new(
        settings.max_restart_delay_ms,
        settings.min_uptime_ms,
    ));

    let supervisor = Supervisor::new(
        ecosystem,
        launcher,
        policy,
        time_provider.clone(),
        Arc::new(UuidProvider),
    )?;

    // 5. Start JSON-RPC server
    let rpc_server = RpcServer::new(
        RpcServerConfig {
            host: settings.rpc_host.clone(),
            port: settings.rpc_port,
        },
        supervisor.handle(),
        probe,
        time_provider,
    );
    let rpc = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 6. Start supervisor
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let supervisor_task = tokio::spawn(async move {
        if let Err(e) = supervisor.run(shutdown_rx).await {
            error!(error = ?e, "Supervisor failed");
        }
    });

    info!(rpc = %rpc.addr, "System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    wait_for_signal().await?;
    info!("Shutdown signal received. Stopping processes...");

    // 8. Graceful shutdown
    shutdown_tx.shutdown();
    if let Err(e) = rpc.handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    if tokio::time::timeout(SHUTDOWN_WAIT, supervisor_task).await.is_err() {
        warn!(timeout = ?SHUTDOWN_WAIT, "Supervisor did not stop in time");
    }

    info!("Shutdown complete.");
    Ok(())
}

/// Console layer (pretty or JSON) plus a daily-rolling `fleetd.log`
///
/// The returned guard flushes the file writer on drop.
fn init_logging(
    log_format: &str,
    log_dir: &std::path::Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("fleet=info,fleetd=info"))
        .context("Failed to create env filter")?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "fleetd.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    match log_format {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .with(fmt::layer().with_writer(file_writer).with_ansi(false))
                .init();
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .with(fmt::layer().with_writer(file_writer).with_ansi(false))
                .init();
        }
    }
    Ok(guard)
}

async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
