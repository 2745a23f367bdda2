// Pick/ban overlay entry point.
//
// Startup sequence:
// 1. Parse CLI flags and load config
// 2. Initialize tracing (log to file, optionally mirrored to stderr)
// 3. Create mpsc channels and the shutdown signal
// 4. Spawn the client connection, overlay server and app logic tasks
// 5. Wait for Ctrl+C, then shut down

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use pickban_core::config::{self, Config, LoggingConfig};
use pickban_core::{app, lcu, ws_server};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Default filter used with `--debug` when `RUST_LOG` is unset.
const DEBUG_FILTER: &str = "pickban_core=debug,pickban=debug,info";

#[derive(Parser)]
#[command(name = "pickban")]
#[command(about = "Champ select pick/ban tracker for stream overlays", long_about = None)]
struct Args {
    /// Mirror logs to stderr and raise the default log level
    #[arg(long)]
    debug: bool,

    /// Game client install directory (overrides client.install_dir)
    #[arg(long)]
    install_dir: Option<String>,

    /// Overlay WebSocket port (overrides overlay.port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 1. Load config, then apply CLI overrides
    let mut config = config::load_config().context("failed to load configuration")?;
    apply_overrides(&mut config, &args);
    config::validate(&config).context("invalid configuration after CLI overrides")?;

    // 2. Initialize tracing
    init_tracing(&config.logging, args.debug)?;
    info!("Pickban starting up");
    info!(
        "Client install dir: {}, overlay port: {}",
        config.client.install_dir, config.overlay.port
    );

    // 3. Channels and shutdown signal
    let (lcu_tx, lcu_rx) = mpsc::channel(256);
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 4. Spawn tasks
    let client_config = config.client.clone();
    let lcu_handle = tokio::spawn(async move {
        if let Err(e) = lcu::client::run(client_config, lcu_tx).await {
            error!("Client connection error: {}", e);
        }
    });

    let overlay_port = config.overlay.port;
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(overlay_port, ui_rx).await {
            error!("Overlay server error on port {}: {}", overlay_port, e);
        }
    });

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(lcu_rx, ui_tx, app::AppState::new(), shutdown_rx).await {
            error!("Application loop error: {}", e);
        }
    });

    info!("Application ready. Overlay server on 127.0.0.1:{}", overlay_port);

    // 5. Wait for Ctrl+C
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Ctrl+C received, shutting down");
    let _ = shutdown_tx.send(true);

    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
        // The app loop owns the UI sender; once it is gone the overlay
        // server drains and returns.
        let _ = ws_handle.await;
    })
    .await;

    // The client task loops on reconnects until its receiver is dropped
    // and may be parked in a sleep.
    lcu_handle.abort();

    info!("Pickban shut down cleanly");
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(dir) = &args.install_dir {
        config.client.install_dir = dir.clone();
    }
    if let Some(port) = args.port {
        config.overlay.port = port;
    }
}

/// Initialize tracing to log to a file under `logging.dir`. With `debug`,
/// logs are also written to stderr.
fn init_tracing(logging: &LoggingConfig, debug: bool) -> anyhow::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let log_dir = std::env::current_dir()?.join(&logging.dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("pickban.log"))?;

    let default_filter = if debug { DEBUG_FILTER } else { logging.filter.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let stderr_layer = debug.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to set tracing subscriber")?;

    Ok(())
}
