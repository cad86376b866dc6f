/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Running terminal dashboard with graceful shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use finnhub_adapter::{ClientConfig, FinnhubClient};
use finnhub_dashboard::config::DashboardConfig;
use finnhub_dashboard::stream::PriceStreamCoordinator;
use finnhub_dashboard::tui::{run_tui, LogBuffer, LogWriterFactory, LOG_BUFFER_CAPACITY};

#[derive(Parser, Debug)]
#[command(name = "finnhub-dashboard", version, about = "Finnhub stock symbol search and live price dashboard")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "api-key", value_name = "KEY")]
    api_key: Option<String>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let log_buffer = Arc::new(StdMutex::new(LogBuffer::new(LOG_BUFFER_CAPACITY)));
    init_tracing(&args.log_level, log_buffer.clone())?;

    let config = load_config(args.config_path.as_ref())?
        .resolve(args.api_key)
        .context("resolve API token")?;
    info!(exchange = %config.exchange, "configuration loaded");

    let client = FinnhubClient::with_config_and_base_url(
        &config.api_token,
        ClientConfig::default(),
        &config.rest_base_url,
    )
    .context("create Finnhub client")?;

    let coordinator = PriceStreamCoordinator::spawn(
        client.clone(),
        config.ws_url_with_token(),
        config.tick_buffer_cap,
    );

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    run_tui(client, coordinator, &config, log_buffer, shutdown).await?;
    info!("dashboard exited");

    Ok(())
}

fn init_tracing(log_level: &str, log_buffer: Arc<StdMutex<LogBuffer>>) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    // Stdout belongs to the terminal UI; logs go to the in-memory buffer
    // shown on the Logs tab.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(LogWriterFactory::new(log_buffer))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<DashboardConfig> {
    let Some(path) = path else {
        return Ok(DashboardConfig::default());
    };
    let path_str = path.to_str().context("config path must be valid utf-8")?;
    DashboardConfig::from_file(path_str).context("load config")
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
