/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Running order book and account feeds until interrupted
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lighter_stream::{FeedRunner, StreamConfig};

/// Stream Lighter order books and account updates to the log
#[derive(Parser, Debug)]
#[command(name = "lighter-stream", version)]
struct Args {
    /// YAML feed configuration
    #[arg(short, long, value_name = "PATH")]
    config: PathBuf,
    /// Override the configured stream endpoint
    #[arg(long, value_name = "URL")]
    ws_url: Option<String>,
    /// Extra market ids to stream, on top of the configured ones
    #[arg(short, long = "market", value_name = "ID")]
    markets: Vec<u8>,
    /// Tracing filter, e.g. `info` or `lighter_adapter=debug,info`
    #[arg(long, value_name = "FILTER", default_value = "info")]
    log_level: String,
    /// Validate the configuration and exit
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_new(&args.log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    let config = load_config(&args)?;
    info!(
        ws_url = %config.ws_url,
        markets = ?config.markets,
        accounts = config.accounts.len(),
        "configuration loaded"
    );
    if args.dry_run {
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    FeedRunner::new(config, shutdown).run().await.context("run feeds")?;
    info!("lighter-stream stopped");
    Ok(())
}

fn load_config(args: &Args) -> Result<StreamConfig> {
    let mut config = StreamConfig::from_file(&args.config)?;
    if let Some(url) = &args.ws_url {
        config.ws_url = url.clone();
    }
    for &market_id in &args.markets {
        if !config.markets.contains(&market_id) {
            config.markets.push(market_id);
        }
    }
    config.validate()?;
    Ok(config)
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!(signal = "SIGINT", "shutting down"),
            Err(err) => {
                warn!(error = %err, "SIGINT handler unavailable");
                return;
            }
        },
        _ = terminate => info!(signal = "SIGTERM", "shutting down"),
    }
    shutdown.cancel();
}
