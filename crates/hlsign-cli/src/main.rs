//! hlsign - Hyperliquid action signer
//!
//! Signs one action per invocation and writes the exchange request body to
//! stdout. Logs go to stderr.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use hlsign_cli::{execute, CliConfig, Command, CommandOutput, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
use hlsign_signer::SigningEngine;
use hlsign_telemetry::{Metrics, PrometheusObserver};
use tracing::{debug, info};

/// Hyperliquid action signer
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via HLSIGN_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Exchange server time (ms) to align the nonce counter with before signing
    #[arg(long, global = true)]
    server_time_ms: Option<u64>,

    /// Dump Prometheus metrics to stderr after signing
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let args = Args::parse();

    hlsign_telemetry::init_logging()?;

    // CLI arg > HLSIGN_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    debug!(config_path = %config_path, "Loading configuration");
    let config = CliConfig::from_file(&config_path)?;

    let identity = config.load_identity()?;
    let book = config.instrument_book()?;
    info!(
        network = ?config.network,
        address = %identity.address(),
        instruments = book.len(),
        "Configuration loaded"
    );

    let engine = SigningEngine::new(book, config.network)
        .with_slippage(config.slippage)
        .with_observer(Arc::new(PrometheusObserver));
    if let Some(server_time_ms) = args.server_time_ms {
        engine.sync_nonces(identity.address(), server_time_ms)?;
    }
    let opts = config.request_options()?;

    match execute(&args.command, &engine, &identity, &opts)? {
        CommandOutput::Signed(requests) => {
            for request in &requests {
                println!("{}", request.to_json()?);
            }
        }
        CommandOutput::Address(address) => println!("{address}"),
    }

    if args.metrics {
        eprint!("{}", Metrics::gather_text()?);
    }

    Ok(())
}
