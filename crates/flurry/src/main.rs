//! Flurry CLI: load the hourly pageview dumps named by a manifest.

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flurry::{CliArgs, Config, cancel_on_signal, init_metrics, init_tracing, run};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match Config::load(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(address) = &config.metrics.address
        && let Err(e) = init_metrics(address)
    {
        eprintln!("Failed to start metrics server: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        manifest = ?config.manifest,
        dry_run = config.dry_run,
        batch_size = config.source.batch_size,
        "Starting flurry"
    );

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    match run(&config, shutdown).await {
        Ok(summary) => {
            println!("{summary}");
            if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Run failed: {e}");
            ExitCode::FAILURE
        }
    }
}
