//! Demo binary: run the pipeline and log fleet stats until interrupted.

use ballast_pipeline::{ConfigLoader, Pipeline};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run().await {
        error!(%error, "pipeline failed");
        std::process::exit(1);
    }
}

async fn run() -> ballast_core::Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = std::env::args().nth(1) {
        loader = loader.with_file(path);
    }
    let config = loader.load()?;

    let pipeline = Pipeline::start(config)?;

    let mut report = tokio::time::interval(Duration::from_secs(5));
    report.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            _ = report.tick() => {
                let stats = pipeline.stats();
                info!(
                    sent = stats.producer.sent,
                    dropped = stats.producer.dropped,
                    processed = stats.total_processed(),
                    backlog = stats.total_backlog(),
                    "pipeline report",
                );
            },
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    error!(%error, "failed to listen for shutdown signal");
                }
                break;
            },
        }
    }

    let stats = pipeline.stats();
    println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
    pipeline.shutdown().await
}
