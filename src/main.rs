use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use logbroker::config::{self, BrokerConfig};
use logbroker::logging;
use logbroker::session::LogBroker;

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_directories()?;

    // Optional config file path as the first argument
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => BrokerConfig::load_from(&path)?,
        None => BrokerConfig::load()?,
    };

    let broker = Arc::new(LogBroker::new());
    let ready = broker.initialize(&config.session)?;

    // Install the bridge after the master logger exists
    logging::init_tracing(Arc::clone(&broker))?;

    if !ready {
        tracing::info!("Logging disabled, nothing to do");
        return Ok(());
    }
    if let Some(log_file) = broker.log_file() {
        tracing::info!("Logging to: {}", log_file.display());
    }

    let mut archiver = broker.archiver(config.archive.clone())?;
    if !archiver.should_archive() {
        tracing::info!(
            trigger = archiver.config().trigger_count,
            "Not enough log files to archive"
        );
        broker.shutdown();
        return Ok(());
    }

    let report = tokio::task::spawn_blocking(move || archiver.run_maintenance())
        .await
        .context("Archive maintenance task panicked")??;

    tracing::info!(
        sets = report.sets,
        archived = report.archived,
        cleaned = report.cleaned,
        "Archive maintenance finished"
    );

    broker.shutdown();
    Ok(())
}
