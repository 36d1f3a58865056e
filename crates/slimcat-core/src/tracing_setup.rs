use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::CoreConfig;
use crate::constants::LOG_FILE_ENV;

/// Install the global subscriber: stderr always, plus an append-only log
/// file when configured (or when SLIMCAT_LOG_FILE is set).
pub fn init_tracing(config: &CoreConfig) -> Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter());

    let registry = tracing_subscriber::registry().with(stderr_layer);

    let log_path = std::env::var(LOG_FILE_ENV)
        .ok()
        .map(PathBuf::from)
        .or_else(|| config.log_file.clone());

    if let Some(log_path) = log_path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

        let file_layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(filter());

        registry
            .with(file_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
    } else {
        registry
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }
    Ok(())
}
