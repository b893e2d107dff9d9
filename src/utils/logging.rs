//! Logging setup and configuration

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_DIR: &str = "output/logs";

pub struct LoggingGuard {
    pub _guard: tracing_appender::non_blocking::WorkerGuard,
}

pub fn setup_logging() -> Result<Arc<LoggingGuard>> {
    let file_appender = tracing_appender::rolling::hourly(LOG_DIR, "grid-executor.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_ansi(true)
                .with_level(true)
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_level(true)
                .with_ansi(false)
                .compact()
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?
        )
        .init();

    Ok(Arc::new(LoggingGuard { _guard: guard }))
}

/// Creates the log directory and the parent of the store snapshot.
pub fn setup_output_directories(store_path: &str) -> Result<()> {
    use std::fs;

    fs::create_dir_all(LOG_DIR)?;
    if let Some(parent) = Path::new(store_path).parent() {
        fs::create_dir_all(parent)?;
    }

    Ok(())
}
