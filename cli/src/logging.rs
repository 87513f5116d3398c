//! Tracing setup
//!
//! With `--tracing` everything goes to stderr at TRACE. Otherwise logs go
//! to `<data dir>/logs/docsmith.log` so they stay out of the conversation.

use config::PathManager;
use std::fs::OpenOptions;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info,docsmith=debug,docsmith_core=debug,llm=info";

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the program or buffered file output is lost.
pub fn setup_tracing(enable: bool) -> Option<WorkerGuard> {
    if enable {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::TRACE)
            .with_writer(std::io::stderr)
            .finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Failed to set tracing subscriber: {}", e);
        }
        return None;
    }

    let path = PathManager::log_file_path()?;
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {:?}: {}", parent, e);
            return None;
        }
    }

    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", path, e);
            return None;
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true),
    );

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => {
            tracing::info!("Logging initialized, writing to {:?}", path);
            Some(guard)
        }
        Err(e) => {
            eprintln!("Failed to set tracing subscriber: {}", e);
            None
        }
    }
}
