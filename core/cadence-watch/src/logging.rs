//! File-based logging for the watcher.
//!
//! Stdout belongs to the collector pipe, so diagnostics go to a daily
//! rolling file under `~/.cadence/logs/`. The returned guard keeps the
//! background writer alive; hold it for the life of the process.

use std::env;

use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_DIR_NAME: &str = "logs";
const LOG_FILE_PREFIX: &str = "cadence-watch.log";

pub fn init() -> Option<WorkerGuard> {
    let debug_enabled = env::var("CADENCE_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let home = dirs::home_dir()?;
    let log_dir = home.join(".cadence").join(LOG_DIR_NAME);
    if fs::create_dir_all(&log_dir).is_err() {
        return None;
    }

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Some(guard)
}
