// SPDX-License-Identifier: Apache-2.0

//! Logging setup and secret redaction.

pub mod sensitive;

pub use sensitive::Sensitive;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "dbreader.log";
const LOG_RETENTION_DAYS: u64 = 14;
const DEFAULT_FILTER: &str = "dbreader=info,dbreader_lib=info";

/// Installs the global JSON subscriber.
///
/// Logs go to a daily rolling file under the user's data directory, or to
/// stderr when that directory cannot be created. Keep the returned guard
/// alive for the life of the process so buffered lines are flushed.
pub fn init_tracing() -> WorkerGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let log_dir = log_directory();
    let (writer, guard) = match log_dir.as_deref().map(prepare_log_dir) {
        Some(Ok(dir)) => {
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
        }
        _ => tracing_appender::non_blocking(io::stderr()),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .json()
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    install_panic_hook();

    tracing::info!(log_dir = ?log_dir, "tracing initialized");
    guard
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown cause".to_string());

        tracing::error!(target: "panic", %location, %message, "panicked");
        previous(info);
    }));
}

/// `<data dir>/dbreader/logs`, if the platform has a data directory
fn log_directory() -> Option<PathBuf> {
    dirs::data_local_dir().map(|base| base.join("dbreader").join("logs"))
}

fn prepare_log_dir(dir: &Path) -> io::Result<&Path> {
    fs::create_dir_all(dir)?;
    if let Err(e) = cleanup_old_logs(dir, Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60)) {
        eprintln!("failed to clean up old logs in {}: {e}", dir.display());
    }
    Ok(dir)
}

/// Removes rolled log files whose last write is older than `retention`.
///
/// Returns how many files were deleted.
fn cleanup_old_logs(dir: &Path, retention: Duration) -> io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if age.is_some_and(|age| age > retention) && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }

    Ok(removed)
}
