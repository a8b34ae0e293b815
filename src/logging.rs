//! Structured JSONL logging plus human-readable stderr output.
//!
//! - **JSONL to file** (`<data_dir>/clipkeep/logs/clipkeep.jsonl`)
//! - **Compact to stderr** for whoever runs the daemon in a terminal
//!
//! # Usage
//!
//! ```rust,ignore
//! // Keep the guard alive for the whole process
//! let _guard = clipkeep::logging::init();
//! tracing::info!(event_type = "app_start", "Daemon started");
//! ```
//!
//! Clipboard contents are never written to the log; capture events carry the
//! entry id, type and length only.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::clipboard_history::ClipboardEntry;
use crate::error::StorageError;

const LOG_FILE_NAME: &str = "clipkeep.jsonl";

/// Guard that must be kept alive for the duration of the program.
/// Dropping it flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the dual-output logging system.
///
/// Filter defaults to `info` and can be overridden with `RUST_LOG`. If the log
/// file cannot be opened only the stderr layer is installed.
pub fn init() -> LoggingGuard {
    let log_path = log_path();
    if let Some(dir) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("[LOGGING] Failed to create log directory: {}", e);
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eprintln!("[LOGGING] Failed to open log file: {}", e))
        .ok();

    let (json_layer, file_guard) = match file {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_span_events(FmtSpan::NONE);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("[LOGGING] Subscriber already installed: {}", e);
    }

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %log_path.display(),
        "Logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

fn log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("clipkeep").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("clipkeep-logs"))
}

/// Path to the JSONL log file
pub fn log_path() -> PathBuf {
    log_dir().join(LOG_FILE_NAME)
}

// =============================================================================
// STRUCTURED LOGGING HELPERS
// =============================================================================

/// A new history entry was captured.
pub fn log_capture(entry: &ClipboardEntry) {
    tracing::info!(
        event_type = "clipboard_capture",
        entry_id = %entry.id,
        content_type = entry.content_type().as_str(),
        content_len = entry.content.len(),
        payload_len = entry.kind.payload().map_or(0, |p| p.len()),
        "Captured clipboard entry"
    );
}

/// How a paste request ended.
pub fn log_paste_outcome(entry_id: &str, outcome: &str, strategy: Option<&str>) {
    tracing::info!(
        event_type = "paste_outcome",
        entry_id = entry_id,
        outcome = outcome,
        strategy = strategy,
        "Paste {}", outcome
    );
}

/// History file failure; always recovered, so logged as a warning.
pub fn log_storage_error(operation: &str, error: &StorageError) {
    let path = match error {
        StorageError::Io { path, .. } | StorageError::Corrupt { path, .. } => {
            Some(path.display().to_string())
        }
        StorageError::Serialize(_) => None,
    };

    tracing::warn!(
        event_type = "storage_error",
        operation = operation,
        path = path.as_deref(),
        error = %error,
        "Clipboard history {} failed", operation
    );
}
