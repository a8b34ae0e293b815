use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, warn};

use crate::paste::Privilege;

/// Error severity for notice display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,     // informational, nothing lost
    Warning,  // recovered locally
    Error,    // operation failed
    Critical, // daemon cannot start
}

/// Failures of the history file.
///
/// Always recovered locally: the in-memory history stays authoritative and
/// the next successful save rewrites the file.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize clipboard history: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Corrupt history file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures reading or writing the shared clipboard.
#[derive(Error, Debug)]
pub enum PasteboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("Clipboard write failed: {0}")]
    Write(String),

    #[error("Image payload could not be decoded: {0}")]
    ImageDecode(String),
}

/// Outcome of a single injection strategy that did not deliver the paste.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectionError {
    /// Not an exception: the chain treats this as a fallthrough signal.
    #[error("{} permission not granted", .0.display_name())]
    PrivilegeDenied(Privilege),

    #[error("Paste injection is not supported on this platform")]
    Unsupported,

    #[error("Paste injection failed: {0}")]
    Failed(String),
}

/// Crate-level error for the daemon boundary
#[derive(Error, Debug)]
pub enum ClipkeepError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Pasteboard(#[from] PasteboardError),

    #[error(transparent)]
    Injection(#[from] InjectionError),
}

impl ClipkeepError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Storage(_) => ErrorSeverity::Warning,
            Self::Pasteboard(PasteboardError::Unavailable(_)) => ErrorSeverity::Critical,
            Self::Pasteboard(_) => ErrorSeverity::Error,
            Self::Injection(InjectionError::PrivilegeDenied(_)) => ErrorSeverity::Info,
            Self::Injection(_) => ErrorSeverity::Warning,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Clipboard history could not be saved; it is kept in memory".to_string(),
            Self::Pasteboard(e) => format!("Clipboard access failed: {}", e),
            Self::Injection(InjectionError::PrivilegeDenied(p)) => p.remediation_message(),
            Self::Injection(_) => {
                "Copied to clipboard. Press \u{2318}V to paste manually.".to_string()
            }
        }
    }
}

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use clipkeep::error::ResultExt;
///
/// // Keep running with the in-memory list if the save fails
/// storage.save(&entries).log_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
