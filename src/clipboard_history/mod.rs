//! Clipboard History Module
//!
//! Ordered, deduplicated history of clipboard captures with pinning and a
//! retention window, persisted as a single JSON file.
//!
//! ## Module Structure
//! - `types`: Core types (ContentType, EntryKind, ClipboardEntry)
//! - `classifier`: Text/code/rich-text/image classification
//! - `storage`: Atomic JSON file persistence
//! - `store`: In-memory ordering, dedup, pin and retention rules
//! - `monitor`: Change-token polling and capture

mod classifier;
mod monitor;
pub(crate) mod storage;
mod store;
mod types;

pub use classifier::{classify, display_content, looks_like_code, EMPTY_PLACEHOLDER, IMAGE_PLACEHOLDER};
pub use monitor::{ClipboardWatcher, SkipReason, SuppressionFlag, TickOutcome};
pub use storage::{HistoryStorage, JsonFileStorage, HISTORY_FILE_NAME};
pub use store::{HistoryStore, InsertOutcome};
pub use types::{remove_expired, CapturedContent, ClipboardEntry, ContentType, EntryKind};
