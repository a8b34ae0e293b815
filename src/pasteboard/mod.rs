//! Shared clipboard access
//!
//! The clipboard exposes typed slots (plain text, rich markup, image) and a
//! change token that moves on every write by any process. `SystemPasteboard`
//! is the real OS clipboard; tests drive the watcher and orchestrator through
//! an in-memory implementation.

mod change_detection;
mod png;
#[cfg(test)]
pub(crate) mod memory;
mod system;

use crate::clipboard_history::{ClipboardEntry, EntryKind};
use crate::error::PasteboardError;

pub use change_detection::{fingerprint, pasteboard_change_count, FingerprintCounter};
pub use png::{decode_png, encode_png};
pub use system::SystemPasteboard;

/// Rich-text slot contents: markup plus its plain rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichText {
    pub markup: Vec<u8>,
    pub plain: String,
}

/// What gets written back to the clipboard for a history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteboardPayload {
    Text(String),
    /// Markup with a plain-text fallback in the same write
    RichText(RichText),
    /// PNG bytes
    Image(Vec<u8>),
}

impl PasteboardPayload {
    pub fn from_entry(entry: &ClipboardEntry) -> Self {
        match &entry.kind {
            EntryKind::Text | EntryKind::Code => Self::Text(entry.content.clone()),
            EntryKind::RichText(markup) => Self::RichText(RichText {
                markup: markup.clone(),
                plain: entry.content.clone(),
            }),
            EntryKind::Image(png) => Self::Image(png.clone()),
        }
    }
}

pub trait Pasteboard {
    /// Current change token, `None` when the clipboard cannot be queried.
    fn change_token(&mut self) -> Option<i64>;

    /// Image slot as PNG bytes
    fn read_image(&mut self) -> Option<Vec<u8>>;

    fn read_rich_text(&mut self) -> Option<RichText>;

    fn read_text(&mut self) -> Option<String>;

    /// Replace the clipboard contents. Moves the change token.
    fn write(&mut self, payload: &PasteboardPayload) -> Result<(), PasteboardError>;
}
