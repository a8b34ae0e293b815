//! Clipboard watcher
//!
//! Polled by the runtime at a fixed interval. Each tick compares the
//! pasteboard change token with the last one seen; on a change it captures the
//! richest available slot (image, then rich text, then plain text), classifies
//! it and offers it to the history store. Writes made by the paste flow are
//! flagged beforehand through a `SuppressionFlag` and are not captured.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::classifier::{classify, display_content};
use super::store::{HistoryStore, InsertOutcome};
use super::types::{CapturedContent, ContentType, EntryKind};
use crate::pasteboard::Pasteboard;

/// "The next clipboard change is ours." Shared between the watcher and the
/// paste orchestrator; set before the write, consumed by the next changed tick.
#[derive(Debug, Clone, Default)]
pub struct SuppressionFlag(Arc<AtomicBool>);

impl SuppressionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_next_write_internal(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    Oversized { len: usize, max: usize },
}

/// What a single poll did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// First token recorded; existing clipboard content is not captured
    Baseline,
    Unchanged,
    /// Change token could not be read this tick
    Unavailable,
    SuppressedInternalWrite,
    Captured(String),
    Duplicate,
    Skipped(SkipReason),
}

pub struct ClipboardWatcher {
    last_token: Option<i64>,
    suppression: SuppressionFlag,
    max_text_len: usize,
}

impl ClipboardWatcher {
    pub fn new(suppression: SuppressionFlag, max_text_len: usize) -> Self {
        Self {
            last_token: None,
            suppression,
            max_text_len,
        }
    }

    pub fn suppression(&self) -> &SuppressionFlag {
        &self.suppression
    }

    pub fn last_token(&self) -> Option<i64> {
        self.last_token
    }

    pub fn tick(&mut self, pasteboard: &mut dyn Pasteboard, store: &mut HistoryStore) -> TickOutcome {
        let Some(token) = pasteboard.change_token() else {
            debug!("Clipboard change token unavailable");
            return TickOutcome::Unavailable;
        };

        let Some(last) = self.last_token else {
            debug!(token, "Clipboard watcher baseline");
            self.last_token = Some(token);
            return TickOutcome::Baseline;
        };

        if last == token {
            return TickOutcome::Unchanged;
        }
        self.last_token = Some(token);

        if self.suppression.take() {
            debug!(token, "Ignoring clipboard change from our own write");
            return TickOutcome::SuppressedInternalWrite;
        }

        let candidate = match self.capture(pasteboard) {
            Ok(candidate) => candidate,
            Err(reason) => {
                if let SkipReason::Oversized { len, max } = reason {
                    warn!(text_len = len, max_len = max, "Skipping oversized clipboard text");
                } else {
                    debug!("Clipboard changed but holds nothing capturable");
                }
                return TickOutcome::Skipped(reason);
            }
        };

        match store.insert(candidate) {
            InsertOutcome::Inserted(id) => TickOutcome::Captured(id),
            InsertOutcome::Duplicate => TickOutcome::Duplicate,
        }
    }

    fn capture(&self, pasteboard: &mut dyn Pasteboard) -> Result<CapturedContent, SkipReason> {
        let image = pasteboard.read_image();
        let rich = if image.is_none() {
            pasteboard.read_rich_text()
        } else {
            None
        };
        let text = match &rich {
            Some(rich) if !rich.plain.is_empty() => Some(rich.plain.clone()),
            _ => pasteboard.read_text(),
        };

        let content_type = classify(image.is_some(), rich.is_some(), text.as_deref());

        if let (ContentType::Image, Some(png)) = (content_type, image) {
            return Ok(CapturedContent::new(
                display_content(content_type, None),
                EntryKind::Image(png),
            ));
        }

        let text = match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(SkipReason::Empty),
        };
        if text.len() > self.max_text_len {
            return Err(SkipReason::Oversized {
                len: text.len(),
                max: self.max_text_len,
            });
        }

        let kind = match (content_type, rich) {
            (ContentType::RichText, Some(rich)) => EntryKind::RichText(rich.markup),
            (ContentType::Code, _) => EntryKind::Code,
            _ => EntryKind::Text,
        };
        Ok(CapturedContent::new(text, kind))
    }
}
