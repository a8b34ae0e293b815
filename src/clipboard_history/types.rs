//! Clipboard history types
//!
//! `ContentType` is the plain tag persisted in the `type` field and used for
//! duplicate detection; `EntryKind` is the in-memory sum type that carries the
//! raw payload for binary kinds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content types for clipboard entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    Text,
    Code,
    RichText,
    Image,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Code => "code",
            ContentType::RichText => "richText",
            ContentType::Image => "image",
        }
    }
}

/// Entry kind with its associated payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Text,
    Code,
    /// Rich-text markup (RTF on macOS)
    RichText(Vec<u8>),
    /// PNG-encoded bitmap
    Image(Vec<u8>),
}

impl EntryKind {
    pub fn content_type(&self) -> ContentType {
        match self {
            EntryKind::Text => ContentType::Text,
            EntryKind::Code => ContentType::Code,
            EntryKind::RichText(_) => ContentType::RichText,
            EntryKind::Image(_) => ContentType::Image,
        }
    }

    /// Raw bytes for binary kinds
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            EntryKind::Text | EntryKind::Code => None,
            EntryKind::RichText(bytes) | EntryKind::Image(bytes) => Some(bytes),
        }
    }
}

/// Content captured from the clipboard, not yet part of the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedContent {
    pub content: String,
    pub kind: EntryKind,
}

impl CapturedContent {
    pub fn new(content: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            content: content.into(),
            kind,
        }
    }
}

/// A single clipboard history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub id: String,
    /// Plain-text rendering, also used as preview for binary kinds
    pub content: String,
    pub kind: EntryKind,
    pub timestamp: DateTime<Utc>,
    pub pinned: bool,
}

impl ClipboardEntry {
    /// Create an unpinned entry with a fresh id
    pub fn new(captured: CapturedContent, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: captured.content,
            kind: captured.kind,
            timestamp,
            pinned: false,
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.kind.content_type()
    }

    /// Same `(content, kind)` pair; payload bytes are not compared.
    pub fn same_content(&self, captured: &CapturedContent) -> bool {
        self.content == captured.content && self.content_type() == captured.kind.content_type()
    }

    pub fn same_entry_content(&self, other: &ClipboardEntry) -> bool {
        self.content == other.content && self.content_type() == other.content_type()
    }

    /// Pinned entries never expire.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        !self.pinned && self.timestamp < now - retention
    }

    /// Short relative age for list rows ("Just now", "5m ago", "3h ago", "2d ago")
    pub fn relative_time_label(&self, now: DateTime<Utc>) -> String {
        let elapsed = now.signed_duration_since(self.timestamp);
        let minutes = elapsed.num_minutes();
        let hours = elapsed.num_hours();

        if minutes < 1 {
            "Just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if hours < 24 {
            format!("{}h ago", hours)
        } else {
            format!("{}d ago", elapsed.num_days())
        }
    }
}

/// Drop expired entries in place, returning how many were removed.
pub fn remove_expired(
    entries: &mut Vec<ClipboardEntry>,
    now: DateTime<Utc>,
    retention: Duration,
) -> usize {
    let before = entries.len();
    entries.retain(|entry| !entry.is_expired(now, retention));
    before - entries.len()
}
