//! In-memory clipboard for headless tests
//!
//! Clones share state, so a test keeps one handle to simulate copies from other
//! applications while the code under test owns another.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Pasteboard, PasteboardPayload, RichText};
use crate::error::PasteboardError;

#[derive(Debug, Default)]
struct MemoryState {
    change_count: i64,
    text: Option<String>,
    rich_text: Option<RichText>,
    image: Option<Vec<u8>>,
    writes: Vec<PasteboardPayload>,
    unavailable: bool,
    fail_writes: bool,
}

impl MemoryState {
    fn replace(&mut self, text: Option<String>, rich_text: Option<RichText>, image: Option<Vec<u8>>) {
        self.text = text;
        self.rich_text = rich_text;
        self.image = image;
        self.change_count += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPasteboard {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPasteboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Another application copied plain text.
    pub fn copy_text(&self, text: &str) {
        self.state.lock().replace(Some(text.to_string()), None, None);
    }

    /// Another application copied styled text.
    pub fn copy_rich_text(&self, markup: &[u8], plain: &str) {
        let rich = RichText {
            markup: markup.to_vec(),
            plain: plain.to_string(),
        };
        self.state
            .lock()
            .replace(Some(plain.to_string()), Some(rich), None);
    }

    /// Another application copied an image.
    pub fn copy_image(&self, png: &[u8]) {
        self.state.lock().replace(None, None, Some(png.to_vec()));
    }

    /// Bump the token without touching any slot (e.g. an empty copy).
    pub fn touch(&self) {
        let mut state = self.state.lock();
        state.change_count += 1;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn writes(&self) -> Vec<PasteboardPayload> {
        self.state.lock().writes.clone()
    }

    pub fn token(&self) -> i64 {
        self.state.lock().change_count
    }
}

impl Pasteboard for MemoryPasteboard {
    fn change_token(&mut self) -> Option<i64> {
        let state = self.state.lock();
        (!state.unavailable).then_some(state.change_count)
    }

    fn read_image(&mut self) -> Option<Vec<u8>> {
        self.state.lock().image.clone()
    }

    fn read_rich_text(&mut self) -> Option<RichText> {
        self.state.lock().rich_text.clone()
    }

    fn read_text(&mut self) -> Option<String> {
        self.state.lock().text.clone()
    }

    fn write(&mut self, payload: &PasteboardPayload) -> Result<(), PasteboardError> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(PasteboardError::Write("simulated failure".into()));
        }

        match payload {
            PasteboardPayload::Text(text) => state.replace(Some(text.clone()), None, None),
            PasteboardPayload::RichText(rich) => {
                state.replace(Some(rich.plain.clone()), Some(rich.clone()), None)
            }
            PasteboardPayload::Image(png) => state.replace(None, None, Some(png.clone())),
        }
        state.writes.push(payload.clone());
        Ok(())
    }
}
