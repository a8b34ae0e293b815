//! OS clipboard backed by arboard
//!
//! Text and image slots go through arboard on every platform. On macOS the
//! change token and the RTF slot use NSPasteboard directly.

use arboard::Clipboard;
use tracing::{debug, warn};

#[cfg(not(target_os = "macos"))]
use super::change_detection::{fingerprint, FingerprintCounter};
use super::png::{decode_png, encode_png};
use super::{Pasteboard, PasteboardPayload, RichText};
use crate::error::{PasteboardError, ResultExt};

pub struct SystemPasteboard {
    clipboard: Clipboard,
    #[cfg(not(target_os = "macos"))]
    counter: FingerprintCounter,
}

impl SystemPasteboard {
    pub fn new() -> Result<Self, PasteboardError> {
        let clipboard = Clipboard::new().map_err(|e| PasteboardError::Unavailable(e.to_string()))?;
        Ok(Self {
            clipboard,
            #[cfg(not(target_os = "macos"))]
            counter: FingerprintCounter::new(),
        })
    }

    #[cfg(not(target_os = "macos"))]
    fn current_fingerprint(&mut self) -> u64 {
        let text = self.clipboard.get_text().ok();
        let image = self.clipboard.get_image().ok();
        fingerprint(text.as_deref(), image.as_ref().map(|i| i.bytes.as_ref()))
    }

    fn write_slots(&mut self, payload: &PasteboardPayload) -> Result<(), PasteboardError> {
        match payload {
            PasteboardPayload::Text(text) => self
                .clipboard
                .set_text(text.clone())
                .map_err(|e| PasteboardError::Write(e.to_string())),
            PasteboardPayload::Image(png) => {
                let image = decode_png(png)?;
                self.clipboard
                    .set_image(image)
                    .map_err(|e| PasteboardError::Write(e.to_string()))
            }
            PasteboardPayload::RichText(rich) => self.write_rich_text(rich),
        }
    }

    #[cfg(target_os = "macos")]
    fn write_rich_text(&mut self, rich: &RichText) -> Result<(), PasteboardError> {
        macos::write_rtf(&rich.markup, &rich.plain)
    }

    #[cfg(not(target_os = "macos"))]
    fn write_rich_text(&mut self, rich: &RichText) -> Result<(), PasteboardError> {
        // No portable RTF slot; the plain rendering is what gets pasted
        self.clipboard
            .set_text(rich.plain.clone())
            .map_err(|e| PasteboardError::Write(e.to_string()))
    }
}

impl Pasteboard for SystemPasteboard {
    #[cfg(target_os = "macos")]
    fn change_token(&mut self) -> Option<i64> {
        super::change_detection::pasteboard_change_count()
    }

    #[cfg(not(target_os = "macos"))]
    fn change_token(&mut self) -> Option<i64> {
        let fp = self.current_fingerprint();
        Some(self.counter.observe(fp))
    }

    fn read_image(&mut self) -> Option<Vec<u8>> {
        let image = self.clipboard.get_image().ok()?;
        debug!(
            width = image.width,
            height = image.height,
            "Image found in clipboard"
        );
        encode_png(&image).warn_on_err()
    }

    #[cfg(target_os = "macos")]
    fn read_rich_text(&mut self) -> Option<RichText> {
        let markup = macos::read_rtf()?;
        let plain = self.read_text().unwrap_or_default();
        Some(RichText { markup, plain })
    }

    #[cfg(not(target_os = "macos"))]
    fn read_rich_text(&mut self) -> Option<RichText> {
        None
    }

    fn read_text(&mut self) -> Option<String> {
        self.clipboard.get_text().ok()
    }

    fn write(&mut self, payload: &PasteboardPayload) -> Result<(), PasteboardError> {
        if let Err(e) = self.write_slots(payload) {
            warn!(error = %e, "Clipboard write failed");
            return Err(e);
        }

        #[cfg(not(target_os = "macos"))]
        {
            let fp = self.current_fingerprint();
            self.counter.record_write(fp);
        }

        Ok(())
    }
}

#[cfg(target_os = "macos")]
mod macos {
    use objc::runtime::{Object, BOOL, NO};
    use objc::{msg_send, sel, sel_impl};

    use crate::error::PasteboardError;
    use crate::platform::{
        bytes_from_nsdata, general_pasteboard, ns_string, nsdata_from_bytes, PLAIN_TEXT_TYPE,
        RTF_TYPE,
    };

    pub fn read_rtf() -> Option<Vec<u8>> {
        objc::rc::autoreleasepool(|| unsafe {
            let pasteboard = general_pasteboard()?;
            let rtf_type = ns_string(RTF_TYPE)?;
            let data: *mut Object = msg_send![pasteboard, dataForType: rtf_type];
            bytes_from_nsdata(data)
        })
    }

    /// Write RTF and its plain rendering as one pasteboard change.
    pub fn write_rtf(markup: &[u8], plain: &str) -> Result<(), PasteboardError> {
        objc::rc::autoreleasepool(|| unsafe {
            let pasteboard = general_pasteboard()
                .ok_or_else(|| PasteboardError::Unavailable("NSPasteboard missing".into()))?;
            let rtf_type = ns_string(RTF_TYPE)
                .ok_or_else(|| PasteboardError::Write("could not create type string".into()))?;
            let plain_type = ns_string(PLAIN_TEXT_TYPE)
                .ok_or_else(|| PasteboardError::Write("could not create type string".into()))?;
            let data = nsdata_from_bytes(markup)
                .ok_or_else(|| PasteboardError::Write("empty rich text payload".into()))?;
            let text = ns_string(plain)
                .ok_or_else(|| PasteboardError::Write("plain text contains NUL".into()))?;

            let _: i64 = msg_send![pasteboard, clearContents];
            let rtf_ok: BOOL = msg_send![pasteboard, setData: data forType: rtf_type];
            let text_ok: BOOL = msg_send![pasteboard, setString: text forType: plain_type];

            if rtf_ok == NO || text_ok == NO {
                return Err(PasteboardError::Write("NSPasteboard rejected rich text".into()));
            }
            Ok(())
        })
    }
}
