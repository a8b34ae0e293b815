//! Clipboard change tokens
//!
//! On macOS the token is `NSPasteboard.changeCount`, a cheap integer read that
//! increments on every write by any process. Elsewhere a content fingerprint
//! is folded into a synthetic counter with the same contract.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[cfg(target_os = "macos")]
use objc::sel;
#[cfg(target_os = "macos")]
use objc::sel_impl;

use tracing::debug;

/// Read `NSPasteboard.generalPasteboard.changeCount`.
#[cfg(target_os = "macos")]
pub fn pasteboard_change_count() -> Option<i64> {
    use cocoa::appkit::NSPasteboard;
    use cocoa::base::nil;
    use objc::runtime::Object;

    unsafe {
        let pasteboard: *mut Object = NSPasteboard::generalPasteboard(nil);
        if pasteboard.is_null() {
            return None;
        }

        // NSInteger (i64 on 64-bit)
        let change_count: i64 = objc::msg_send![pasteboard, changeCount];
        Some(change_count)
    }
}

#[cfg(not(target_os = "macos"))]
pub fn pasteboard_change_count() -> Option<i64> {
    None
}

/// Monotonic counter bumped whenever the observed content fingerprint moves.
#[derive(Debug, Default)]
pub struct FingerprintCounter {
    count: i64,
    last_fingerprint: Option<u64>,
}

impl FingerprintCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the latest fingerprint and get the resulting token.
    pub fn observe(&mut self, fingerprint: u64) -> i64 {
        if self.last_fingerprint != Some(fingerprint) {
            if self.last_fingerprint.is_some() {
                self.count += 1;
                debug!(count = self.count, "Clipboard fingerprint changed");
            }
            self.last_fingerprint = Some(fingerprint);
        }
        self.count
    }

    /// Record a write of our own. Always bumps, even if the content is unchanged,
    /// so the token moves exactly like a native change counter.
    pub fn record_write(&mut self, fingerprint: u64) -> i64 {
        self.count += 1;
        self.last_fingerprint = Some(fingerprint);
        self.count
    }

    pub fn current(&self) -> i64 {
        self.count
    }
}

/// Hash of the text slot plus image bytes, for change detection only.
pub fn fingerprint(text: Option<&str>, image: Option<&[u8]>) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    image.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_baseline() {
        let mut counter = FingerprintCounter::new();
        let token = counter.observe(fingerprint(Some("a"), None));
        assert_eq!(token, 0);
        assert_eq!(counter.observe(fingerprint(Some("a"), None)), 0);
    }

    #[test]
    fn test_content_change_bumps_token() {
        let mut counter = FingerprintCounter::new();
        counter.observe(fingerprint(Some("a"), None));
        assert_eq!(counter.observe(fingerprint(Some("b"), None)), 1);
        assert_eq!(counter.observe(fingerprint(Some("a"), None)), 2);
    }

    #[test]
    fn test_own_write_bumps_once() {
        let mut counter = FingerprintCounter::new();
        counter.observe(fingerprint(Some("a"), None));

        let written = fingerprint(Some("a"), None);
        assert_eq!(counter.record_write(written), 1);
        assert_eq!(counter.observe(written), 1);
        assert_eq!(counter.current(), 1);
    }

    #[test]
    fn test_fingerprint_distinguishes_slots() {
        assert_ne!(fingerprint(Some("x"), None), fingerprint(None, None));
        assert_ne!(
            fingerprint(None, Some(&[1, 2])),
            fingerprint(None, Some(&[1, 3]))
        );
    }

    #[cfg(all(target_os = "macos", feature = "system-tests"))]
    #[test]
    fn test_change_count_is_readable() {
        let count = pasteboard_change_count();
        assert!(count.is_some_and(|c| c >= 0), "change count: {:?}", count);
    }
}
