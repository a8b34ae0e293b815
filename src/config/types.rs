//! Configuration type definitions

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Daemon settings. Every field is optional in the file; getters apply defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_hours: Option<u64>,
    /// Clamped to 150..=250 ms by the getter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paste_settle_delay_ms: Option<u64>,
    /// Maximum text length for captured entries (bytes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_text_length: Option<usize>,
    /// History file override; `~` is expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_bundle_id: Option<String>,
}

impl Config {
    pub fn get_poll_interval(&self) -> Duration {
        // A zero interval would spin the runtime loop
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS).max(1))
    }

    pub fn get_retention(&self) -> chrono::Duration {
        let hours = self
            .retention_hours
            .unwrap_or(DEFAULT_RETENTION_HOURS)
            .min(MAX_RETENTION_HOURS);
        chrono::Duration::hours(hours as i64)
    }

    pub fn get_paste_settle_delay(&self) -> Duration {
        let ms = self
            .paste_settle_delay_ms
            .unwrap_or(DEFAULT_PASTE_SETTLE_DELAY_MS)
            .clamp(MIN_PASTE_SETTLE_DELAY_MS, MAX_PASTE_SETTLE_DELAY_MS);
        Duration::from_millis(ms)
    }

    pub fn get_max_text_length(&self) -> usize {
        self.max_text_length.unwrap_or(DEFAULT_MAX_TEXT_LENGTH)
    }

    /// Configured history path with `~` expanded, if any.
    pub fn get_history_path(&self) -> Option<PathBuf> {
        self.history_path
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }

    pub fn get_own_bundle_id(&self) -> &str {
        self.own_bundle_id.as_deref().unwrap_or(DEFAULT_OWN_BUNDLE_ID)
    }

    /// Fields set in `overrides` win.
    pub fn merged_with(self, overrides: Config) -> Config {
        Config {
            poll_interval_ms: overrides.poll_interval_ms.or(self.poll_interval_ms),
            retention_hours: overrides.retention_hours.or(self.retention_hours),
            paste_settle_delay_ms: overrides.paste_settle_delay_ms.or(self.paste_settle_delay_ms),
            max_text_length: overrides.max_text_length.or(self.max_text_length),
            history_path: overrides.history_path.or(self.history_path),
            own_bundle_id: overrides.own_bundle_id.or(self.own_bundle_id),
        }
    }
}
