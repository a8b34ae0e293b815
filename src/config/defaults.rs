//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Clipboard polling interval (ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Unpinned entries older than this are swept (hours)
pub const DEFAULT_RETENTION_HOURS: u64 = 48;

/// Upper bound keeping `now - retention` representable (ten years)
pub const MAX_RETENTION_HOURS: u64 = 24 * 365 * 10;

/// Delay between focus restore and paste injection (ms)
pub const DEFAULT_PASTE_SETTLE_DELAY_MS: u64 = 200;

/// Accepted range for the settle delay; values outside are clamped
pub const MIN_PASTE_SETTLE_DELAY_MS: u64 = 150;
pub const MAX_PASTE_SETTLE_DELAY_MS: u64 = 250;

/// Default max text length for clipboard history entries (bytes)
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 100_000;

/// Our own bundle id, never recorded as the prior application
pub const DEFAULT_OWN_BUNDLE_ID: &str = "dev.clipkeep.clipkeep";

/// Config file name inside `<config_dir>/clipkeep/`
pub const CONFIG_FILE_NAME: &str = "config.json";
