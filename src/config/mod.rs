//! Configuration module - daemon settings
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - The `Config` struct and its getters
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{
    DEFAULT_MAX_TEXT_LENGTH, DEFAULT_OWN_BUNDLE_ID, DEFAULT_PASTE_SETTLE_DELAY_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_RETENTION_HOURS, MAX_PASTE_SETTLE_DELAY_MS,
    MIN_PASTE_SETTLE_DELAY_MS,
};
pub use loader::{default_config_path, load_config};
pub use types::Config;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
