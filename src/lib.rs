//! clipkeep - clipboard history daemon
//!
//! Captures clipboard changes into a persistent, retention-bounded history with
//! pinning and search, and pastes a chosen entry back into the application that
//! was in front before the history was shown.

pub mod clipboard_history;
pub mod config;
pub mod error;
pub mod frontmost_app_tracker;
pub mod logging;
pub mod paste;
pub mod pasteboard;
pub mod runtime;
pub mod stdin_commands;

// Objective-C bridging helpers shared by the macOS backends
#[cfg(target_os = "macos")]
mod platform;
