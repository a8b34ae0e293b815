//! Command+V injection strategies
//!
//! - `ScriptedKeystroke`: asks System Events via AppleScript (automation grant)
//! - `RawKeyEvents`: posts CGEvent key-down/key-up pairs (accessibility grant)

use tracing::debug;

use super::privileges::{Privilege, PrivilegeChecker, PrivilegeStatus};
use super::strategy::{InjectionStrategy, Precondition};
use crate::error::InjectionError;

/// AppleScript error number for "Not authorized to send Apple events"
const AUTOMATION_DENIED_CODE: &str = "-1743";

const PASTE_SCRIPT: &str =
    r#"tell application "System Events" to keystroke "v" using command down"#;

/// Map an osascript failure to an injection error.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn classify_script_failure(stderr: &str) -> InjectionError {
    if stderr.contains(AUTOMATION_DENIED_CODE) {
        InjectionError::PrivilegeDenied(Privilege::Automation)
    } else {
        InjectionError::Failed(format!("AppleScript error: {}", stderr.trim()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedKeystroke;

impl InjectionStrategy for ScriptedKeystroke {
    fn name(&self) -> &'static str {
        "scripted-keystroke"
    }

    fn required_privilege(&self) -> Privilege {
        Privilege::Automation
    }

    /// Attempted unless automation is known to be denied; the first attempt is
    /// what triggers the OS consent prompt.
    fn precondition(&self, privileges: &dyn PrivilegeChecker) -> Precondition {
        match privileges.status(self.required_privilege()) {
            PrivilegeStatus::Denied => Precondition::Skip(self.required_privilege()),
            PrivilegeStatus::Granted | PrivilegeStatus::Undetermined => Precondition::Attempt,
        }
    }

    #[cfg(target_os = "macos")]
    fn inject(&self) -> Result<(), InjectionError> {
        use std::process::Command;

        debug!(script = PASTE_SCRIPT, "Executing AppleScript");
        let output = Command::new("osascript")
            .arg("-e")
            .arg(PASTE_SCRIPT)
            .output()
            .map_err(|e| InjectionError::Failed(format!("Failed to execute AppleScript: {}", e)))?;

        if output.status.success() {
            debug!("AppleScript executed successfully");
            Ok(())
        } else {
            Err(classify_script_failure(&String::from_utf8_lossy(
                &output.stderr,
            )))
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn inject(&self) -> Result<(), InjectionError> {
        debug!(script = PASTE_SCRIPT, "AppleScript not available on this platform");
        Err(InjectionError::Unsupported)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RawKeyEvents;

impl InjectionStrategy for RawKeyEvents {
    fn name(&self) -> &'static str {
        "raw-key-events"
    }

    fn required_privilege(&self) -> Privilege {
        Privilege::Accessibility
    }

    /// Synthetic events are silently dropped without the grant, so never try.
    fn precondition(&self, privileges: &dyn PrivilegeChecker) -> Precondition {
        match privileges.status(self.required_privilege()) {
            PrivilegeStatus::Granted => Precondition::Attempt,
            PrivilegeStatus::Denied | PrivilegeStatus::Undetermined => {
                Precondition::Skip(self.required_privilege())
            }
        }
    }

    #[cfg(target_os = "macos")]
    fn inject(&self) -> Result<(), InjectionError> {
        use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
        use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
        use std::thread;
        use std::time::Duration;

        // 'v' key is keycode 9 on macOS
        const KEY_V: CGKeyCode = 9;

        let failed = |what: &str| InjectionError::Failed(format!("Failed to create {}", what));

        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| failed("CGEventSource"))?;

        let key_down = CGEvent::new_keyboard_event(source.clone(), KEY_V, true)
            .map_err(|_| failed("key down event"))?;
        key_down.set_flags(CGEventFlags::CGEventFlagCommand);

        let key_up = CGEvent::new_keyboard_event(source, KEY_V, false)
            .map_err(|_| failed("key up event"))?;
        key_up.set_flags(CGEventFlags::CGEventFlagCommand);

        key_down.post(CGEventTapLocation::HID);
        thread::sleep(Duration::from_millis(5));
        key_up.post(CGEventTapLocation::HID);

        debug!("Simulated Cmd+V via Core Graphics");
        Ok(())
    }

    #[cfg(not(target_os = "macos"))]
    fn inject(&self) -> Result<(), InjectionError> {
        debug!("Synthetic key events not available on this platform");
        Err(InjectionError::Unsupported)
    }
}
