//! OS privilege checks for paste injection
//!
//! Grants are queried every time they are needed; the user can toggle them in
//! System Settings while the daemon runs.

use tracing::{debug, info};

/// A privilege an injection strategy may need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    /// Scripting other apps through System Events
    Automation,
    /// Posting synthetic input events
    Accessibility,
}

impl Privilege {
    pub fn display_name(&self) -> &'static str {
        match self {
            Privilege::Automation => "Automation",
            Privilege::Accessibility => "Accessibility",
        }
    }

    /// System Settings deep link for the matching privacy pane
    pub fn settings_url(&self) -> &'static str {
        match self {
            Privilege::Automation => {
                "x-apple.systempreferences:com.apple.preference.security?Privacy_Automation"
            }
            Privilege::Accessibility => {
                "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility"
            }
        }
    }

    pub fn remediation_message(&self) -> String {
        match self {
            Privilege::Automation => format!(
                "clipkeep needs {} permission to paste into other apps. \
                 Enable it under System Settings > Privacy & Security > Automation \
                 (System Events). The entry was copied; press \u{2318}V to paste.",
                self.display_name()
            ),
            Privilege::Accessibility => format!(
                "clipkeep needs {} permission to paste automatically. \
                 Enable it under System Settings > Privacy & Security > Accessibility, \
                 then try again.",
                self.display_name()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeStatus {
    Granted,
    Denied,
    /// The OS has no answer until the first attempt prompts the user
    Undetermined,
}

pub trait PrivilegeChecker {
    fn status(&self, privilege: Privilege) -> PrivilegeStatus;

    /// Ask the OS to prompt for the privilege. Returns the status afterwards.
    fn request(&self, privilege: Privilege) -> PrivilegeStatus;
}

/// Live OS privilege queries
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPrivileges;

#[cfg(target_os = "macos")]
impl PrivilegeChecker for SystemPrivileges {
    fn status(&self, privilege: Privilege) -> PrivilegeStatus {
        use macos_accessibility_client::accessibility;

        let status = match privilege {
            Privilege::Accessibility => {
                if accessibility::application_is_trusted() {
                    PrivilegeStatus::Granted
                } else {
                    PrivilegeStatus::Denied
                }
            }
            // No query API without prompting; the scripted attempt reports -1743 on denial
            Privilege::Automation => PrivilegeStatus::Undetermined,
        };
        debug!(privilege = privilege.display_name(), ?status, "Checked privilege");
        status
    }

    fn request(&self, privilege: Privilege) -> PrivilegeStatus {
        use macos_accessibility_client::accessibility;

        info!(privilege = privilege.display_name(), "Requesting privilege");
        match privilege {
            Privilege::Accessibility => {
                if accessibility::application_is_trusted_with_prompt() {
                    PrivilegeStatus::Granted
                } else {
                    PrivilegeStatus::Denied
                }
            }
            Privilege::Automation => PrivilegeStatus::Undetermined,
        }
    }
}

#[cfg(not(target_os = "macos"))]
impl PrivilegeChecker for SystemPrivileges {
    fn status(&self, privilege: Privilege) -> PrivilegeStatus {
        debug!(
            privilege = privilege.display_name(),
            "Privilege checks not available on this platform"
        );
        PrivilegeStatus::Denied
    }

    fn request(&self, privilege: Privilege) -> PrivilegeStatus {
        info!(
            privilege = privilege.display_name(),
            "Privilege requests not available on this platform"
        );
        PrivilegeStatus::Denied
    }
}
