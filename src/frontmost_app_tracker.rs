//! Frontmost Application Tracker
//!
//! Remembers the application the user was working in before the history was
//! presented, so a paste can go back to it. Our own process is never recorded.
//!
//! ## Usage
//!
//! ```ignore
//! use clipkeep::frontmost_app_tracker::{capture_prior_app, WorkspaceFocus};
//!
//! let focus = WorkspaceFocus;
//! if let Some(app) = capture_prior_app(&focus, "dev.clipkeep.clipkeep") {
//!     println!("Last app: {} ({})", app.name, app.bundle_id);
//! }
//! ```

use tracing::{debug, info, warn};

/// Information about a tracked application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedApp {
    /// Process ID
    pub pid: i32,
    /// Bundle identifier (e.g., "com.google.Chrome")
    pub bundle_id: String,
    /// Localized display name (e.g., "Google Chrome")
    pub name: String,
}

/// Query the foreground application and ask for re-activation.
pub trait FocusChannel {
    fn frontmost_app(&self) -> Option<TrackedApp>;

    /// Returns whether the OS accepted the activation request.
    fn activate(&self, app: &TrackedApp) -> bool;
}

pub fn is_own_app(app: &TrackedApp, own_bundle_id: &str) -> bool {
    app.bundle_id == own_bundle_id
}

/// Current foreground app, unless it is us.
pub fn capture_prior_app(focus: &dyn FocusChannel, own_bundle_id: &str) -> Option<TrackedApp> {
    let app = focus.frontmost_app()?;
    if is_own_app(&app, own_bundle_id) {
        debug!(bundle_id = %app.bundle_id, "Frontmost app is ourselves, not tracking");
        return None;
    }
    info!(
        name = %app.name,
        bundle_id = %app.bundle_id,
        pid = app.pid,
        "Tracked prior application"
    );
    Some(app)
}

/// NSWorkspace-backed focus channel
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkspaceFocus;

#[cfg(target_os = "macos")]
impl FocusChannel for WorkspaceFocus {
    fn frontmost_app(&self) -> Option<TrackedApp> {
        use objc::runtime::{Class, Object};
        use objc::{msg_send, sel, sel_impl};

        use crate::platform::string_from_ns;

        objc::rc::autoreleasepool(|| unsafe {
            let workspace_class = Class::get("NSWorkspace")?;
            let workspace: *mut Object = msg_send![workspace_class, sharedWorkspace];
            let app: *mut Object = msg_send![workspace, frontmostApplication];
            if app.is_null() {
                return None;
            }

            let bundle_id = string_from_ns(msg_send![app, bundleIdentifier])?;
            let name = string_from_ns(msg_send![app, localizedName]);
            let pid: i32 = msg_send![app, processIdentifier];

            Some(TrackedApp {
                pid,
                name: name.unwrap_or_else(|| bundle_id.clone()),
                bundle_id,
            })
        })
    }

    fn activate(&self, app: &TrackedApp) -> bool {
        use objc::runtime::{Class, Object, BOOL, NO};
        use objc::{msg_send, sel, sel_impl};

        // NSApplicationActivateIgnoringOtherApps
        const ACTIVATE_IGNORING_OTHER_APPS: u64 = 1 << 1;

        let activated = objc::rc::autoreleasepool(|| unsafe {
            let Some(class) = Class::get("NSRunningApplication") else {
                return false;
            };
            let running: *mut Object =
                msg_send![class, runningApplicationWithProcessIdentifier: app.pid];
            if running.is_null() {
                return false;
            }
            let ok: BOOL = msg_send![running, activateWithOptions: ACTIVATE_IGNORING_OTHER_APPS];
            ok != NO
        });

        if activated {
            debug!(bundle_id = %app.bundle_id, pid = app.pid, "Re-activated prior application");
        } else {
            warn!(bundle_id = %app.bundle_id, pid = app.pid, "Failed to re-activate prior application");
        }
        activated
    }
}

#[cfg(not(target_os = "macos"))]
impl FocusChannel for WorkspaceFocus {
    fn frontmost_app(&self) -> Option<TrackedApp> {
        debug!("Frontmost app tracking not available on this platform");
        None
    }

    fn activate(&self, app: &TrackedApp) -> bool {
        warn!(bundle_id = %app.bundle_id, "App activation not available on this platform");
        false
    }
}
