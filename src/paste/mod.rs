//! Paste-back orchestration
//!
//! `Idle -> Presenting -> Injecting -> Idle`. Selecting an entry writes it to
//! the clipboard (flagged as our own write), dismisses the UI, re-activates the
//! application that was in front before presentation and, after a settle
//! delay, runs the injection chain. Whatever the chain does, the entry stays on
//! the clipboard and the state returns to `Idle`.
//!
//! ## Module Structure
//! - `privileges`: Automation/Accessibility grant queries
//! - `strategy`: The ordered fallback chain
//! - `keystroke`: AppleScript and CGEvent Command+V strategies
//! - `deferred`: Settle-delay task with a cancel handle

mod deferred;
mod keystroke;
mod privileges;
mod strategy;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::clipboard_history::{ClipboardEntry, SuppressionFlag};
use crate::error::PasteboardError;
use crate::frontmost_app_tracker::{capture_prior_app, FocusChannel, TrackedApp};
use crate::logging;
use crate::pasteboard::{Pasteboard, PasteboardPayload};

pub use deferred::{CancelHandle, Deferred};
pub use keystroke::{RawKeyEvents, ScriptedKeystroke};
pub use privileges::{Privilege, PrivilegeChecker, PrivilegeStatus, SystemPrivileges};
pub use strategy::{ChainReport, InjectionChain, InjectionStrategy, Precondition};

#[cfg(test)]
pub(crate) use strategy::test_support;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteState {
    Idle,
    Presenting,
    Injecting,
}

/// Out-of-band message telling the user which grant is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationNotice {
    pub privilege: Privilege,
    pub message: String,
    pub settings_url: &'static str,
}

impl RemediationNotice {
    pub fn for_privilege(privilege: Privilege) -> Self {
        Self {
            privilege,
            message: privilege.remediation_message(),
            settings_url: privilege.settings_url(),
        }
    }
}

/// The UI side of the paste flow
pub trait PresentationDelegate {
    /// Hide the history UI so the prior app can take focus.
    fn dismiss(&mut self);

    fn show_remediation(&mut self, notice: &RemediationNotice);
}

/// Immediate result of a paste request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteRequestOutcome {
    /// Injection will run at `due`
    Scheduled { due: Instant },
    /// Written to the clipboard; no app to paste into
    CopiedOnly,
    /// Another paste is still in flight
    Ignored,
}

/// Final result once the settle delay has elapsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    Pasted { strategy: &'static str },
    /// Every strategy was skipped or failed; the user can press Command+V
    LeftOnClipboard,
    Cancelled,
}

impl PasteOutcome {
    fn label(&self) -> &'static str {
        match self {
            PasteOutcome::Pasted { .. } => "pasted",
            PasteOutcome::LeftOnClipboard => "left_on_clipboard",
            PasteOutcome::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug)]
struct PendingPaste {
    entry_id: String,
}

/// Platform collaborators the orchestrator drives
pub struct PasteCollaborators {
    pub chain: InjectionChain,
    pub privileges: Box<dyn PrivilegeChecker>,
    pub focus: Box<dyn FocusChannel>,
    pub delegate: Box<dyn PresentationDelegate>,
}

impl PasteCollaborators {
    /// Real OS channels with the scripted-then-raw injection chain.
    pub fn system(delegate: Box<dyn PresentationDelegate>) -> Self {
        Self {
            chain: InjectionChain::new(vec![
                Box::new(ScriptedKeystroke),
                Box::new(RawKeyEvents),
            ]),
            privileges: Box::new(SystemPrivileges),
            focus: Box::new(crate::frontmost_app_tracker::WorkspaceFocus),
            delegate,
        }
    }
}

pub struct PasteOrchestrator {
    state: PasteState,
    prior_app: Option<TrackedApp>,
    pending: Option<Deferred<PendingPaste>>,
    suppression: SuppressionFlag,
    collaborators: PasteCollaborators,
    settle_delay: Duration,
    own_bundle_id: String,
    notified: HashSet<Privilege>,
}

impl PasteOrchestrator {
    pub fn new(
        suppression: SuppressionFlag,
        collaborators: PasteCollaborators,
        settle_delay: Duration,
        own_bundle_id: impl Into<String>,
    ) -> Self {
        Self {
            state: PasteState::Idle,
            prior_app: None,
            pending: None,
            suppression,
            collaborators,
            settle_delay,
            own_bundle_id: own_bundle_id.into(),
            notified: HashSet::new(),
        }
    }

    pub fn state(&self) -> PasteState {
        self.state
    }

    pub fn prior_app(&self) -> Option<&TrackedApp> {
        self.prior_app.as_ref()
    }

    /// When the pending injection is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(Deferred::due)
    }

    /// Show or hide the history UI. Opening records the current foreground app.
    pub fn toggle_presentation(&mut self) -> PasteState {
        match self.state {
            PasteState::Idle => {
                self.prior_app =
                    capture_prior_app(self.collaborators.focus.as_ref(), &self.own_bundle_id);
                self.state = PasteState::Presenting;
            }
            PasteState::Presenting => {
                self.collaborators.delegate.dismiss();
                self.prior_app = None;
                self.state = PasteState::Idle;
            }
            PasteState::Injecting => {
                debug!("Toggle ignored while a paste is in flight");
            }
        }
        debug!(state = ?self.state, "Presentation toggled");
        self.state
    }

    /// Write `entry` to the clipboard and schedule the paste into the prior app.
    pub fn request_paste(
        &mut self,
        entry: &ClipboardEntry,
        pasteboard: &mut dyn Pasteboard,
        now: Instant,
    ) -> Result<PasteRequestOutcome, PasteboardError> {
        if self.state == PasteState::Injecting || self.pending.is_some() {
            debug!(entry_id = %entry.id, "Paste already in flight, ignoring request");
            return Ok(PasteRequestOutcome::Ignored);
        }
        self.state = PasteState::Injecting;

        // Flag before writing so the next watcher tick skips this change
        self.suppression.mark_next_write_internal();
        if let Err(e) = pasteboard.write(&PasteboardPayload::from_entry(entry)) {
            self.suppression.clear();
            self.state = PasteState::Idle;
            self.prior_app = None;
            logging::log_paste_outcome(&entry.id, "write_failed", None);
            return Err(e);
        }

        self.collaborators.delegate.dismiss();

        let Some(app) = self.prior_app.take() else {
            info!(entry_id = %entry.id, "No prior application; entry copied only");
            return Ok(self.finish_copy_only(&entry.id));
        };

        if !self.collaborators.focus.activate(&app) {
            return Ok(self.finish_copy_only(&entry.id));
        }

        let due = now + self.settle_delay;
        self.pending = Some(Deferred::new(
            due,
            PendingPaste {
                entry_id: entry.id.clone(),
            },
        ));
        debug!(
            entry_id = %entry.id,
            target = %app.bundle_id,
            settle_ms = self.settle_delay.as_millis() as u64,
            "Paste scheduled"
        );
        Ok(PasteRequestOutcome::Scheduled { due })
    }

    fn finish_copy_only(&mut self, entry_id: &str) -> PasteRequestOutcome {
        self.state = PasteState::Idle;
        logging::log_paste_outcome(entry_id, "copied_only", None);
        PasteRequestOutcome::CopiedOnly
    }

    /// Cancel the pending injection; the clipboard keeps the entry.
    pub fn cancel_pending(&mut self) -> bool {
        match &self.pending {
            Some(task) => {
                task.cancel_handle().cancel();
                true
            }
            None => false,
        }
    }

    /// Run the injection chain if the settle delay has elapsed.
    pub fn run_due(&mut self, now: Instant) -> Option<PasteOutcome> {
        let task = self.pending.take()?;

        let outcome = if task.is_cancelled() {
            PasteOutcome::Cancelled
        } else if !task.is_due(now) {
            self.pending = Some(task);
            return None;
        } else {
            let report = self.collaborators.chain.run(self.collaborators.privileges.as_ref());
            for privilege in &report.denied {
                self.notify_missing(*privilege);
            }
            match report.succeeded {
                Some(strategy) => PasteOutcome::Pasted { strategy },
                None => {
                    warn!("No injection strategy succeeded; entry left on clipboard");
                    PasteOutcome::LeftOnClipboard
                }
            }
        };

        self.state = PasteState::Idle;
        let strategy = match &outcome {
            PasteOutcome::Pasted { strategy } => Some(*strategy),
            _ => None,
        };
        logging::log_paste_outcome(&task.payload().entry_id, outcome.label(), strategy);
        Some(outcome)
    }

    /// Ask for Accessibility at launch and raise a notice if it stays missing.
    pub fn check_startup_privileges(&mut self) -> PrivilegeStatus {
        let privileges = self.collaborators.privileges.as_ref();
        let mut status = privileges.status(Privilege::Accessibility);
        if status != PrivilegeStatus::Granted {
            status = privileges.request(Privilege::Accessibility);
        }
        if status != PrivilegeStatus::Granted {
            self.notify_missing(Privilege::Accessibility);
        }
        status
    }

    /// Raise a remediation notice at most once per privilege per session.
    fn notify_missing(&mut self, privilege: Privilege) {
        if !self.notified.insert(privilege) {
            return;
        }
        info!(
            privilege = privilege.display_name(),
            "Raising remediation notice"
        );
        self.collaborators
            .delegate
            .show_remediation(&RemediationNotice::for_privilege(privilege));
    }
}


#[cfg(test)]
mod tests {
    use super::delegate_support::RecordingDelegate;
    use super::test_support::{FakePrivileges, FakeStrategy};
    use super::*;
    use crate::clipboard_history::{CapturedContent, EntryKind};
    use crate::error::InjectionError;
    use crate::frontmost_app_tracker::test_support::FakeFocus;
    use crate::pasteboard::memory::MemoryPasteboard;
    use chrono::Utc;
    use std::cell::Cell;
    use std::rc::Rc;

    const OWN: &str = "dev.clipkeep.clipkeep";
    const SETTLE: Duration = Duration::from_millis(200);

    struct Harness {
        orchestrator: PasteOrchestrator,
        focus: FakeFocus,
        privileges: FakePrivileges,
        delegate: RecordingDelegate,
        pasteboard: MemoryPasteboard,
        suppression: SuppressionFlag,
        scripted_attempts: Rc<Cell<usize>>,
        raw_attempts: Rc<Cell<usize>>,
    }

    fn harness(
        scripted: Result<(), InjectionError>,
        privileges: &[(Privilege, PrivilegeStatus)],
    ) -> Harness {
        let focus = FakeFocus::with_frontmost("com.apple.TextEdit");
        let privileges = FakePrivileges::with(privileges);
        let delegate = RecordingDelegate::default();
        let suppression = SuppressionFlag::new();
        let (scripted, scripted_attempts) =
            FakeStrategy::new("scripted", Privilege::Automation, false, scripted);
        let (raw, raw_attempts) =
            FakeStrategy::new("raw", Privilege::Accessibility, true, Ok(()));

        let orchestrator = PasteOrchestrator::new(
            suppression.clone(),
            PasteCollaborators {
                chain: InjectionChain::new(vec![Box::new(scripted), Box::new(raw)]),
                privileges: Box::new(privileges.clone()),
                focus: Box::new(focus.clone()),
                delegate: Box::new(delegate.clone()),
            },
            SETTLE,
            OWN,
        );

        Harness {
            orchestrator,
            focus,
            privileges,
            delegate,
            pasteboard: MemoryPasteboard::new(),
            suppression,
            scripted_attempts,
            raw_attempts,
        }
    }

    fn entry(content: &str) -> ClipboardEntry {
        ClipboardEntry::new(CapturedContent::new(content, EntryKind::Text), Utc::now())
    }

    #[test]
    fn test_full_paste_flow() {
        let mut h = harness(Ok(()), &[]);
        let start = Instant::now();
        let e = entry("hello");

        assert_eq!(h.orchestrator.toggle_presentation(), PasteState::Presenting);
        assert_eq!(h.orchestrator.prior_app().map(|a| a.bundle_id.as_str()), Some("com.apple.TextEdit"));

        let mut pb = h.pasteboard.clone();
        let outcome = h.orchestrator.request_paste(&e, &mut pb, start).unwrap();

        assert_eq!(outcome, PasteRequestOutcome::Scheduled { due: start + SETTLE });
        assert_eq!(h.orchestrator.state(), PasteState::Injecting);
        assert!(h.suppression.is_set());
        assert_eq!(h.pasteboard.writes(), vec![PasteboardPayload::Text("hello".into())]);
        assert_eq!(*h.delegate.dismissals.borrow(), 1);
        assert_eq!(h.focus.activations.borrow().len(), 1);

        // Not yet due
        assert_eq!(h.orchestrator.run_due(start + Duration::from_millis(100)), None);
        assert_eq!(h.scripted_attempts.get(), 0);

        let result = h.orchestrator.run_due(start + SETTLE);
        assert_eq!(result, Some(PasteOutcome::Pasted { strategy: "scripted" }));
        assert_eq!(h.orchestrator.state(), PasteState::Idle);
        assert_eq!(h.orchestrator.next_deadline(), None);
    }

    #[test]
    fn test_presentation_skips_self() {
        let mut h = harness(Ok(()), &[]);
        h.focus.set_frontmost(OWN);

        h.orchestrator.toggle_presentation();

        assert_eq!(h.orchestrator.prior_app(), None);
    }

    #[test]
    fn test_no_prior_app_copies_only() {
        let mut h = harness(Ok(()), &[]);
        *h.focus.frontmost.borrow_mut() = None;
        h.orchestrator.toggle_presentation();

        let mut pb = h.pasteboard.clone();
        let outcome = h
            .orchestrator
            .request_paste(&entry("x"), &mut pb, Instant::now())
            .unwrap();

        assert_eq!(outcome, PasteRequestOutcome::CopiedOnly);
        assert_eq!(h.orchestrator.state(), PasteState::Idle);
        assert_eq!(h.pasteboard.writes().len(), 1);
        assert!(h.focus.activations.borrow().is_empty());
        assert_eq!(h.scripted_attempts.get(), 0);
    }

    #[test]
    fn test_failed_activation_copies_only() {
        let mut h = harness(Ok(()), &[]);
        h.focus.refuse_activation.set(true);
        h.orchestrator.toggle_presentation();

        let mut pb = h.pasteboard.clone();
        let outcome = h
            .orchestrator
            .request_paste(&entry("x"), &mut pb, Instant::now())
            .unwrap();

        assert_eq!(outcome, PasteRequestOutcome::CopiedOnly);
        assert_eq!(h.orchestrator.next_deadline(), None);
    }

    #[test]
    fn test_overlapping_request_is_ignored() {
        let mut h = harness(Ok(()), &[]);
        let start = Instant::now();
        h.orchestrator.toggle_presentation();
        let mut pb = h.pasteboard.clone();
        h.orchestrator.request_paste(&entry("first"), &mut pb, start).unwrap();

        let second = h
            .orchestrator
            .request_paste(&entry("second"), &mut pb, start)
            .unwrap();

        assert_eq!(second, PasteRequestOutcome::Ignored);
        assert_eq!(h.pasteboard.writes().len(), 1);
        assert_eq!(h.orchestrator.toggle_presentation(), PasteState::Injecting);
    }

    #[test]
    fn test_automation_denied_falls_back_and_notifies_once() {
        let mut h = harness(
            Err(InjectionError::PrivilegeDenied(Privilege::Automation)),
            &[(Privilege::Accessibility, PrivilegeStatus::Granted)],
        );
        let start = Instant::now();
        let mut pb = h.pasteboard.clone();

        for round in 0..2u32 {
            let t = start + Duration::from_secs(round as u64);
            h.orchestrator.toggle_presentation();
            h.orchestrator.request_paste(&entry("x"), &mut pb, t).unwrap();
            let outcome = h.orchestrator.run_due(t + SETTLE);
            assert_eq!(outcome, Some(PasteOutcome::Pasted { strategy: "raw" }));
        }

        let notices = h.delegate.notices.borrow();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].privilege, Privilege::Automation);
        assert!(notices[0].message.contains("Automation"));
    }

    #[test]
    fn test_exhausted_chain_leaves_entry_on_clipboard() {
        let mut h = harness(Err(InjectionError::Failed("boom".into())), &[]);
        let start = Instant::now();
        h.orchestrator.toggle_presentation();
        let mut pb = h.pasteboard.clone();
        h.orchestrator.request_paste(&entry("keep me"), &mut pb, start).unwrap();

        let outcome = h.orchestrator.run_due(start + SETTLE);

        assert_eq!(outcome, Some(PasteOutcome::LeftOnClipboard));
        assert_eq!(h.raw_attempts.get(), 0);
        assert_eq!(h.orchestrator.state(), PasteState::Idle);
        assert_eq!(
            h.pasteboard.writes().last(),
            Some(&PasteboardPayload::Text("keep me".into()))
        );
        let notices = h.delegate.notices.borrow();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].privilege, Privilege::Accessibility);
    }

    #[test]
    fn test_cancel_pending() {
        let mut h = harness(Ok(()), &[]);
        let start = Instant::now();
        h.orchestrator.toggle_presentation();
        let mut pb = h.pasteboard.clone();
        h.orchestrator.request_paste(&entry("x"), &mut pb, start).unwrap();

        assert!(h.orchestrator.cancel_pending());
        let outcome = h.orchestrator.run_due(start);

        assert_eq!(outcome, Some(PasteOutcome::Cancelled));
        assert_eq!(h.scripted_attempts.get(), 0);
        assert_eq!(h.orchestrator.state(), PasteState::Idle);
        assert!(!h.orchestrator.cancel_pending());
    }

    #[test]
    fn test_write_failure_clears_suppression() {
        let mut h = harness(Ok(()), &[]);
        h.pasteboard.set_fail_writes(true);
        h.orchestrator.toggle_presentation();
        let mut pb = h.pasteboard.clone();

        let result = h.orchestrator.request_paste(&entry("x"), &mut pb, Instant::now());

        assert!(matches!(result, Err(PasteboardError::Write(_))));
        assert!(!h.suppression.is_set());
        assert_eq!(h.orchestrator.state(), PasteState::Idle);
        assert_eq!(*h.delegate.dismissals.borrow(), 0);
    }

    #[test]
    fn test_toggle_twice_dismisses() {
        let mut h = harness(Ok(()), &[]);
        h.orchestrator.toggle_presentation();
        assert_eq!(h.orchestrator.toggle_presentation(), PasteState::Idle);
        assert_eq!(*h.delegate.dismissals.borrow(), 1);
        assert_eq!(h.orchestrator.prior_app(), None);
    }

    #[test]
    fn test_startup_privilege_check() {
        let mut h = harness(Ok(()), &[]);
        assert_eq!(h.orchestrator.check_startup_privileges(), PrivilegeStatus::Denied);
        assert_eq!(h.privileges.requests.get(), 1);
        assert_eq!(h.delegate.notices.borrow().len(), 1);

        h.privileges.set(Privilege::Accessibility, PrivilegeStatus::Granted);
        assert_eq!(h.orchestrator.check_startup_privileges(), PrivilegeStatus::Granted);
        assert_eq!(h.privileges.requests.get(), 1);
    }

    #[test]
    fn test_rich_text_entry_writes_markup_and_plain() {
        let mut h = harness(Ok(()), &[]);
        let mut pb = h.pasteboard.clone();
        let rich = ClipboardEntry::new(
            CapturedContent::new("Bold", EntryKind::RichText(b"{\\rtf1 Bold}".to_vec())),
            Utc::now(),
        );

        h.orchestrator.request_paste(&rich, &mut pb, Instant::now()).unwrap();

        assert_eq!(h.pasteboard.writes(), vec![PasteboardPayload::from_entry(&rich)]);
        assert_eq!(pb.read_text().as_deref(), Some("Bold"));
    }
}
