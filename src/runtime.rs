//! Single-threaded daemon runtime
//!
//! Owns the history store, the clipboard, the watcher and the paste
//! orchestrator. Everything that mutates state happens on the thread running
//! [`Runtime::run`]; other threads talk to it through [`RuntimeCommand`]s.
//! The loop sleeps until the next poll tick or the pending paste deadline,
//! whichever comes first, and wakes early for incoming commands.

use std::ops::ControlFlow;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::clipboard_history::{
    ClipboardEntry, ClipboardWatcher, ContentType, HistoryStore, JsonFileStorage, SuppressionFlag,
    TickOutcome,
};
use crate::config::Config;
use crate::error::ClipkeepError;
use crate::paste::{
    PasteCollaborators, PasteOrchestrator, PasteOutcome, PasteRequestOutcome, PresentationDelegate,
};
use crate::pasteboard::{Pasteboard, SystemPasteboard};

/// Serializable row for list output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub timestamp: DateTime<Utc>,
    pub is_pinned: bool,
    pub age: String,
}

impl EntryView {
    pub fn from_entry(entry: &ClipboardEntry, now: DateTime<Utc>) -> Self {
        Self {
            id: entry.id.clone(),
            content: entry.content.clone(),
            content_type: entry.content_type(),
            timestamp: entry.timestamp,
            is_pinned: entry.pinned,
            age: entry.relative_time_label(now),
        }
    }
}

/// Requests served by the runtime thread
#[derive(Debug)]
pub enum RuntimeCommand {
    TogglePresentation,
    SelectEntry { id: String },
    /// Substring filter; empty query lists everything
    Search {
        query: String,
        reply: SyncSender<Vec<EntryView>>,
    },
    Delete { id: String },
    TogglePin { id: String },
    ClearUnpinned,
    ClearAll,
    Shutdown,
}

pub struct Runtime {
    store: HistoryStore,
    pasteboard: Box<dyn Pasteboard>,
    watcher: ClipboardWatcher,
    orchestrator: PasteOrchestrator,
    poll_interval: Duration,
}

impl Runtime {
    pub fn new(
        store: HistoryStore,
        pasteboard: Box<dyn Pasteboard>,
        watcher: ClipboardWatcher,
        orchestrator: PasteOrchestrator,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            pasteboard,
            watcher,
            orchestrator,
            poll_interval,
        }
    }

    /// Wire up the real clipboard, history file and OS channels from `config`.
    pub fn from_config(config: &Config, delegate: Box<dyn PresentationDelegate>) -> Result<Self> {
        let history_path = config
            .get_history_path()
            .unwrap_or_else(JsonFileStorage::default_path);
        let retention = config.get_retention();
        let storage = JsonFileStorage::new(&history_path, retention);
        let store = HistoryStore::open(Box::new(storage), retention);

        let pasteboard = SystemPasteboard::new()
            .map_err(ClipkeepError::from)
            .context("Failed to open the system clipboard")?;

        let suppression = SuppressionFlag::new();
        let watcher = ClipboardWatcher::new(suppression.clone(), config.get_max_text_length());
        let orchestrator = PasteOrchestrator::new(
            suppression,
            PasteCollaborators::system(delegate),
            config.get_paste_settle_delay(),
            config.get_own_bundle_id(),
        );

        info!(
            history_path = %history_path.display(),
            retention_hours = retention.num_hours(),
            poll_interval_ms = config.get_poll_interval().as_millis() as u64,
            "Runtime configured"
        );

        Ok(Self::new(
            store,
            Box::new(pasteboard),
            watcher,
            orchestrator,
            config.get_poll_interval(),
        ))
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &PasteOrchestrator {
        &self.orchestrator
    }

    /// Startup work before the first poll: privilege check and token baseline.
    pub fn start(&mut self) {
        self.orchestrator.check_startup_privileges();
        self.poll();
    }

    pub fn poll(&mut self) -> TickOutcome {
        let outcome = self.watcher.tick(self.pasteboard.as_mut(), &mut self.store);
        if !matches!(outcome, TickOutcome::Unchanged) {
            debug!(?outcome, "Clipboard poll");
        }
        outcome
    }

    pub fn run_due(&mut self, now: Instant) -> Option<PasteOutcome> {
        self.orchestrator.run_due(now)
    }

    /// Apply one command. `Break` means shut down.
    pub fn handle(&mut self, command: RuntimeCommand, now: Instant) -> ControlFlow<()> {
        match command {
            RuntimeCommand::TogglePresentation => {
                self.orchestrator.toggle_presentation();
            }
            RuntimeCommand::SelectEntry { id } => self.select(&id, now),
            RuntimeCommand::Search { query, reply } => {
                let wall_now = Utc::now();
                let rows = self
                    .store
                    .search(&query)
                    .into_iter()
                    .map(|e| EntryView::from_entry(e, wall_now))
                    .collect();
                if reply.send(rows).is_err() {
                    debug!("Search requester went away");
                }
            }
            RuntimeCommand::Delete { id } => {
                self.store.delete(&id);
            }
            RuntimeCommand::TogglePin { id } => {
                if self.store.toggle_pin(&id).is_none() {
                    debug!(id = %id, "Pin toggle for unknown entry");
                }
            }
            RuntimeCommand::ClearUnpinned => {
                self.store.clear_unpinned();
            }
            RuntimeCommand::ClearAll => {
                self.store.clear_all();
            }
            RuntimeCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn select(&mut self, id: &str, now: Instant) {
        let Some(entry) = self.store.get(id).cloned() else {
            debug!(id, "Selected entry no longer exists");
            return;
        };

        match self
            .orchestrator
            .request_paste(&entry, self.pasteboard.as_mut(), now)
        {
            Ok(PasteRequestOutcome::Scheduled { .. }) | Ok(PasteRequestOutcome::CopiedOnly) => {}
            Ok(PasteRequestOutcome::Ignored) => {
                debug!(id, "Selection ignored, paste in flight");
            }
            Err(e) => {
                let err = ClipkeepError::from(e);
                warn!(id, error = %err, severity = ?err.severity(), "{}", err.user_message());
            }
        }
    }

    /// Serve commands until `Shutdown` or until every sender is gone.
    #[instrument(name = "runtime_loop", skip_all)]
    pub fn run(mut self, commands: Receiver<RuntimeCommand>) {
        info!("Clipboard runtime started");
        self.start();
        let mut next_poll = Instant::now() + self.poll_interval;

        loop {
            let now = Instant::now();
            if now >= next_poll {
                self.poll();
                next_poll = now + self.poll_interval;
            }
            self.run_due(now);

            let wake = self
                .orchestrator
                .next_deadline()
                .map_or(next_poll, |due| due.min(next_poll));
            let timeout = wake.saturating_duration_since(Instant::now());

            match commands.recv_timeout(timeout) {
                Ok(command) => {
                    if self.handle(command, Instant::now()).is_break() {
                        info!("Shutdown requested");
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Command channel closed");
                    break;
                }
            }
        }

        self.orchestrator.cancel_pending();
        info!(entries = self.store.len(), "Clipboard runtime stopped");
    }
}
