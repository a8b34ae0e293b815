//! External command handling via stdin.
//!
//! The daemon is driven by JSON objects, one per line (JSONL):
//!
//! ```json
//! {"type": "toggle"}
//! {"type": "list", "query": "invoice"}
//! {"type": "select", "id": "5f1c..."}
//! {"type": "pin", "id": "5f1c..."}
//! {"type": "delete", "id": "5f1c..."}
//! {"type": "clearUnpinned"}
//! {"type": "clearAll"}
//! {"type": "quit"}
//! ```
//!
//! Responses and UI events go to stdout as JSON lines tagged by `event`:
//!
//! ```json
//! {"event": "entry", "id": "5f1c...", "content": "...", "type": "text", ...}
//! {"event": "listEnd", "count": 1}
//! {"event": "dismiss"}
//! {"event": "remediation", "privilege": "Accessibility", "message": "...", "settingsUrl": "..."}
//! ```

use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;
use std::sync::mpsc::{self, SyncSender};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::paste::{PresentationDelegate, RemediationNotice};
use crate::runtime::{EntryView, RuntimeCommand};

/// Bounded queue between the stdin thread and the runtime
pub const COMMAND_CHANNEL_CAPACITY: usize = 100;

/// Commands accepted on stdin
///
/// `select` and `list` accept an optional `requestId`, logged with the
/// resulting operation and echoed on `listEnd`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExternalCommand {
    /// Show or hide the history
    Toggle,
    /// Paste an entry into the previously focused app
    Select {
        id: String,
        #[serde(default, rename = "requestId")]
        request_id: Option<String>,
    },
    /// Print entries matching `query` (all entries when omitted)
    List {
        #[serde(default)]
        query: String,
        #[serde(default, rename = "requestId")]
        request_id: Option<String>,
    },
    Pin { id: String },
    Delete { id: String },
    ClearUnpinned,
    ClearAll,
    Quit,
}

/// Lines written to stdout. Entry rows carry their own `type` field.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum DaemonEvent<'a> {
    Entry(&'a EntryView),
    ListEnd {
        count: usize,
        #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
        request_id: Option<&'a str>,
    },
    Dismiss,
    Remediation {
        privilege: &'a str,
        message: &'a str,
        #[serde(rename = "settingsUrl")]
        settings_url: &'a str,
    },
}

fn emit(out: &mut dyn Write, event: &DaemonEvent<'_>) {
    let written = serde_json::to_string(event)
        .map_err(io::Error::from)
        .and_then(|line| writeln!(out, "{}", line))
        .and_then(|()| out.flush());
    if let Err(e) = written {
        warn!(error = %e, "Failed to write event to stdout");
    }
}

pub fn parse_command(line: &str) -> Result<ExternalCommand, serde_json::Error> {
    serde_json::from_str(line.trim())
}

/// Forward one parsed command. `Break` once the runtime is gone or on quit.
pub fn dispatch(
    command: ExternalCommand,
    commands: &SyncSender<RuntimeCommand>,
    out: &mut dyn Write,
) -> ControlFlow<()> {
    let runtime_command = match command {
        ExternalCommand::Toggle => RuntimeCommand::TogglePresentation,
        ExternalCommand::Select { id, request_id } => {
            info!(id = %id, request_id = ?request_id, "Select requested");
            RuntimeCommand::SelectEntry { id }
        }
        ExternalCommand::List { query, request_id } => {
            return list(query, request_id.as_deref(), commands, out);
        }
        ExternalCommand::Pin { id } => RuntimeCommand::TogglePin { id },
        ExternalCommand::Delete { id } => RuntimeCommand::Delete { id },
        ExternalCommand::ClearUnpinned => RuntimeCommand::ClearUnpinned,
        ExternalCommand::ClearAll => RuntimeCommand::ClearAll,
        ExternalCommand::Quit => {
            // Runtime may already be gone; either way we stop reading
            let _ = commands.send(RuntimeCommand::Shutdown);
            return ControlFlow::Break(());
        }
    };

    if commands.send(runtime_command).is_err() {
        debug!("Command channel closed");
        return ControlFlow::Break(());
    }
    ControlFlow::Continue(())
}

fn list(
    query: String,
    request_id: Option<&str>,
    commands: &SyncSender<RuntimeCommand>,
    out: &mut dyn Write,
) -> ControlFlow<()> {
    let (reply, rows) = mpsc::sync_channel(1);
    if commands.send(RuntimeCommand::Search { query, reply }).is_err() {
        return ControlFlow::Break(());
    }
    let Ok(rows) = rows.recv() else {
        return ControlFlow::Break(());
    };

    for row in &rows {
        emit(out, &DaemonEvent::Entry(row));
    }
    emit(
        out,
        &DaemonEvent::ListEnd {
            count: rows.len(),
            request_id,
        },
    );
    ControlFlow::Continue(())
}

/// Read JSONL commands from `input` until EOF, quit, or the runtime goes away.
pub fn serve_lines(
    input: impl BufRead,
    commands: &SyncSender<RuntimeCommand>,
    out: &mut dyn Write,
) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Error reading stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        debug!(line = %line, "Received command");
        match parse_command(&line) {
            Ok(command) => {
                if dispatch(command, commands, out).is_break() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, line = %line, "Failed to parse command"),
        }
    }
}

/// Spawn the stdin reader thread.
///
/// The thread exits on EOF or `quit`. Callers that want the daemon to outlive
/// stdin keep their own sender alive.
pub fn start_stdin_listener(commands: SyncSender<RuntimeCommand>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            info!("External command listener started");
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            serve_lines(stdin.lock(), &commands, &mut stdout);
            info!("External command listener exiting");
        })?;
    Ok(())
}

/// Presentation delegate that reports UI events as JSON lines.
pub struct JsonLinesDelegate<W: Write = io::Stdout> {
    out: W,
}

impl JsonLinesDelegate {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> JsonLinesDelegate<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PresentationDelegate for JsonLinesDelegate<W> {
    fn dismiss(&mut self) {
        emit(&mut self.out, &DaemonEvent::Dismiss);
    }

    fn show_remediation(&mut self, notice: &RemediationNotice) {
        emit(
            &mut self.out,
            &DaemonEvent::Remediation {
                privilege: notice.privilege.display_name(),
                message: &notice.message,
                settings_url: notice.settings_url,
            },
        );
    }
}
