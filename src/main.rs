use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use clipkeep::clipboard_history::{HistoryStore, JsonFileStorage};
use clipkeep::config::{self, Config};
use clipkeep::logging;
use clipkeep::runtime::{EntryView, Runtime};
use clipkeep::stdin_commands::{self, JsonLinesDelegate, COMMAND_CHANNEL_CAPACITY};

#[derive(Debug, Parser)]
#[command(
    name = "clipkeep",
    version,
    about = "Clipboard history with pinning, retention and paste-back"
)]
struct Cli {
    /// Config file (defaults to <config_dir>/clipkeep/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// History file, overriding the config
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch the clipboard and serve JSONL commands on stdin (default)
    Daemon,
    /// Print the stored history
    List {
        /// Case-insensitive substring filter
        #[arg(long, short)]
        query: Option<String>,
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Print the config, history and log file locations
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    let overrides = Config {
        history_path: cli
            .history
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        ..Config::default()
    };
    let config = config::load_config(cli.config.as_deref()).merged_with(overrides);

    match cli.command.unwrap_or(Command::Daemon) {
        Command::Daemon => run_daemon(&config),
        Command::List { query, json } => list(&config, query.as_deref().unwrap_or(""), json),
        Command::Path => {
            println!("config:  {}", cli.config.unwrap_or_else(config::default_config_path).display());
            let storage = JsonFileStorage::read_only(history_path(&config), config.get_retention());
            println!("history: {} ({} bytes)", storage.path().display(), storage.file_size());
            println!("log:     {}", logging::log_path().display());
            Ok(())
        }
    }
}

fn history_path(config: &Config) -> PathBuf {
    config
        .get_history_path()
        .unwrap_or_else(JsonFileStorage::default_path)
}

fn run_daemon(config: &Config) -> Result<()> {
    info!(event_type = "app_start", version = env!("CARGO_PKG_VERSION"), "clipkeep starting");

    let runtime = Runtime::from_config(config, Box::new(JsonLinesDelegate::stdout()))?;

    // The daemon keeps running after stdin closes; only `quit` or a signal stops it
    let (commands, receiver) = mpsc::sync_channel(COMMAND_CHANNEL_CAPACITY);
    stdin_commands::start_stdin_listener(commands.clone())
        .context("Failed to start stdin command listener")?;

    runtime.run(receiver);
    drop(commands);
    Ok(())
}

fn list(config: &Config, query: &str, json: bool) -> Result<()> {
    let retention = config.get_retention();
    // The daemon owns the file; listing must not rewrite it
    let storage = JsonFileStorage::read_only(history_path(config), retention);
    let store = HistoryStore::open(Box::new(storage), retention);

    let now = Utc::now();
    for entry in store.search(query) {
        if json {
            let line = serde_json::to_string(&EntryView::from_entry(entry, now))
                .context("Failed to serialize entry")?;
            println!("{}", line);
        } else {
            let pin = if entry.pinned { "*" } else { " " };
            let preview: String = entry
                .content
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(80)
                .collect();
            println!(
                "{} {:<8} {:<9} {}  {}",
                pin,
                entry.relative_time_label(now),
                entry.content_type().as_str(),
                preview,
                entry.id
            );
        }
    }
    Ok(())
}
