//! One-shot command surface
//!
//! Parses arguments with clap and maps each command onto a single history
//! or clipboard operation. Results become process exit codes via [`Exit`].

use chrono::Local;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

use crate::core::clipboard::{ClipboardCapability, ClipboardHistory};
use crate::shared::types::HistoryItem;

/// Process exit signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success = 0,
    Failure = 1,
    FileOpen = 2,
    Usage = 3,
    NoText = 4,
    ClipboardUnavailable = 5,
}

impl Exit {
    fn from_ok(ok: bool) -> Self {
        if ok {
            Exit::Success
        } else {
            Exit::Failure
        }
    }

    /// Exit signal for an argument parsing failure
    pub fn for_parse_error(err: &clap::Error) -> Self {
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Exit::Success,
            _ => Exit::Usage,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "cliphist",
    version,
    about = "Clipboard history with pins, undo and numbered slots",
    long_about = "Records copied text into a persistent history. Run without a command to watch the clipboard and open the interactive menu."
)]
pub struct Cli {
    /// Directory holding the history database (overrides settings)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Settings file to use instead of the platform default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level for logging
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List history items with their indices
    #[command(visible_alias = "list")]
    History,
    /// List items containing the query
    Search { query: String },
    /// Pin the item at an index
    Pin { index: usize },
    /// Unpin the item at an index
    Unpin { index: usize },
    /// Delete the item at an index (undoable)
    Delete { index: usize },
    /// Restore the last deleted item
    Undo,
    /// Append text to the history
    Add {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Append a file's content to the history (UTF-8 text only)
    #[command(name = "add-from-file")]
    AddFromFile { path: PathBuf },
    /// Store text in a slot
    #[command(name = "setslot")]
    SetSlot {
        slot: usize,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Store a file's content in a slot and append it to the history (UTF-8 text only)
    #[command(name = "setslot-from-file")]
    SetSlotFromFile { slot: usize, path: PathBuf },
    /// Print a slot's content
    #[command(name = "getslot")]
    GetSlot { slot: usize },
    /// Export the history as JSON
    #[command(name = "export-json")]
    ExportJson { path: Option<PathBuf> },
    /// Store the current clipboard text in a slot and append it to the history
    Copy { slot: usize },
}

/// Everything a one-shot command may touch
pub struct CommandContext<'a> {
    pub history: &'a ClipboardHistory,
    pub clipboard: &'a dyn ClipboardCapability,
    pub default_export_path: PathBuf,
}

/// One listing line: `index: [time] [PINNED] content`
pub fn format_item(index: usize, item: &HistoryItem) -> String {
    format!(
        "{}: [{}] {}{}",
        index,
        format_timestamp(item),
        if item.pinned { "[PINNED] " } else { "" },
        item.content
    )
}

pub fn format_timestamp(item: &HistoryItem) -> String {
    item.timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// File content as text, or the exit signal when it cannot be used
fn read_file(path: &Path, err: &mut dyn Write) -> io::Result<Result<String, Exit>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), "failed to open file: {}", e);
            writeln!(err, "Failed to open file: {}", path.display())?;
            return Ok(Err(Exit::FileOpen));
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Ok(text)),
        Err(e) => {
            debug!(path = %path.display(), "file is not UTF-8: {}", e);
            writeln!(err, "File is not valid UTF-8 text: {}", path.display())?;
            Ok(Err(Exit::Failure))
        }
    }
}

/// Run one command, writing user-facing text to `out` and `err`
pub fn execute(
    command: &Command,
    ctx: &CommandContext<'_>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<Exit> {
    let history = ctx.history;

    let exit = match command {
        Command::History => {
            for (i, item) in history.read_history().iter().enumerate() {
                writeln!(out, "{}", format_item(i, item))?;
            }
            Exit::Success
        }

        Command::Search { query } => {
            for item in history.search(query) {
                writeln!(out, "[{}] {}", format_timestamp(&item), item.content)?;
            }
            Exit::Success
        }

        Command::Pin { index } => {
            let ok = history.pin_item(*index);
            writeln!(out, "{}", if ok { "Item pinned successfully." } else { "Failed to pin item." })?;
            Exit::from_ok(ok)
        }

        Command::Unpin { index } => {
            let ok = history.unpin_item(*index);
            writeln!(out, "{}", if ok { "Item unpinned successfully." } else { "Failed to unpin item." })?;
            Exit::from_ok(ok)
        }

        Command::Delete { index } => {
            let ok = history.delete_item(*index);
            writeln!(out, "{}", if ok { "Item deleted successfully." } else { "Failed to delete item." })?;
            Exit::from_ok(ok)
        }

        Command::Undo => {
            let ok = history.undo_delete();
            writeln!(out, "{}", if ok { "Undo successful." } else { "Nothing to undo." })?;
            Exit::from_ok(ok)
        }

        Command::Add { text } => {
            let text = text.join(" ");
            let ok = history.add_item(&text);
            if ok {
                writeln!(out, "Added: {}", text)?;
            } else {
                writeln!(out, "Failed to add item.")?;
            }
            Exit::from_ok(ok)
        }

        Command::AddFromFile { path } => match read_file(path, err)? {
            Err(exit) => exit,
            Ok(text) => {
                let ok = history.add_item(&text);
                if ok {
                    writeln!(out, "Added content from {}", path.display())?;
                } else {
                    writeln!(out, "Failed to add content.")?;
                }
                Exit::from_ok(ok)
            }
        },

        Command::SetSlot { slot, text } => {
            let text = text.join(" ");
            let ok = history.set_slot(*slot, &text);
            if ok {
                writeln!(out, "Set slot {} to: {}", slot, text)?;
            } else {
                writeln!(out, "Failed to set slot.")?;
            }
            Exit::from_ok(ok)
        }

        Command::SetSlotFromFile { slot, path } => match read_file(path, err)? {
            Err(exit) => exit,
            Ok(text) => {
                let ok = history.add_item_to_slot(*slot, &text);
                if ok {
                    writeln!(out, "Set slot {} from {}", slot, path.display())?;
                } else {
                    writeln!(out, "Failed to set slot.")?;
                }
                Exit::from_ok(ok)
            }
        },

        Command::GetSlot { slot } => match history.get_slot(*slot) {
            Some(content) if !content.is_empty() => {
                writeln!(out, "{}", content)?;
                Exit::Success
            }
            _ => Exit::Failure,
        },

        Command::ExportJson { path } => {
            let path = path.clone().unwrap_or_else(|| ctx.default_export_path.clone());
            let ok = history.export_json(&path);
            if ok {
                writeln!(out, "{}", path.display())?;
            } else {
                writeln!(out, "Failed to export JSON.")?;
            }
            Exit::from_ok(ok)
        }

        Command::Copy { slot } => match ctx.clipboard.read_text() {
            Ok(Some(text)) => Exit::from_ok(history.add_item_to_slot(*slot, &text)),
            Ok(None) => Exit::NoText,
            Err(e) => {
                writeln!(err, "{}", e)?;
                Exit::ClipboardUnavailable
            }
        },
    };

    Ok(exit)
}
