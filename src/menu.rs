//! Interactive menu
//!
//! A line-oriented loop over the same history operations as the one-shot
//! commands, plus recall into the clipboard and pausing the monitor.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::commands::{format_item, format_timestamp};
use crate::core::clipboard::{ClipboardHistory, ClipboardMonitor};
use crate::shared::types::HistoryItem;

/// Callback the monitor feeds with new clipboard text
pub type ChangeCallback = Arc<dyn Fn(String) + Send + Sync>;

const HELP: &str = "\
Commands:
  list                 show history
  search <text>        show items containing text
  pin <i> | unpin <i>  toggle pin on item i
  delete <i>           delete item i
  undo                 restore the last deleted item
  add <text>           append text
  recall <i>           copy item i back to the clipboard
  setslot <n> <text>   store text in slot n
  getslot <n>          show slot n
  useslot <n>          copy slot n to the clipboard
  export [path]        export history as JSON
  clear                delete all unpinned items
  pause | resume       stop or restart clipboard watching
  help                 show this help
  quit                 leave";

pub struct Menu {
    history: ClipboardHistory,
    monitor: Arc<ClipboardMonitor>,
    on_change: ChangeCallback,
    export_path: PathBuf,
}

impl Menu {
    pub fn new(
        history: ClipboardHistory,
        monitor: Arc<ClipboardMonitor>,
        on_change: ChangeCallback,
        export_path: PathBuf,
    ) -> Self {
        Self {
            history,
            monitor,
            on_change,
            export_path,
        }
    }

    /// Read commands from `input` until `quit` or end of input
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut out: W) -> io::Result<()> {
        writeln!(out, "Clipboard history - type 'help' for commands.")?;
        write!(out, "> ")?;
        out.flush()?;

        for line in input.lines() {
            let line = line?;
            if !self.handle(line.trim(), &mut out)? {
                break;
            }
            write!(out, "> ")?;
            out.flush()?;
        }
        writeln!(out)?;
        Ok(())
    }

    /// Handle one command line; false means leave the menu
    fn handle<W: Write>(&self, line: &str, out: &mut W) -> io::Result<bool> {
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match cmd {
            "" => {}
            "quit" | "exit" | "q" => return Ok(false),
            "help" | "?" => writeln!(out, "{}", HELP)?,

            "list" | "l" | "history" => {
                let items = self.history.read_history();
                if items.is_empty() {
                    writeln!(out, "History is empty.")?;
                }
                for (i, item) in items.iter().enumerate() {
                    writeln!(out, "{}", format_item(i, &item_preview(item)))?;
                }
            }

            "search" => {
                for item in self.history.search(rest) {
                    writeln!(out, "[{}] {}", format_timestamp(&item), item.content)?;
                }
            }

            "pin" | "unpin" | "delete" | "recall" => {
                let Some(index) = parse_number(rest, out)? else {
                    return Ok(true);
                };
                match cmd {
                    "pin" => report(out, self.history.pin_item(index), "Item pinned.", "Failed to pin item.")?,
                    "unpin" => report(out, self.history.unpin_item(index), "Item unpinned.", "Failed to unpin item.")?,
                    "delete" => report(out, self.history.delete_item(index), "Item deleted.", "Failed to delete item.")?,
                    _ => match self.history.item(index) {
                        Some(item) => self.copy_to_clipboard(&item.content, out)?,
                        None => writeln!(out, "No item at index {}.", index)?,
                    },
                }
            }

            "undo" => report(out, self.history.undo_delete(), "Undo successful.", "Nothing to undo.")?,

            "add" => {
                if rest.is_empty() {
                    writeln!(out, "Usage: add <text>")?;
                } else {
                    report(out, self.history.add_item(rest), "Added.", "Failed to add item.")?;
                }
            }

            "setslot" => {
                let (slot, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let Some(slot) = parse_number(slot, out)? else {
                    return Ok(true);
                };
                report(out, self.history.set_slot(slot, text.trim()), "Slot set.", "Failed to set slot.")?;
            }

            "getslot" | "useslot" => {
                let Some(slot) = parse_number(rest, out)? else {
                    return Ok(true);
                };
                match self.history.get_slot(slot) {
                    Some(content) if !content.is_empty() => {
                        if cmd == "getslot" {
                            writeln!(out, "{}", content)?;
                        } else {
                            self.copy_to_clipboard(&content, out)?;
                        }
                    }
                    _ => writeln!(out, "Slot {} is empty.", slot)?,
                }
            }

            "export" => {
                let path = if rest.is_empty() {
                    self.export_path.clone()
                } else {
                    PathBuf::from(rest)
                };
                if self.history.export_json(&path) {
                    writeln!(out, "Exported to {}", path.display())?;
                } else {
                    writeln!(out, "Failed to export JSON.")?;
                }
            }

            "clear" => report(out, self.history.clear(true), "Cleared unpinned items.", "Failed to clear history.")?,

            "pause" => {
                self.monitor.stop();
                writeln!(out, "Clipboard watching paused.")?;
            }

            "resume" => {
                let on_change = Arc::clone(&self.on_change);
                if self.monitor.start(move |text| on_change(text)) {
                    writeln!(out, "Clipboard watching resumed.")?;
                } else {
                    writeln!(out, "Clipboard watching is already running.")?;
                }
            }

            other => writeln!(out, "Unknown command: {} (type 'help')", other)?,
        }

        Ok(true)
    }

    fn copy_to_clipboard<W: Write>(&self, text: &str, out: &mut W) -> io::Result<()> {
        // Through the monitor so our own write does not come back as a new entry
        match self.monitor.write_observed(text) {
            Ok(()) => writeln!(out, "Copied to clipboard."),
            Err(e) => {
                warn!("clipboard write failed: {}", e);
                writeln!(out, "Failed to copy to clipboard.")
            }
        }
    }
}

/// Listings in the menu show a single-line preview
fn item_preview(item: &HistoryItem) -> HistoryItem {
    let mut shown = item.clone();
    shown.content = item.preview(80);
    shown
}

fn parse_number<W: Write>(arg: &str, out: &mut W) -> io::Result<Option<usize>> {
    match arg.trim().parse() {
        Ok(n) => Ok(Some(n)),
        Err(_) => {
            writeln!(out, "Expected a number, got '{}'.", arg.trim())?;
            Ok(None)
        }
    }
}

fn report<W: Write>(out: &mut W, ok: bool, success: &str, failure: &str) -> io::Result<()> {
    writeln!(out, "{}", if ok { success } else { failure })
}
