//! Terminal front end: where notifications, prompts and the clipboard go
//! when the controller runs from the command line.

use anyhow::Result;
use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

use crate::manager::{Clipboard, Confirm, Level, Notification, Notifier};

/// Writes each notification to stderr as `<Title>: <message>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Error | Level::Warning => warn!(text = %notification.message, "notification"),
            Level::Success | Level::Info => debug!(text = %notification.message, "notification"),
        }
        eprintln!("{notification}");
    }
}

/// Asks on stdin; anything but `y`/`yes` declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// The desktop clipboard.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text.to_string())?;
        Ok(())
    }
}

/// Prints `value` to stdout as pretty JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    info!(bytes = json.len(), "Writing JSON output");
    println!("{json}");
    Ok(())
}
