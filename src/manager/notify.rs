//! Front-end seams: notifications, confirmation prompts and the clipboard.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Info,
    Warning,
}

impl Level {
    pub fn title(&self) -> &'static str {
        match self {
            Level::Success => "Success",
            Level::Error => "Error",
            Level::Info => "Info",
            Level::Warning => "Warning",
        }
    }
}

/// A transient message reporting the outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level.title(), self.message)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Always answers the same way; used for `--yes` and in tests.
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()>;
}
