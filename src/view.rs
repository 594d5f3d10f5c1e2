//! Declarative view of the key list.
//!
//! [`KeyListView::render`] turns a [`KeyMap`] into rows; each row carries the
//! [`ViewAction`]s it offers, which the front end hands back to
//! [`KeyManager::dispatch`](crate::manager::KeyManager::dispatch).

use std::fmt;

use crate::services::catalog::display_name;
use crate::services::keys_api::KeyMap;

/// Masks a key for display: `***` when empty, one `*` per character up to
/// ten characters, otherwise the first six and last four characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return "***".to_string();
    }
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// How key values are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyDisplay {
    #[default]
    Plain,
    Masked,
}

/// An action a row exposes to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    Test(String),
    Delete(String),
}

impl ViewAction {
    pub fn label(&self) -> &'static str {
        match self {
            ViewAction::Test(_) => "test",
            ViewAction::Delete(_) => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRow {
    pub service: String,
    pub label: String,
    pub key: String,
    pub actions: Vec<ViewAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyListView {
    Empty,
    Rows(Vec<KeyRow>),
}

impl KeyListView {
    /// Builds the whole list from scratch; there is no incremental update.
    pub fn render(keys: &KeyMap, display: KeyDisplay) -> Self {
        if keys.is_empty() {
            return KeyListView::Empty;
        }

        let rows = keys
            .iter()
            .map(|(service, key)| KeyRow {
                service: service.clone(),
                label: display_name(service).to_string(),
                key: match display {
                    KeyDisplay::Plain => key.clone(),
                    KeyDisplay::Masked => mask_key(key),
                },
                actions: vec![
                    ViewAction::Test(service.clone()),
                    ViewAction::Delete(service.clone()),
                ],
            })
            .collect();
        KeyListView::Rows(rows)
    }

    pub fn rows(&self) -> &[KeyRow] {
        match self {
            KeyListView::Empty => &[],
            KeyListView::Rows(rows) => rows,
        }
    }
}

impl fmt::Display for KeyListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = match self {
            KeyListView::Empty => return writeln!(f, "No API keys stored"),
            KeyListView::Rows(rows) => rows,
        };

        let label_width = rows.iter().map(|r| r.label.len()).max().unwrap_or(0);
        let key_width = rows.iter().map(|r| r.key.len()).max().unwrap_or(0);
        for row in rows {
            let actions: Vec<&str> = row.actions.iter().map(ViewAction::label).collect();
            writeln!(
                f,
                "{:<label_width$}  {:<key_width$}  [{}]",
                row.label,
                row.key,
                actions.join("] [")
            )?;
        }
        Ok(())
    }
}
