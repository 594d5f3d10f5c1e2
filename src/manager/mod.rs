//! Key manager controller.
//!
//! [`KeyManager`] performs one store call per user action, reloads the whole
//! list after every mutation and reports every outcome as a
//! [`Notification`]. It owns no key state itself: the composition root keeps
//! an [`AppState`] and passes it into each action.

pub mod form;
pub mod notify;

pub use form::{FormError, KeyForm, ServiceSelection};
pub use notify::{AutoConfirm, Clipboard, Confirm, Level, Notification, Notifier};

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::services::catalog::display_name;
use crate::services::keys_api::{KeyMap, KeysApi};
use crate::view::{KeyDisplay, KeyListView, ViewAction};

/// Pause between consecutive calls in [`KeyManager::test_all_keys`].
pub const DEFAULT_TEST_DELAY: Duration = Duration::from_millis(500);

/// Last-fetched keys and the view rendered from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub keys: KeyMap,
    pub view: KeyListView,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            keys: KeyMap::new(),
            view: KeyListView::Empty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// The store call failed; state is unchanged.
    Failed,
    /// Local validation refused the action; nothing was sent.
    Rejected,
    /// The user declined the confirmation prompt.
    Cancelled,
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed)
    }
}

pub struct KeyManager<A, N> {
    api: A,
    notifier: N,
    test_delay: Duration,
    display: KeyDisplay,
}

impl<A: KeysApi, N: Notifier> KeyManager<A, N> {
    pub fn new(api: A, notifier: N) -> Self {
        Self {
            api,
            notifier,
            test_delay: DEFAULT_TEST_DELAY,
            display: KeyDisplay::Plain,
        }
    }

    pub fn with_test_delay(mut self, delay: Duration) -> Self {
        self.test_delay = delay;
        self
    }

    pub fn with_display(mut self, display: KeyDisplay) -> Self {
        self.display = display;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn notify(&self, level: Level, message: impl Into<String>) {
        self.notifier.notify(Notification::new(level, message));
    }

    /// Replaces `state` with the store's current keys and re-renders.
    #[tracing::instrument(skip_all)]
    pub async fn load_keys(&self, state: &mut AppState) -> ActionOutcome {
        match self.api.list_keys().await {
            Ok(keys) => {
                info!(count = keys.len(), "Keys loaded");
                state.view = KeyListView::render(&keys, self.display);
                state.keys = keys;
                self.notify(Level::Success, "Key list refreshed");
                ActionOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "Loading keys failed");
                self.notify(Level::Error, format!("Failed to load keys: {e}"));
                ActionOutcome::Failed
            }
        }
    }

    /// Saves the form's key. The form is cleared only when the store accepts
    /// it.
    #[tracing::instrument(skip_all)]
    pub async fn save_key(&self, state: &mut AppState, form: &mut KeyForm) -> ActionOutcome {
        let credential = match form.resolve() {
            Ok(credential) => credential,
            Err(e) => {
                debug!(error = %e, "Save rejected by form validation");
                self.notify(Level::Error, e.to_string());
                return ActionOutcome::Rejected;
            }
        };

        if let Err(e) = self.api.save_key(&credential).await {
            warn!(service = %credential.service, error = %e, "Saving key failed");
            self.notify(Level::Error, format!("Failed to save key: {e}"));
            return ActionOutcome::Failed;
        }

        info!(service = %credential.service, "Key saved");
        self.notify(Level::Success, "Key saved");
        self.clear_form(form);
        self.load_keys(state).await;
        ActionOutcome::Completed
    }

    /// Deletes `service` after confirmation.
    #[tracing::instrument(skip(self, state, confirm))]
    pub async fn delete_key(
        &self,
        state: &mut AppState,
        service: &str,
        confirm: &mut dyn Confirm,
    ) -> ActionOutcome {
        let prompt = format!("Delete the key for {}?", display_name(service));
        if !confirm.confirm(&prompt) {
            debug!("Delete cancelled");
            return ActionOutcome::Cancelled;
        }

        if let Err(e) = self.api.delete_key(service).await {
            warn!(error = %e, "Deleting key failed");
            self.notify(Level::Error, format!("Failed to delete key: {e}"));
            return ActionOutcome::Failed;
        }

        info!("Key deleted");
        self.notify(Level::Success, "Key deleted");
        self.load_keys(state).await;
        ActionOutcome::Completed
    }

    /// Asks the store to test `service`. Returns `true` only for a
    /// `"success"` status.
    #[tracing::instrument(skip(self))]
    pub async fn test_key(&self, service: &str) -> bool {
        let label = display_name(service);
        match self.api.test_key(service).await {
            Ok(outcome) if outcome.is_success() => {
                info!("Key test passed");
                self.notify(Level::Success, format!("{label} key test succeeded"));
                true
            }
            Ok(outcome) => {
                info!(status = %outcome.status, "Key test did not pass");
                self.notify(Level::Error, format!("{label} key test failed"));
                false
            }
            Err(e) => {
                warn!(error = %e, "Key test request failed");
                self.notify(Level::Error, format!("Key test failed for {label}: {e}"));
                false
            }
        }
    }

    /// Tests every key in `state`, one at a time and in map order, pausing
    /// between consecutive calls.
    #[tracing::instrument(skip_all, fields(count = state.keys.len()))]
    pub async fn test_all_keys(&self, state: &AppState) -> Vec<(String, bool)> {
        if state.keys.is_empty() {
            self.notify(Level::Info, "No keys to test");
            return Vec::new();
        }

        self.notify(Level::Info, "Testing all keys...");

        let mut results = Vec::with_capacity(state.keys.len());
        for (i, service) in state.keys.keys().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.test_delay).await;
            }
            let passed = self.test_key(service).await;
            results.push((service.clone(), passed));
        }

        let passed = results.iter().filter(|(_, ok)| *ok).count();
        info!(passed, total = results.len(), "Finished testing all keys");
        results
    }

    /// Fetches the config template for display.
    #[tracing::instrument(skip_all)]
    pub async fn show_config_template(&self) -> Option<String> {
        match self.api.config_template().await {
            Ok(template) => Some(template),
            Err(e) => {
                warn!(error = %e, "Fetching config template failed");
                self.notify(Level::Error, format!("Failed to fetch config template: {e}"));
                None
            }
        }
    }

    /// Pushes `template` to the clipboard.
    pub fn copy_config(&self, template: &str, clipboard: &mut dyn Clipboard) -> ActionOutcome {
        match clipboard.set_text(template) {
            Ok(()) => {
                self.notify(Level::Success, "Config template copied to clipboard");
                ActionOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "Clipboard write failed");
                self.notify(Level::Error, "Copy failed, please copy the template manually");
                ActionOutcome::Failed
            }
        }
    }

    pub fn clear_form(&self, form: &mut KeyForm) {
        form.clear();
    }

    /// Runs an action offered by a rendered row.
    pub async fn dispatch(
        &self,
        state: &mut AppState,
        action: &ViewAction,
        confirm: &mut dyn Confirm,
    ) -> ActionOutcome {
        match action {
            ViewAction::Test(service) => {
                if self.test_key(service).await {
                    ActionOutcome::Completed
                } else {
                    ActionOutcome::Failed
                }
            }
            ViewAction::Delete(service) => self.delete_key(state, service, confirm).await,
        }
    }
}
