//! Trait and types for a store of per-service API keys.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Service name → key. Iteration order is the order used for rendering and
/// for "test all".
pub type KeyMap = BTreeMap<String, String>;

/// A single `{service, key}` pair as sent by a save call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub service: String,
    pub key: String,
}

/// Result of a key test. The store reports a status string; only `"success"`
/// counts as a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl TestOutcome {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    pub fn failure() -> Self {
        Self {
            status: "failure".to_string(),
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// One key as reported by a single-key lookup (the key is usually masked).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDetail {
    pub service: String,
    pub key: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// A supported service as advertised by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub description: String,
}

/// Abstraction over a key store (the `/api/keys` REST surface or a local
/// config file).
#[async_trait::async_trait]
pub trait KeysApi: Send + Sync {
    /// Returns every stored key.
    async fn list_keys(&self) -> Result<KeyMap>;

    /// Creates or overwrites the key for `credential.service`.
    async fn save_key(&self, credential: &Credential) -> Result<()>;

    /// Removes the key for `service`.
    async fn delete_key(&self, service: &str) -> Result<()>;

    /// Asks the store whether the key for `service` works.
    async fn test_key(&self, service: &str) -> Result<TestOutcome>;

    /// Returns the configuration template text.
    async fn config_template(&self) -> Result<String>;

    /// Returns a single key, masked by the store.
    async fn get_key(&self, service: &str) -> Result<KeyDetail>;

    /// Lists the services the store knows how to handle.
    async fn list_services(&self) -> Result<Vec<ServiceInfo>>;
}
