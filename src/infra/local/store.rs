use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::config::{CONFIG_TEMPLATE, KeyConfig};
use crate::services::catalog::KNOWN_SERVICES;
use crate::services::keys_api::{
    Credential, KeyDetail, KeyMap, KeysApi, ServiceInfo, TestOutcome,
};
use crate::view::mask_key;

const ENV_SUFFIX: &str = "_API_KEY";

type EnvSource = Box<dyn Fn() -> Vec<(String, String)> + Send + Sync>;

/// [`KeysApi`] over a [`KeyConfig`] file.
///
/// A non-empty `<SERVICE>_API_KEY` environment variable takes precedence over
/// the stored key for that service, and services present only in the
/// environment are listed too. Every mutation is written back immediately;
/// a failed write leaves the store as it was.
pub struct LocalKeyStore {
    path: PathBuf,
    config: Mutex<KeyConfig>,
    env: EnvSource,
}

impl LocalKeyStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = KeyConfig::load_or_create(&path)?;
        info!(path = %path.display(), keys = config.api_keys.len(), "Opened local key store");
        Ok(Self {
            path,
            config: Mutex::new(config),
            env: Box::new(|| std::env::vars().collect()),
        })
    }

    /// Replaces the source of environment variables used for key overrides.
    pub fn with_env(
        mut self,
        env: impl Fn() -> Vec<(String, String)> + Send + Sync + 'static,
    ) -> Self {
        self.env = Box::new(env);
        self
    }

    fn env_var_name(service: &str) -> String {
        format!("{}{ENV_SUFFIX}", service.to_uppercase())
    }

    /// Non-empty `*_API_KEY` variables, keyed by lowercased service name.
    fn env_keys(&self) -> KeyMap {
        (self.env)()
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .filter_map(|(name, value)| {
                let service = name.strip_suffix(ENV_SUFFIX)?;
                (!service.is_empty()).then(|| (service.to_lowercase(), value))
            })
            .collect()
    }

    fn env_key(&self, service: &str) -> Option<String> {
        let name = Self::env_var_name(service);
        (self.env)()
            .into_iter()
            .find(|(var, value)| *var == name && !value.is_empty())
            .map(|(_, value)| value)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, KeyConfig>> {
        self.config
            .lock()
            .map_err(|_| anyhow!("local key store lock poisoned"))
    }

    fn lookup(&self, service: &str) -> Result<Option<String>> {
        if let Some(value) = self.env_key(service) {
            return Ok(Some(value));
        }
        Ok(self
            .lock()?
            .api_keys
            .get(service)
            .filter(|key| !key.is_empty())
            .cloned())
    }

    /// Applies `change` to a copy of the config and keeps it only once the
    /// file write succeeds.
    fn commit(&self, change: impl FnOnce(&mut KeyConfig) -> Result<()>) -> Result<()> {
        let mut config = self.lock()?;
        let mut next = config.clone();
        change(&mut next)?;
        next.save(&self.path)?;
        *config = next;
        Ok(())
    }
}

#[async_trait]
impl KeysApi for LocalKeyStore {
    async fn list_keys(&self) -> Result<KeyMap> {
        let mut keys = self.lock()?.api_keys.clone();
        keys.extend(self.env_keys());
        Ok(keys)
    }

    async fn save_key(&self, credential: &Credential) -> Result<()> {
        self.commit(|config| {
            config
                .api_keys
                .insert(credential.service.clone(), credential.key.clone());
            Ok(())
        })?;
        debug!(service = %credential.service, "Key stored");
        Ok(())
    }

    async fn delete_key(&self, service: &str) -> Result<()> {
        self.commit(|config| match config.api_keys.remove(service) {
            Some(_) => Ok(()),
            None => Err(anyhow!("Key not found: {service}")),
        })?;
        debug!(service, "Key removed");
        Ok(())
    }

    async fn test_key(&self, service: &str) -> Result<TestOutcome> {
        // Only presence is checked; no call is made to the provider.
        Ok(match self.lookup(service)? {
            Some(_) => TestOutcome::success(),
            None => TestOutcome::failure(),
        })
    }

    async fn config_template(&self) -> Result<String> {
        Ok(CONFIG_TEMPLATE.to_string())
    }

    async fn get_key(&self, service: &str) -> Result<KeyDetail> {
        let key = self
            .lookup(service)?
            .ok_or_else(|| anyhow!("Key not found: {service}"))?;
        Ok(KeyDetail {
            service: service.to_string(),
            key: mask_key(&key),
            status: Some("active".to_string()),
        })
    }

    async fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        Ok(KNOWN_SERVICES
            .iter()
            .map(|(name, _, description)| ServiceInfo {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect())
    }
}
