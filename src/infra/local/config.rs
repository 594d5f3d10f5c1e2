use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Template offered to users who want to write the config by hand.
pub const CONFIG_TEMPLATE: &str = r#"{
  "api_keys": {
    "openai": "sk-...",
    "anthropic": "sk-ant-...",
    "news_api": "your_news_api_key",
    "weather_api": "your_weather_api_key",
    "feishu": "your_feishu_webhook_url"
  },
  "endpoints": {
    "openai": "https://api.openai.com/v1",
    "anthropic": "https://api.anthropic.com",
    "news_api": "https://newsapi.org/v2",
    "weather_api": "https://api.openweathermap.org/data/2.5"
  },
  "rates": {
    "openai": {
      "rpm": 60,
      "tpm": 90000
    },
    "anthropic": {
      "rpm": 60,
      "tpm": 90000
    }
  }
}
"#;

/// The key config file:
/// ```json
/// {
///   "api_keys": { "openai": "sk-..." },
///   "endpoints": { "openai": "https://api.openai.com/v1" },
///   "rates": { "openai": { "rpm": 60, "tpm": 90000 } }
/// }
/// ```
/// Only `api_keys` is interpreted; the other sections are carried through
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyConfig {
    #[serde(default)]
    pub api_keys: BTreeMap<String, String>,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
    #[serde(default)]
    pub rates: BTreeMap<String, serde_json::Value>,
}

impl KeyConfig {
    /// Loads the config at `path`, writing an empty default first if the file
    /// does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Key config missing, writing default");
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read key config '{}'", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse key config '{}'", path.display()))
    }

    /// Writes the config as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write key config '{}'", path.display()))
    }
}
