//! Runtime settings, read from the environment (after `.env` is loaded).

use anyhow::{Context, Result, anyhow};
use std::time::Duration;

use crate::manager::DEFAULT_TEST_DELAY;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_FILE: &str = "logs/api_key_manager.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the `/api/keys` server (`KEYS_API_BASE_URL`).
    pub base_url: String,
    /// Hosted backend project URL (`SUPABASE_URL`).
    pub backend_url: Option<String>,
    /// Hosted backend project key (`SUPABASE_KEY`).
    pub backend_key: Option<String>,
    /// Pause between tests in "test all" (`TEST_ALL_DELAY_MS`).
    pub test_delay: Duration,
    /// Rolling JSON log file (`LOG_FILE_PATH`).
    pub log_file_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let test_delay = match lookup("TEST_ALL_DELAY_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("TEST_ALL_DELAY_MS is not a number: '{raw}'"))?,
            ),
            None => DEFAULT_TEST_DELAY,
        };

        Ok(Self {
            base_url: lookup("KEYS_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            backend_url: lookup("SUPABASE_URL").filter(|v| !v.is_empty()),
            backend_key: lookup("SUPABASE_KEY").filter(|v| !v.is_empty()),
            test_delay,
            log_file_path: lookup("LOG_FILE_PATH").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
        })
    }

    /// Project URL and key, both required for any backend command.
    pub fn backend_credentials(&self) -> Result<(&str, &str)> {
        let url = self
            .backend_url
            .as_deref()
            .ok_or_else(|| anyhow!("SUPABASE_URL must be set"))?;
        let key = self
            .backend_key
            .as_deref()
            .ok_or_else(|| anyhow!("SUPABASE_KEY must be set"))?;
        Ok((url, key))
    }
}
