//! Connectivity smoke test for the hosted backend.
//!
//! Two checks run in order; registration is only attempted once the
//! connectivity check has passed. Outcomes go to the log.

use serde_json::Value;
use tracing::{error, info};

use crate::backend::{BackendClient, Table};
use crate::fetch::HttpClient;

pub const DEFAULT_TEST_EMAIL: &str = "test@example.com";
pub const DEFAULT_TEST_PASSWORD: &str = "testpassword123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmokeReport {
    pub connected: bool,
    /// `None` when registration was skipped.
    pub registered: Option<bool>,
}

impl SmokeReport {
    pub fn passed(&self) -> bool {
        self.connected && self.registered == Some(true)
    }
}

/// Reads one row's count from `api_keys`.
#[tracing::instrument(skip_all)]
pub async fn test_connection<C: HttpClient>(backend: &BackendClient<C>) -> bool {
    info!("Testing backend connection");
    match backend
        .from(Table::ApiKeys)
        .limit(1)
        .select::<Value>("count")
        .await
    {
        Ok(_) => {
            info!("Backend connection OK");
            true
        }
        Err(e) => {
            error!(error = %e, "Backend connection failed");
            false
        }
    }
}

#[tracing::instrument(skip(backend, password))]
pub async fn test_registration<C: HttpClient>(
    backend: &BackendClient<C>,
    email: &str,
    password: &str,
) -> bool {
    info!("Testing user registration");
    match backend.users().sign_up(email, password).await {
        Ok(_) => {
            info!("Registration OK");
            true
        }
        Err(e) => {
            error!(error = %e, "Registration failed");
            false
        }
    }
}

pub async fn run<C: HttpClient>(
    backend: &BackendClient<C>,
    email: &str,
    password: &str,
) -> SmokeReport {
    let connected = test_connection(backend).await;
    let registered = if connected {
        Some(test_registration(backend, email, password).await)
    } else {
        None
    };
    SmokeReport {
        connected,
        registered,
    }
}
