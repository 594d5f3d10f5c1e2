mod client;

pub use client::{HealthStatus, RestKeysClient};
