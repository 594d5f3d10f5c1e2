//! Service catalogue and the key-store abstraction the controller talks to.

pub mod catalog;
pub mod keys_api;

pub use catalog::{KNOWN_SERVICES, display_name};
pub use keys_api::{Credential, KeyDetail, KeyMap, KeysApi, ServiceInfo, TestOutcome};
