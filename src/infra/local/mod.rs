//! Key store backed by a JSON config file on disk.
//!
//! [`KeyConfig`] is the on-disk document, [`LocalKeyStore`] serves it through
//! [`KeysApi`](crate::services::KeysApi) so the controller can run without a
//! server.

mod config;
mod store;

pub use config::{CONFIG_TEMPLATE, KeyConfig};
pub use store::LocalKeyStore;
