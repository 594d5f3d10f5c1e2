//! Wrapper around the hosted backend (auth, table CRUD, realtime).
//!
//! Every call returns a [`BackendResult`]; failures are values for the caller
//! to inspect and are never logged or retried here.

mod auth;
mod client;
mod error;
mod query;
pub mod realtime;
pub mod records;
pub mod services;
mod tables;

pub use auth::{AuthData, Session, User};
pub use client::BackendClient;
pub use error::{BackendError, BackendResult};
pub use query::{Order, Query};
pub use realtime::{ChangeEvent, ChangeFilter, ChangeKind, RealtimeClient, Subscription};
pub use tables::Table;
