//! Concrete [`KeysApi`](crate::services::KeysApi) implementations.

pub mod local;
pub mod rest;
