pub mod backend;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod manager;
pub mod output;
pub mod services;
pub mod smoke;
pub mod view;
