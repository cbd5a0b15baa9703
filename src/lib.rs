pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod normalize;
pub mod storage;
pub mod types;

// Use cases and the ports they depend on
pub mod app;
// Adapters for the seller API and the remote key/value store
pub mod infra;

pub mod observability;
