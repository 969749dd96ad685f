// src/lib.rs
// DOCUMENTATION: Library surface for the bootstrap layer
// PURPOSE: Expose configuration resolution and pool management to the binary
// and to integration tests

pub mod config;
pub mod db;
pub mod errors;

pub use config::{AppSettings, ConfigResolver, Environment};
pub use db::{Database, PoolManager, PoolStats};
pub use errors::{ConfigError, PoolError};
