// src/errors.rs
// DOCUMENTATION: Custom error types for startup and pool operations
// PURPOSE: Centralized error handling for entire application

use thiserror::Error;

/// Configuration errors raised while resolving and validating settings
/// DOCUMENTATION: All variants are fatal at startup - the process must not
/// continue with a partially-valid configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting was absent or empty in every source
    #[error("{field} is required (set {env_key} or {property_key})")]
    MissingField {
        field: &'static str,
        env_key: &'static str,
        property_key: &'static str,
    },

    /// The properties file exists but could not be read
    #[error("failed to read properties file {path}: {source}")]
    PropertiesIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Connection pool errors
/// DOCUMENTATION: Init is fatal at startup; the rest are caller-visible and
/// identify exactly which precondition or acquisition step failed
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("connection pool not initialized - call Database::initialize first")]
    NotInitialized,

    #[error("connection pool is closed")]
    Closed,

    #[error("failed to initialize connection pool: {0}")]
    Init(#[source] sqlx::Error),

    #[error("timed out waiting for a connection from the pool")]
    AcquireTimeout,

    #[error("failed to acquire connection from pool: {0}")]
    Acquire(#[source] sqlx::Error),
}
