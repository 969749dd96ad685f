// src/config/settings.rs
// DOCUMENTATION: Validated application settings
// PURPOSE: Resolve all settings once at startup into an immutable snapshot

use std::fmt;
use std::str::FromStr;

use crate::config::resolver::{mask_sensitive, ConfigResolver};
use crate::errors::ConfigError;

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_APP_NAME: &str = "SkyrimGrade";
const DEFAULT_APP_VERSION: &str = "1.0.0";
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_LOGGING_LEVEL: &str = "INFO";
const DEFAULT_LOGGING_FILE_PATH: &str = "logs/application.log";

/// Deployment environment tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Other,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(match tag.to_lowercase().as_str() {
            "development" => Environment::Development,
            "production" => Environment::Production,
            _ => Environment::Other,
        })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
            Environment::Other => write!(f, "other"),
        }
    }
}

/// Application configuration snapshot
/// DOCUMENTATION: Centralizes all configuration in one struct.
/// Load with AppSettings::load() at application startup; never mutated after.
#[derive(Clone)]
pub struct AppSettings {
    /// Database connection string
    pub database_url: String,

    /// Database username
    pub database_username: String,

    /// Database password (masked in all diagnostic output)
    pub database_password: String,

    /// Maximum connections in the database pool
    pub database_pool_size: u32,

    /// Timeout waiting for a connection from the pool, in milliseconds
    pub database_connection_timeout_ms: u64,

    /// Server bind address (e.g. "0.0.0.0")
    pub server_host: String,

    /// Server listen port
    pub server_port: u16,

    /// Application name
    pub app_name: String,

    /// Application version
    pub app_version: String,

    /// Environment: development, production, other
    pub environment: Environment,

    /// Log level: DEBUG, INFO, WARN, ERROR
    pub logging_level: String,

    /// Log file path
    pub logging_file_path: String,
}

impl AppSettings {
    /// Resolve settings through the default source chain
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_resolver(&ConfigResolver::load()?)
    }

    /// Resolve settings from an explicit resolver.
    /// Fails if the database url, username, or password is absent or empty in
    /// every source.
    pub fn from_resolver(resolver: &ConfigResolver) -> Result<Self, ConfigError> {
        let database_url = require(
            resolver.get("DB_URL", "db.url"),
            "Database URL",
            "DB_URL",
            "db.url",
        )?;
        let database_username = require(
            resolver.get("DB_USERNAME", "db.username"),
            "Database username",
            "DB_USERNAME",
            "db.username",
        )?;
        let database_password = require(
            resolver.get("DB_PASSWORD", "db.password"),
            "Database password",
            "DB_PASSWORD",
            "db.password",
        )?;

        let mut database_pool_size =
            resolver.get_int("DB_POOL_SIZE", "db.pool.size", DEFAULT_POOL_SIZE);
        if database_pool_size == 0 {
            log::error!(
                "Pool size must be positive, using default {}",
                DEFAULT_POOL_SIZE
            );
            database_pool_size = DEFAULT_POOL_SIZE;
        }

        let mut database_connection_timeout_ms = resolver.get_int(
            "DB_CONNECTION_TIMEOUT",
            "db.connection.timeout",
            DEFAULT_CONNECTION_TIMEOUT_MS,
        );
        if database_connection_timeout_ms == 0 {
            log::error!(
                "Connection timeout must be positive, using default {}",
                DEFAULT_CONNECTION_TIMEOUT_MS
            );
            database_connection_timeout_ms = DEFAULT_CONNECTION_TIMEOUT_MS;
        }

        let environment = resolver
            .get_or("APP_ENVIRONMENT", "app.environment", DEFAULT_ENVIRONMENT)
            .parse()
            .unwrap_or(Environment::Other);

        Ok(Self {
            database_url,
            database_username,
            database_password,
            database_pool_size,
            database_connection_timeout_ms,
            server_host: resolver.get_or("SERVER_HOST", "server.host", DEFAULT_SERVER_HOST),
            server_port: resolver.get_int("SERVER_PORT", "server.port", DEFAULT_SERVER_PORT),
            app_name: resolver.get_or("APP_NAME", "app.name", DEFAULT_APP_NAME),
            app_version: resolver.get_or("APP_VERSION", "app.version", DEFAULT_APP_VERSION),
            environment,
            logging_level: resolver.get_or("LOGGING_LEVEL", "logging.level", DEFAULT_LOGGING_LEVEL),
            logging_file_path: resolver.get_or(
                "LOGGING_FILE_PATH",
                "logging.file.path",
                DEFAULT_LOGGING_FILE_PATH,
            ),
        })
    }
}

fn require(
    value: Option<String>,
    field: &'static str,
    env_key: &'static str,
    property_key: &'static str,
) -> Result<String, ConfigError> {
    value.ok_or(ConfigError::MissingField {
        field,
        env_key,
        property_key,
    })
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSettings")
            .field("database_url", &self.database_url)
            .field("database_username", &self.database_username)
            .field(
                "database_password",
                &mask_sensitive("password", &self.database_password),
            )
            .field("database_pool_size", &self.database_pool_size)
            .field(
                "database_connection_timeout_ms",
                &self.database_connection_timeout_ms,
            )
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("app_name", &self.app_name)
            .field("app_version", &self.app_version)
            .field("environment", &self.environment)
            .field("logging_level", &self.logging_level)
            .field("logging_file_path", &self.logging_file_path)
            .finish()
    }
}
