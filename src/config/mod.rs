//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `LESSON_LEDGER` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use lesson_ledger::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Reconciling every {:?}", config.ledger.reconcile_interval());
//! ```

mod database;
mod error;
mod ledger;
mod telemetry;

pub use database::{DatabaseConfig, RecordShape};
pub use error::{ConfigError, ValidationError};
pub use ledger::LedgerConfig;
pub use telemetry::TelemetryConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection, record shape)
    pub database: DatabaseConfig,

    /// Ledger behaviour (retries, timeouts, reconciliation)
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `LESSON_LEDGER` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `LESSON_LEDGER__DATABASE__URL=...` -> `database.url = ...`
    /// - `LESSON_LEDGER__LEDGER__MAX_WRITE_ATTEMPTS=3` -> `ledger.max_write_attempts = 3`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LESSON_LEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.ledger.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}
