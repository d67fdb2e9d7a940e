//! Client configuration module
//!
//! [`GatewayConfig`] is the explicit configuration the client core is built
//! from. [`AppConfig::load()`] is the optional outer layer that fills it from
//! environment variables using the `config` and `dotenvy` crates. Variables
//! use the `GURUTVAPAY` prefix and nested values use double underscores.
//!
//! # Example
//!
//! ```no_run
//! use gurutvapay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Gateway root: {}", config.gateway.api_root());
//! ```

mod error;
mod gateway;

pub use error::{ConfigError, ValidationError};
pub use gateway::{Environment, GatewayConfig, DEFAULT_BASE_URL};

use serde::Deserialize;

/// Root configuration for the command-line binary
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Gateway client configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `GURUTVAPAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `GURUTVAPAY__GATEWAY__ENVIRONMENT=live` -> `gateway.environment = live`
    /// - `GURUTVAPAY__GATEWAY__API_KEY=...` -> `gateway.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("GURUTVAPAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.gateway.validate()
    }
}

fn default_log_level() -> String {
    "gurutvapay=info".to_string()
}
