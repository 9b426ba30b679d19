//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `QMETHOD_` prefix and nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use qmethod_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! config.telemetry.init_tracing();
//! ```

mod analysis;
mod error;
mod session;
mod telemetry;

pub use analysis::AnalysisConfig;
pub use error::{ConfigError, ValidationError};
pub use session::SessionConfig;
pub use telemetry::TelemetryConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section defaults to sensible values, so an empty environment
/// yields a working configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Numerical analysis defaults (tolerances, caps, counts)
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Session lifecycle (idle reaping, event channel)
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging setup
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `QMETHOD` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `QMETHOD__SESSION__IDLE_TIMEOUT_SECS=900` -> `session.idle_timeout_secs = 900`
    /// - `QMETHOD__ANALYSIS__BOOTSTRAP_RESAMPLES=2000` -> `analysis.bootstrap_resamples = 2000`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("QMETHOD")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.analysis.validate()?;
        self.session.validate()?;
        Ok(())
    }
}
