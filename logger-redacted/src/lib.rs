//! Logging for CareLedger
//!
//! Every crate emits events through `tracing`; binaries call [`init_tracing`]
//! once at startup. Free-text fields that may carry patient contact details
//! (e-mail addresses, phone numbers) go through [`PiiRedactor`] first, which
//! replaces them with short hashes so log lines can still be correlated.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{PiiRedactor, LoggerConfig};
//!
//! let config = LoggerConfig::default();
//! let redactor = PiiRedactor::from_config(&config);
//! let line = redactor.redact("registered jane@example.com");
//! assert!(!line.contains("jane@example.com"));
//! ```

pub mod redactor;
pub mod config;

pub use redactor::*;
pub use config::*;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

pub type LoggerResult<T> = Result<T, LoggerError>;

impl PiiRedactor {
    /// Redactor matching the configured switch
    pub fn from_config(config: &LoggerConfig) -> Self {
        if config.redaction_enabled {
            PiiRedactor::default()
        } else {
            PiiRedactor::disabled()
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level so operators can raise
/// verbosity without editing configuration.
pub fn init_tracing(config: &LoggerConfig) -> LoggerResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("{},sqlx=warn", config.log_level))
            .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    if config.json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).compact())
            .try_init()
            .map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction_switch() {
        let off = LoggerConfig {
            redaction_enabled: false,
            ..Default::default()
        };
        assert_eq!(PiiRedactor::from_config(&off).redact("0712345678"), "0712345678");
        assert_ne!(PiiRedactor::from_config(&LoggerConfig::default()).redact("0712345678"), "0712345678");
    }
}
