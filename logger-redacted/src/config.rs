// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Hash e-mail addresses and phone numbers before they reach a log line
    pub redaction_enabled: bool,
    /// Default filter directive when `RUST_LOG` is unset
    pub log_level: String,
    /// JSON lines for production, compact text otherwise
    pub json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            log_level: "info".to_string(),
            json: false,
        }
    }
}
