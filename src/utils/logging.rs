//! Logging initialization

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{TailTrimError, TailTrimResult};

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level, used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Filter from `RUST_LOG`, falling back to the configured level
    pub fn filter(&self) -> TailTrimResult<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level).map_err(|e| TailTrimError::Logging {
            message: format!("invalid log level '{}': {}", self.level, e),
        })
    }
}

/// Install the global subscriber. Logs go to stderr; stdout is reserved for
/// progress and command output.
pub fn init_logging(config: &LoggingConfig) -> TailTrimResult<()> {
    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| TailTrimError::Logging {
        message: e.to_string(),
    })?;

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
    }

    #[test]
    fn test_filter_from_level() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            json: true,
        };
        assert!(config.filter().is_ok());
    }
}
