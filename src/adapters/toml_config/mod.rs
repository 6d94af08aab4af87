// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TailTrimError, TailTrimResult};

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub engine: EngineSection,
    pub output: OutputSection,
    pub progress: ProgressSection,
    pub log: LogSection,
}

/// Engine asset locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    /// Execution core (ffmpeg)
    pub core: String,
    /// Computation module (ffprobe)
    pub module: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            core: "ffmpeg".to_string(),
            module: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Where downloads are saved
    pub directory: PathBuf,
    /// Where access handles live; empty means a private temp directory
    pub handle_dir: Option<PathBuf>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            handle_dir: None,
        }
    }
}

/// Progress rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressFormat {
    #[default]
    Human,
    Json,
}

impl std::str::FromStr for ProgressFormat {
    type Err = TailTrimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "human" => Ok(ProgressFormat::Human),
            "json" => Ok(ProgressFormat::Json),
            other => Err(TailTrimError::Config {
                message: format!("invalid progress format '{}': expected human or json", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgressSection {
    /// Delay before a completed bar is hidden
    pub reset_delay_ms: u64,
    pub format: ProgressFormat,
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            reset_delay_ms: 1500,
            format: ProgressFormat::Human,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    pub level: String,
    pub json: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Valid log levels
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Validate values serde cannot check on its own
    pub fn validate(&self) -> TailTrimResult<()> {
        let level = self.log.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(TailTrimError::Config {
                message: format!(
                    "invalid log level '{}'. Valid levels: {}",
                    self.log.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.engine.core.trim().is_empty() || self.engine.module.trim().is_empty() {
            return Err(TailTrimError::Config {
                message: "engine core and module locations must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> TailTrimResult<AppConfig> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> TailTrimResult<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| TailTrimError::Config {
            message: format!("failed to read config file {}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    /// Serialize configuration to TOML text
    pub fn serialize(config: &AppConfig) -> TailTrimResult<String> {
        toml::to_string_pretty(config).map_err(|e| TailTrimError::Config {
            message: format!("failed to serialize config: {}", e),
        })
    }

    /// Default per-user config file path
    pub fn default_config_path() -> Option<PathBuf> {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(xdg).join("tailtrim").join("config.toml"));
        }
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Some(PathBuf::from(appdata).join("tailtrim").join("config.toml"));
        }
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("tailtrim")
                .join("config.toml")
        })
    }
}
