//! Configuration initialization and hierarchy management

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::adapters::toml_config::{AppConfig, ProgressFormat, TomlConfigAdapter};
use crate::cli::{Cli, Commands};
use crate::error::{TailTrimError, TailTrimResult};

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "tailtrim.toml";

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub log_level: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub json: bool,
}

impl CliOverrides {
    pub fn from_cli(cli: &Cli) -> Self {
        let (output_dir, json) = match &cli.command {
            Commands::Trim(args) => (args.output_dir.clone(), args.json),
            Commands::Probe(args) => (None, args.json),
        };
        Self {
            config: cli.config.clone(),
            log_level: cli.log_level.clone(),
            output_dir,
            json,
        }
    }
}

/// Build the effective configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration(cli: &Cli) -> TailTrimResult<AppConfig> {
    resolve_configuration(&CliOverrides::from_cli(cli), |key| std::env::var(key).ok())
}

/// Same as [`initialize_configuration`] with an injectable environment
pub fn resolve_configuration<F>(overrides: &CliOverrides, env: F) -> TailTrimResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    // Step 1 and 2: defaults, then the first config file found
    let mut config = match locate_config_file(overrides.config.as_deref())? {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            TomlConfigAdapter::load(&path)?
        }
        None => {
            debug!("No configuration file found, using defaults");
            AppConfig::default()
        }
    };

    // Step 3: environment
    apply_environment(&mut config, env)?;

    // Step 4: command line
    apply_cli_overrides(&mut config, overrides);

    config.validate()?;
    Ok(config)
}

/// Explicit path (must exist), then `tailtrim.toml`, then the per-user file
fn locate_config_file(explicit: Option<&Path>) -> TailTrimResult<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(TailTrimError::Config {
                message: format!("config file not found: {}", path.display()),
            });
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    Ok(TomlConfigAdapter::default_config_path().filter(|path| path.is_file()))
}

/// Apply `TAILTRIM_*` overrides
fn apply_environment<F>(config: &mut AppConfig, env: F) -> TailTrimResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = 0;

    if let Some(core) = env("TAILTRIM_ENGINE_CORE") {
        config.engine.core = core;
        applied += 1;
    }
    if let Some(module) = env("TAILTRIM_ENGINE_MODULE") {
        config.engine.module = module;
        applied += 1;
    }
    if let Some(dir) = env("TAILTRIM_OUTPUT_DIR") {
        config.output.directory = PathBuf::from(dir);
        applied += 1;
    }
    if let Some(delay) = env("TAILTRIM_RESET_DELAY_MS") {
        config.progress.reset_delay_ms = delay.trim().parse().map_err(|_| TailTrimError::Config {
            message: format!("TAILTRIM_RESET_DELAY_MS must be an integer, got '{}'", delay),
        })?;
        applied += 1;
    }
    if let Some(format) = env("TAILTRIM_PROGRESS_FORMAT") {
        config.progress.format = format.parse()?;
        applied += 1;
    }
    if let Some(level) = env("TAILTRIM_LOG_LEVEL") {
        config.log.level = level;
        applied += 1;
    }
    if let Some(json) = env("TAILTRIM_LOG_JSON") {
        config.log.json = parse_bool(&json).ok_or_else(|| TailTrimError::Config {
            message: format!("TAILTRIM_LOG_JSON must be a boolean, got '{}'", json),
        })?;
        applied += 1;
    }

    if applied > 0 {
        debug!(applied, "Applied environment overrides");
    }
    Ok(())
}

fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(level) = &overrides.log_level {
        config.log.level = level.clone();
    }
    if let Some(dir) = &overrides.output_dir {
        config.output.directory = dir.clone();
    }
    if overrides.json {
        config.progress.format = ProgressFormat::Json;
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
