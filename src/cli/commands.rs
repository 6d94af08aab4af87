//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::adapters::toml_config::AppConfig;
use crate::app::AppContainer;
use crate::cli::args::{ProbeArgs, TrimArgs};
use crate::domain::model::RunOutcome;
use crate::domain::rules::{format_seconds, media_type_for, trim_limit};
use crate::error::{TailTrimError, TailTrimResult};
use crate::probe::{probe_duration, ContainerKind};
use crate::utils::Utils;

/// Execute the trim command
pub async fn trim(args: TrimArgs, config: &AppConfig) -> Result<()> {
    let (bytes, name) = read_input(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let declared_type = media_type_for(&name, "");
    info!(input = %args.input.display(), "Starting trim");

    let container = AppContainer::from_config(config).context("Failed to set up tailtrim")?;
    if let Err(err) = container.load_engine().await {
        // The session reports the fatal state on intake
        error!(%err, "Engine load failed");
    }

    let session = container.session();
    let outcome = session.file_selected(bytes, &name, &declared_type).await;
    let summary = match outcome {
        RunOutcome::Success(summary) => summary,
        other => {
            let message = other
                .error_message()
                .unwrap_or_else(|| "trim did not complete".to_string());
            if args.json {
                println!("{}", serde_json::json!({ "event": "error", "message": message }));
            }
            anyhow::bail!(message);
        }
    };

    let saved = session
        .download_requested()
        .await
        .context("Failed to save trimmed video")?;

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "event": "saved",
                "path": saved.display().to_string(),
                "result": summary,
            })
        );
    } else {
        println!(
            "Saved {} ({}) to {}",
            summary.download_name,
            Utils::format_file_size(summary.size as u64),
            saved.display()
        );
    }
    Ok(())
}

/// Execute the probe command
pub async fn probe(args: ProbeArgs) -> Result<()> {
    let (bytes, name) = read_input(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let duration = probe_duration(&bytes).with_context(|| format!("Failed to probe {}", name))?;
    let container = ContainerKind::sniff(&bytes);
    let limit = trim_limit(duration).ok();

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "input": name,
                "container": container.map(|kind| format!("{:?}", kind)),
                "duration": duration,
                "trim_limit": limit,
            })
        );
    } else {
        println!("input: {}", name);
        println!("duration: {:.3}s ({})", duration, Utils::format_seconds(duration));
        match limit {
            Some(limit) => println!("trim limit: {}", format_seconds(limit)),
            None => println!("trim limit: none (video is too short to trim)"),
        }
    }
    Ok(())
}

async fn read_input(path: &Path) -> TailTrimResult<(Vec<u8>, String)> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(TailTrimError::InputFileNotFound {
                path: path.display().to_string(),
            })
        }
        Err(err) => return Err(err.into()),
    };
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok((bytes, name))
}
