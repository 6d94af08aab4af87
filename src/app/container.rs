use std::sync::Arc;
use std::time::Duration;

use crate::adapters::toml_config::{AppConfig, ProgressFormat};
use crate::adapters::{DirectorySaveSink, FfmpegEngineLoader, FileHandleRegistry};
use crate::app::session::TrimSession;
use crate::app::trim_interactor::TrimInteractor;
use crate::domain::errors::DomainError;
use crate::engine::progress::{ConsoleProgressSink, JsonProgressSink, ProgressAggregator};
use crate::engine::EngineManager;
use crate::error::TailTrimResult;
use crate::output::ResultStore;
use crate::ports::{DurationProbe, EngineLoader, HandleRegistry, ProgressSink, SaveSink};
use crate::probe::ContainerProbe;

/// Collaborators a session is built from
pub struct ContainerParts {
    pub loader: Arc<dyn EngineLoader>,
    pub probe: Arc<dyn DurationProbe>,
    pub registry: Arc<dyn HandleRegistry>,
    pub sink: Arc<dyn SaveSink>,
    pub progress_sinks: Vec<Arc<dyn ProgressSink>>,
    pub reset_delay: Duration,
}

/// Owns the engine loader and a fully wired session
pub struct AppContainer {
    loader: Arc<dyn EngineLoader>,
    session: TrimSession,
}

impl AppContainer {
    /// Wire the production adapters from configuration
    pub fn from_config(config: &AppConfig) -> TailTrimResult<Self> {
        let registry: Arc<dyn HandleRegistry> = match &config.output.handle_dir {
            Some(dir) if !dir.as_os_str().is_empty() => Arc::new(FileHandleRegistry::in_dir(dir)?),
            _ => Arc::new(FileHandleRegistry::temporary()?),
        };
        let progress_sink: Arc<dyn ProgressSink> = match config.progress.format {
            ProgressFormat::Human => Arc::new(ConsoleProgressSink::new()),
            ProgressFormat::Json => Arc::new(JsonProgressSink),
        };

        Ok(Self::with_parts(ContainerParts {
            loader: Arc::new(FfmpegEngineLoader::new(
                config.engine.core.clone(),
                config.engine.module.clone(),
            )),
            probe: Arc::new(ContainerProbe::new()),
            registry,
            sink: Arc::new(DirectorySaveSink::new(config.output.directory.clone())),
            progress_sinks: vec![progress_sink],
            reset_delay: Duration::from_millis(config.progress.reset_delay_ms),
        }))
    }

    /// Wire arbitrary collaborators
    pub fn with_parts(parts: ContainerParts) -> Self {
        let progress = Arc::new(ProgressAggregator::new());
        for sink in parts.progress_sinks {
            progress.add_sink(sink);
        }

        let results = Arc::new(ResultStore::new(Arc::clone(&parts.registry), parts.sink));
        let interactor = TrimInteractor::new(parts.probe, Arc::clone(&results), Arc::clone(&progress));
        let session = TrimSession::new(
            Arc::new(EngineManager::new()),
            interactor,
            results,
            progress,
            parts.registry,
            parts.reset_delay,
        );

        Self {
            loader: parts.loader,
            session,
        }
    }

    /// Load the engine through the session's manager
    pub async fn load_engine(&self) -> Result<(), DomainError> {
        self.session
            .engine()
            .load(self.loader.as_ref(), self.session.progress())
            .await
    }

    pub fn session(&self) -> &TrimSession {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TailTrimError;
    use tempfile::TempDir;

    #[test]
    fn test_from_config_uses_handle_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.output.handle_dir = Some(dir.path().join("handles"));

        let container = AppContainer::from_config(&config).unwrap();
        assert!(dir.path().join("handles").is_dir());
        assert!(container.session().snapshot().error.is_none());
    }

    #[test]
    fn test_from_config_reports_unusable_handle_dir() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("plain-file");
        std::fs::write(&blocker, b"x").unwrap();
        let mut config = AppConfig::default();
        config.output.handle_dir = Some(blocker.join("handles"));

        match AppContainer::from_config(&config) {
            Err(TailTrimError::Domain(DomainError::ResourceFail(message))) => {
                assert!(message.contains("handles"), "{}", message)
            }
            Err(other) => panic!("expected a resource error, got {:?}", other),
            Ok(_) => panic!("expected a resource error"),
        }
    }
}
