// Trim session - Presentation boundary: intents in, snapshots out

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use crate::app::trim_interactor::{RunReport, TrimInteractor};
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::engine::progress::ProgressAggregator;
use crate::engine::EngineManager;
use crate::output::ResultStore;
use crate::ports::HandleRegistry;
use crate::utils::lock;

struct SessionState {
    display: DisplayState,
    error: Option<String>,
    info: Option<String>,
    preview: Option<AccessHandle>,
}

/// Single-user trim session.
///
/// Holds a run lock for the whole of a run: a file selected while another run
/// is active is rejected with [`RunOutcome::Busy`] and the active run is left alone.
pub struct TrimSession {
    engine: Arc<EngineManager>,
    interactor: TrimInteractor,
    results: Arc<ResultStore>,
    progress: Arc<ProgressAggregator>,
    registry: Arc<dyn HandleRegistry>,
    run_lock: tokio::sync::Mutex<()>,
    state: Mutex<SessionState>,
    generation: Arc<AtomicU64>,
    reset_delay: Duration,
}

impl TrimSession {
    pub fn new(
        engine: Arc<EngineManager>,
        interactor: TrimInteractor,
        results: Arc<ResultStore>,
        progress: Arc<ProgressAggregator>,
        registry: Arc<dyn HandleRegistry>,
        reset_delay: Duration,
    ) -> Self {
        Self {
            engine,
            interactor,
            results,
            progress,
            registry,
            run_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(SessionState {
                display: DisplayState::Idle,
                error: None,
                info: None,
                preview: None,
            }),
            generation: Arc::new(AtomicU64::new(0)),
            reset_delay,
        }
    }

    pub fn engine(&self) -> &Arc<EngineManager> {
        &self.engine
    }

    pub fn progress(&self) -> &Arc<ProgressAggregator> {
        &self.progress
    }

    /// Intent: the user picked a file
    pub async fn file_selected(&self, bytes: Vec<u8>, name: &str, declared_type: &str) -> RunOutcome {
        self.file_selected_with_report(bytes, name, declared_type)
            .await
            .outcome
    }

    /// Like [`Self::file_selected`], also returning the phase trace
    pub async fn file_selected_with_report(
        &self,
        bytes: Vec<u8>,
        name: &str,
        declared_type: &str,
    ) -> RunReport {
        let _guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(%name, "Rejecting file selected while a trim is running");
                return RunReport {
                    outcome: RunOutcome::Busy,
                    phases: Vec::new(),
                };
            }
        };

        // New input: cancel any pending cosmetic reset and start clean.
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.progress.hide();

        let file = SelectedFile::new(bytes, name, declared_type);
        {
            let mut state = lock(&self.state);
            state.error = None;
            state.info = None;
            state.display = DisplayState::Busy;
            self.replace_preview(&mut state, &file);
        }

        let report = self.interactor.run(file, &self.engine).await;
        self.apply_outcome(&report.outcome);
        report
    }

    /// Intent: the user asked to save the current result
    pub async fn download_requested(&self) -> Result<PathBuf, DomainError> {
        let saved = self.results.download().await;
        let mut state = lock(&self.state);
        match &saved {
            Ok(path) => state.info = Some(format!("Saved to {}", path.display())),
            Err(err) => state.error = Some(err.to_string()),
        }
        saved
    }

    /// Current observable state
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = lock(&self.state);
        SessionSnapshot {
            progress: self.progress.snapshot(),
            display: state.display.clone(),
            error: state.error.clone(),
            info: state.info.clone(),
        }
    }

    /// Release every live handle
    pub fn teardown(&self) {
        let mut state = lock(&self.state);
        if let Some(preview) = state.preview.take() {
            if let Err(failure) = self.registry.revoke(preview) {
                warn!(err = %failure.error, handle = %failure.handle, "Failed to release preview handle");
                state.preview = Some(failure.handle);
            }
        }
        drop(state);
        self.results.release();
    }

    fn replace_preview(&self, state: &mut SessionState, file: &SelectedFile) {
        if let Some(previous) = state.preview.take() {
            if let Err(failure) = self.registry.revoke(previous) {
                // keep the old preview rather than hold two live handles
                warn!(err = %failure.error, handle = %failure.handle, "Failed to release previous preview handle");
                state.preview = Some(failure.handle);
                return;
            }
        }
        match self.registry.create(&file.bytes, &file.declared_type, &file.name) {
            Ok(handle) => {
                debug!(%handle, "Created preview handle");
                state.preview = Some(handle);
            }
            Err(err) => warn!(%err, "Could not create preview handle"),
        }
    }

    fn apply_outcome(&self, outcome: &RunOutcome) {
        let mut state = lock(&self.state);
        match outcome {
            RunOutcome::Success(summary) => {
                state.display = DisplayState::Ready {
                    result: summary.clone(),
                };
                state.info = Some(format!("Trimmed video ready: {}", summary.download_name));
                self.schedule_reset();
            }
            other => {
                self.progress.hide();
                state.display = match other {
                    RunOutcome::ValidationRejected(_) => DisplayState::Rejected,
                    RunOutcome::Fatal(_) => DisplayState::Fatal,
                    _ => DisplayState::Failed,
                };
                state.error = other.error_message();
            }
        }
    }

    /// Hide the completed bar after a short delay unless new input arrives first
    fn schedule_reset(&self) {
        let generation = self.generation.load(Ordering::SeqCst);
        let counter = Arc::clone(&self.generation);
        let progress = Arc::clone(&self.progress);
        let delay = self.reset_delay;

        if delay.is_zero() {
            progress.hide();
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if counter.load(Ordering::SeqCst) == generation {
                        progress.hide();
                    }
                });
            }
            Err(_) => progress.hide(),
        }
    }
}

impl Drop for TrimSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for TrimSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrimSession")
            .field("engine", &self.engine.state())
            .field("reset_delay", &self.reset_delay)
            .finish()
    }
}
