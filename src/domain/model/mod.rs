// Domain models - Core types and data structures

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::errors::DomainError;

/// Length of the trailing segment removed from every video, in seconds
pub const TRAILING_TRIM_SECONDS: f64 = 3.0;

/// A file handed over by the presentation layer, before any validation
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub bytes: Arc<[u8]>,
    pub name: String,
    pub declared_type: String,
}

impl SelectedFile {
    /// Create a new selected file
    pub fn new(bytes: impl Into<Arc<[u8]>>, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    /// Size of the file in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A selected file whose probed duration passed validation
#[derive(Debug, Clone)]
pub struct IntakeVideo {
    pub file: SelectedFile,
    pub duration: f64,
}

impl IntakeVideo {
    /// Create new intake video; rejects anything not strictly longer than the trimmed tail
    pub fn new(file: SelectedFile, duration: f64) -> Result<Self, DomainError> {
        if !duration.is_finite() {
            return Err(DomainError::ProbeFail(format!(
                "duration is not a finite number: {}",
                duration
            )));
        }
        if duration <= TRAILING_TRIM_SECONDS {
            return Err(DomainError::TooShort {
                duration,
                minimum: TRAILING_TRIM_SECONDS,
            });
        }
        Ok(Self { file, duration })
    }

    /// Duration of the trimmed output
    pub fn trimmed_duration(&self) -> f64 {
        self.duration - TRAILING_TRIM_SECONDS
    }
}

/// Progress indicator state shown by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub visible: bool,
    pub percent: u8,
    pub label: String,
}

impl ProgressState {
    /// Hidden indicator at zero
    pub fn hidden() -> Self {
        Self {
            visible: false,
            percent: 0,
            label: String::new(),
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::hidden()
    }
}

/// Ephemeral access handle to an in-memory binary.
///
/// Handles are deliberately not `Clone`: revoking one consumes it, so a handle
/// can be released at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct AccessHandle {
    id: u64,
    locator: String,
}

impl AccessHandle {
    /// Create a new access handle; only handle registries should call this
    pub fn new(id: u64, locator: impl Into<String>) -> Self {
        Self {
            id,
            locator: locator.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Where the handle's content can be reached
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl fmt::Display for AccessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.id, self.locator)
    }
}

/// The produced artifact of a successful run
#[derive(Debug)]
pub struct TrimResult {
    pub bytes: Arc<[u8]>,
    pub media_type: String,
    pub handle: AccessHandle,
    pub original_name: String,
    pub download_name: String,
}

impl TrimResult {
    /// Cloneable view of the result for snapshots
    pub fn summary(&self) -> TrimSummary {
        TrimSummary {
            handle_id: self.handle.id(),
            locator: self.handle.locator().to_string(),
            media_type: self.media_type.clone(),
            original_name: self.original_name.clone(),
            download_name: self.download_name.clone(),
            size: self.bytes.len(),
        }
    }
}

/// Snapshot view of a [`TrimResult`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimSummary {
    pub handle_id: u64,
    pub locator: String,
    pub media_type: String,
    pub original_name: String,
    pub download_name: String,
    pub size: usize,
}

/// Terminal classification of one orchestrator invocation
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Trim completed and a new result was published
    Success(TrimSummary),
    /// Input refused before any engine work (too short or unprobeable)
    ValidationRejected(String),
    /// Engine invocation or output collection failed; user may retry
    EngineFailure(String),
    /// Engine still loading; intake is not queued
    NotReady,
    /// Engine failed to load; nothing will work until restart
    Fatal(String),
    /// Another run holds the session
    Busy,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    /// User-facing message for non-success outcomes
    pub fn error_message(&self) -> Option<String> {
        match self {
            RunOutcome::Success(_) => None,
            RunOutcome::ValidationRejected(reason) => Some(reason.clone()),
            RunOutcome::EngineFailure(reason) => Some(format!("Trimming failed: {}. Please try again.", reason)),
            RunOutcome::NotReady => Some("The video engine is still loading; please wait and try again.".to_string()),
            RunOutcome::Fatal(reason) => Some(format!(
                "The video engine failed to load ({}). Restart tailtrim to try again.",
                reason
            )),
            RunOutcome::Busy => Some("A trim is already in progress.".to_string()),
        }
    }
}

/// Orchestrator phases, in the only order they may occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RunPhase {
    Idle,
    Validating,
    Staging,
    Transcoding,
    Finalizing,
    Done,
}

/// What the presentation layer should show besides the progress bar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayState {
    Idle,
    Busy,
    Ready { result: TrimSummary },
    Rejected,
    Failed,
    Fatal,
}

/// Observable session state consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub progress: ProgressState,
    pub display: DisplayState,
    pub error: Option<String>,
    pub info: Option<String>,
}
