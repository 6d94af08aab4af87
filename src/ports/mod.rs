// Ports - Interface definitions (contracts)

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Synchronous observer for an engine's native progress signal.
///
/// Fractions are nominally in `[0, 1]` but are not guaranteed to be monotonic
/// or in range; consumers clamp.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, fraction: f64);
}

/// Observer that drops every signal
pub struct IgnoreProgress;

impl ProgressObserver for IgnoreProgress {
    fn on_progress(&self, _fraction: f64) {}
}

/// Port for the transcoding engine's private workspace
#[async_trait]
pub trait EngineWorkspace: Send + Sync {
    /// Write a named entry into the workspace
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), DomainError>;

    /// Run the engine with an argument list, reporting native progress
    async fn invoke(&self, args: &[String], observer: &dyn ProgressObserver) -> Result<(), DomainError>;

    /// Read a named entry back out of the workspace
    async fn read(&self, name: &str) -> Result<Vec<u8>, DomainError>;

    /// Remove a named entry; removing an absent entry is not an error
    async fn remove(&self, name: &str) -> Result<(), DomainError>;
}

/// Port for one-time engine acquisition and instantiation
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Acquire the engine assets and return a usable workspace
    async fn load(&self, observer: &dyn ProgressObserver) -> Result<Arc<dyn EngineWorkspace>, DomainError>;
}

/// Port for container duration probing
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Return the declared duration in seconds
    async fn probe_duration(&self, bytes: &[u8]) -> Result<f64, DomainError>;
}

/// Port for ephemeral access handles over in-memory binaries
pub trait HandleRegistry: Send + Sync {
    /// Create a handle exposing `bytes`
    fn create(&self, bytes: &[u8], media_type: &str, name_hint: &str) -> Result<AccessHandle, DomainError>;

    /// Release a handle; consuming it guarantees a single release.
    /// On failure the handle comes back so the caller still owns it.
    fn revoke(&self, handle: AccessHandle) -> Result<(), RevokeFailure>;
}

/// A revoke that did not happen; the handle is still live
#[derive(Debug)]
pub struct RevokeFailure {
    pub handle: AccessHandle,
    pub error: DomainError,
}

impl RevokeFailure {
    pub fn new(handle: AccessHandle, error: DomainError) -> Self {
        Self { handle, error }
    }
}

/// Port for saving an artifact where the user can reach it
#[async_trait]
pub trait SaveSink: Send + Sync {
    /// Save `bytes` under `file_name` and return where it landed
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError>;
}

/// Port for progress indicator consumers (terminal renderers, UIs)
pub trait ProgressSink: Send + Sync {
    fn on_state(&self, state: &ProgressState);
}
