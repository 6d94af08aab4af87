// File-backed access handles and save sink

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::AccessHandle;
use crate::ports::*;

/// Handle registry that exposes each binary as a file in a private directory.
/// Revoking a handle deletes its file.
pub struct FileHandleRegistry {
    dir: PathBuf,
    next_id: AtomicU64,
    _owned: Option<TempDir>,
}

impl FileHandleRegistry {
    /// Registry over a fresh private temporary directory, removed on drop
    pub fn temporary() -> Result<Self, DomainError> {
        let owned = tempfile::Builder::new()
            .prefix("tailtrim-handles-")
            .tempdir()
            .map_err(|e| DomainError::ResourceFail(format!("cannot create handle directory: {}", e)))?;
        Ok(Self {
            dir: owned.path().to_path_buf(),
            next_id: AtomicU64::new(1),
            _owned: Some(owned),
        })
    }

    /// Registry over an existing directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| DomainError::ResourceFail(format!("cannot create {}: {}", dir.display(), e)))?;
        Ok(Self {
            dir,
            next_id: AtomicU64::new(1),
            _owned: None,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl HandleRegistry for FileHandleRegistry {
    fn create(&self, bytes: &[u8], media_type: &str, name_hint: &str) -> Result<AccessHandle, DomainError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("handle-{}-{}", id, sanitize(name_hint)));
        std::fs::write(&path, bytes)
            .map_err(|e| DomainError::ResourceFail(format!("cannot create handle {}: {}", id, e)))?;
        debug!(id, %media_type, path = %path.display(), "Created access handle");
        Ok(AccessHandle::new(id, path.to_string_lossy()))
    }

    fn revoke(&self, handle: AccessHandle) -> Result<(), RevokeFailure> {
        match std::fs::remove_file(handle.locator()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                let error = DomainError::ResourceFail(format!("cannot revoke handle {}: {}", handle.id(), e));
                return Err(RevokeFailure::new(handle, error));
            }
        }
        debug!(id = handle.id(), "Revoked access handle");
        Ok(())
    }
}

/// Keep names to a single safe path component
fn sanitize(name: &str) -> String {
    let cleaned: String = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "blob".to_string()
    } else {
        cleaned
    }
}

/// Saves downloads into a directory
pub struct DirectorySaveSink {
    dir: PathBuf,
}

impl DirectorySaveSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SaveSink for DirectorySaveSink {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DomainError::FsFail(format!("cannot create {}: {}", self.dir.display(), e)))?;
        let path = self.dir.join(sanitize(file_name));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::FsFail(format!("cannot write {}: {}", path.display(), e)))?;
        Ok(path)
    }
}
