//! Result lifecycle: publishing trimmed artifacts and their access handles

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{TrimResult, TrimSummary};
use crate::domain::rules::download_name;
use crate::ports::{HandleRegistry, SaveSink};
use crate::utils::lock;

/// Owns the single live [`TrimResult`] and its access handle
pub struct ResultStore {
    registry: Arc<dyn HandleRegistry>,
    sink: Arc<dyn SaveSink>,
    current: Mutex<Option<TrimResult>>,
}

impl ResultStore {
    pub fn new(registry: Arc<dyn HandleRegistry>, sink: Arc<dyn SaveSink>) -> Self {
        Self {
            registry,
            sink,
            current: Mutex::new(None),
        }
    }

    /// Replace the current result. The previous handle is revoked before the
    /// new one is created.
    pub fn publish(
        &self,
        bytes: Vec<u8>,
        media_type: &str,
        original_name: &str,
    ) -> Result<TrimSummary, DomainError> {
        let mut current = lock(&self.current);

        if let Some(previous) = current.take() {
            debug!(handle = %previous.handle, "Revoking superseded result");
            if let Err((previous, err)) = self.revoke_result(previous) {
                // still live: it stays the current result
                *current = Some(previous);
                return Err(err);
            }
        }

        let name = download_name(original_name);
        let handle = self.registry.create(&bytes, media_type, &name)?;
        let result = TrimResult {
            bytes: Arc::from(bytes),
            media_type: media_type.to_string(),
            handle,
            original_name: original_name.to_string(),
            download_name: name,
        };
        let summary = result.summary();
        info!(
            download_name = %summary.download_name,
            media_type = %summary.media_type,
            size = summary.size,
            "Published trim result"
        );

        *current = Some(result);
        Ok(summary)
    }

    /// Summary of the live result, if any
    pub fn current(&self) -> Option<TrimSummary> {
        lock(&self.current).as_ref().map(TrimResult::summary)
    }

    /// Save the live result under its suggested name. Does not touch state.
    pub async fn download(&self) -> Result<PathBuf, DomainError> {
        let (bytes, name) = {
            let current = lock(&self.current);
            let result = current.as_ref().ok_or(DomainError::NoResult)?;
            (Arc::clone(&result.bytes), result.download_name.clone())
        };

        let path = self.sink.save(&name, &bytes).await?;
        info!(path = %path.display(), "Saved trimmed video");
        Ok(path)
    }

    /// Revoke the live result's handle at teardown
    pub fn release(&self) {
        let mut current = lock(&self.current);
        if let Some(result) = current.take() {
            if let Err((result, err)) = self.revoke_result(result) {
                warn!(%err, handle = %result.handle, "Failed to release trim result handle");
                *current = Some(result);
            }
        }
    }

    /// Revoke a result's handle; on failure the result comes back intact
    fn revoke_result(&self, result: TrimResult) -> Result<(), (TrimResult, DomainError)> {
        let TrimResult {
            bytes,
            media_type,
            handle,
            original_name,
            download_name: suggested,
        } = result;
        self.registry.revoke(handle).map_err(|failure| {
            let result = TrimResult {
                bytes,
                media_type,
                handle: failure.handle,
                original_name,
                download_name: suggested,
            };
            (result, failure.error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::AccessHandle;
    use crate::ports::RevokeFailure;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    #[derive(Default)]
    struct MemoryRegistry {
        next: AtomicU64,
        events: Mutex<Vec<String>>,
        live: Mutex<BTreeSet<u64>>,
        refuse_revoke: AtomicBool,
    }

    impl HandleRegistry for MemoryRegistry {
        fn create(&self, _bytes: &[u8], _media_type: &str, name_hint: &str) -> Result<AccessHandle, DomainError> {
            let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            self.events.lock().unwrap().push(format!("create {}", id));
            self.live.lock().unwrap().insert(id);
            Ok(AccessHandle::new(id, format!("mem://{}/{}", id, name_hint)))
        }

        fn revoke(&self, handle: AccessHandle) -> Result<(), RevokeFailure> {
            if self.refuse_revoke.load(Ordering::SeqCst) {
                return Err(RevokeFailure::new(handle, DomainError::ResourceFail("busy".to_string())));
            }
            self.events.lock().unwrap().push(format!("revoke {}", handle.id()));
            self.live.lock().unwrap().remove(&handle.id());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl SaveSink for MemorySink {
        async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
            self.saved.lock().unwrap().push((file_name.to_string(), bytes.len()));
            Ok(PathBuf::from(file_name))
        }
    }

    fn store() -> (ResultStore, Arc<MemoryRegistry>, Arc<MemorySink>) {
        let registry = Arc::new(MemoryRegistry::default());
        let sink = Arc::new(MemorySink::default());
        (ResultStore::new(registry.clone(), sink.clone()), registry, sink)
    }

    #[test]
    fn test_publish_revokes_previous_before_create() {
        let (store, registry, _) = store();
        let first = store.publish(vec![1, 2], "video/quicktime", "a.mov").unwrap();
        let second = store.publish(vec![3], "video/webm", "b.webm").unwrap();

        assert_ne!(first.handle_id, second.handle_id);
        assert_eq!(second.download_name, "b_trimmed.webm");
        assert_eq!(
            *registry.events.lock().unwrap(),
            vec!["create 1", "revoke 1", "create 2"]
        );
    }

    #[test]
    fn test_release_revokes_once() {
        let (store, registry, _) = store();
        store.publish(vec![1], "video/mp4", "a.mp4").unwrap();
        store.release();
        store.release();
        assert!(store.current().is_none());
        assert_eq!(
            *registry.events.lock().unwrap(),
            vec!["create 1", "revoke 1"]
        );
    }

    #[tokio::test]
    async fn test_download_saves_without_mutation() {
        let (store, registry, sink) = store();
        let summary = store.publish(vec![9; 10], "video/mp4", "clip.mp4").unwrap();

        let path = store.download().await.unwrap();
        assert_eq!(path, PathBuf::from("clip_trimmed.mp4"));
        assert_eq!(*sink.saved.lock().unwrap(), vec![("clip_trimmed.mp4".to_string(), 10)]);
        assert_eq!(store.current(), Some(summary));
        assert_eq!(registry.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_revoke_keeps_previous_result() {
        let (store, registry, _) = store();
        let first = store.publish(vec![1], "video/mp4", "a.mp4").unwrap();

        registry.refuse_revoke.store(true, Ordering::SeqCst);
        let err = store.publish(vec![2], "video/mp4", "b.mp4").unwrap_err();
        assert_eq!(err, DomainError::ResourceFail("busy".to_string()));
        assert_eq!(store.current(), Some(first.clone()));
        assert_eq!(*registry.live.lock().unwrap(), BTreeSet::from([first.handle_id]));

        // still owned, so teardown can release it once the registry recovers
        store.release();
        assert!(store.current().is_some());
        registry.refuse_revoke.store(false, Ordering::SeqCst);
        store.release();
        assert!(store.current().is_none());
        assert!(registry.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_without_result() {
        let (store, _, _) = store();
        assert_eq!(store.download().await.unwrap_err(), DomainError::NoResult);
    }
}
