//! Engine lifecycle management
//!
//! The transcoding engine is loaded exactly once per process. A successful
//! load is durable; a failed one is terminal and only a restart clears it.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::domain::errors::DomainError;
use crate::ports::{EngineLoader, EngineWorkspace};
use crate::utils::lock;

pub mod progress;

use progress::{PhaseObserver, ProgressAggregator, ProgressPhase};

/// Engine readiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// `load` has not been called
    Unloaded,
    /// Assets are being acquired
    Loading,
    /// Engine usable for the rest of the process
    Ready,
    /// Load failed; unusable until restart
    Fatal(String),
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Unloaded => write!(f, "unloaded"),
            EngineState::Loading => write!(f, "loading"),
            EngineState::Ready => write!(f, "ready"),
            EngineState::Fatal(reason) => write!(f, "fatal ({})", reason),
        }
    }
}

struct EngineSlot {
    state: EngineState,
    workspace: Option<Arc<dyn EngineWorkspace>>,
}

/// Process-scoped owner of the engine capability
pub struct EngineManager {
    slot: Mutex<EngineSlot>,
}

impl EngineManager {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(EngineSlot {
                state: EngineState::Unloaded,
                workspace: None,
            }),
        }
    }

    /// Load the engine. Only the first call does any work; later calls are refused.
    pub async fn load(
        &self,
        loader: &dyn EngineLoader,
        progress: &ProgressAggregator,
    ) -> Result<(), DomainError> {
        {
            let mut slot = lock(&self.slot);
            if slot.state != EngineState::Unloaded {
                return Err(DomainError::AlreadyLoaded);
            }
            slot.state = EngineState::Loading;
        }

        info!("Loading video engine");
        progress.begin(ProgressPhase::EngineLoad);

        let observer = PhaseObserver::new(progress, ProgressPhase::EngineLoad);
        let loaded = loader.load(&observer).await;
        progress.hide();

        let mut slot = lock(&self.slot);
        match loaded {
            Ok(workspace) => {
                slot.state = EngineState::Ready;
                slot.workspace = Some(workspace);
                info!("Video engine ready");
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                error!(%reason, "Video engine failed to load");
                slot.state = EngineState::Fatal(reason.clone());
                Err(DomainError::EngineFatal(reason))
            }
        }
    }

    /// Current readiness
    pub fn state(&self) -> EngineState {
        lock(&self.slot).state.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == EngineState::Ready
    }

    /// The engine workspace, or why it is unavailable
    pub fn workspace(&self) -> Result<Arc<dyn EngineWorkspace>, DomainError> {
        let slot = lock(&self.slot);
        match (&slot.state, &slot.workspace) {
            (EngineState::Ready, Some(workspace)) => Ok(Arc::clone(workspace)),
            (EngineState::Fatal(reason), _) => Err(DomainError::EngineFatal(reason.clone())),
            _ => Err(DomainError::EngineNotReady),
        }
    }
}

impl Default for EngineManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ProgressObserver;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullWorkspace;

    #[async_trait]
    impl EngineWorkspace for NullWorkspace {
        async fn write(&self, _name: &str, _bytes: &[u8]) -> Result<(), DomainError> {
            Ok(())
        }
        async fn invoke(&self, _args: &[String], _observer: &dyn ProgressObserver) -> Result<(), DomainError> {
            Ok(())
        }
        async fn read(&self, _name: &str) -> Result<Vec<u8>, DomainError> {
            Ok(Vec::new())
        }
        async fn remove(&self, _name: &str) -> Result<(), DomainError> {
            Ok(())
        }
    }

    struct TestLoader {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EngineLoader for TestLoader {
        async fn load(&self, observer: &dyn ProgressObserver) -> Result<Arc<dyn EngineWorkspace>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            observer.on_progress(0.5);
            if self.fail {
                Err(DomainError::AssetFail("core asset missing".to_string()))
            } else {
                Ok(Arc::new(NullWorkspace))
            }
        }
    }

    fn loader(fail: bool) -> TestLoader {
        TestLoader {
            fail,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_load_success_is_durable() {
        let engine = EngineManager::new();
        let progress = ProgressAggregator::new();
        assert_eq!(engine.workspace().err(), Some(DomainError::EngineNotReady));

        engine.load(&loader(false), &progress).await.unwrap();
        assert!(engine.is_ready());
        assert!(engine.workspace().is_ok());
        assert!(!progress.snapshot().visible);
    }

    #[tokio::test]
    async fn test_load_failure_is_terminal() {
        let engine = EngineManager::new();
        let progress = ProgressAggregator::new();
        let err = engine.load(&loader(true), &progress).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(engine.state(), EngineState::Fatal(_)));
        assert!(matches!(engine.workspace(), Err(DomainError::EngineFatal(_))));

        // no retry: a working loader is refused and never called
        let retry = loader(false);
        assert_eq!(
            engine.load(&retry, &progress).await.unwrap_err(),
            DomainError::AlreadyLoaded
        );
        assert_eq!(retry.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(engine.state(), EngineState::Fatal(_)));
    }

    #[tokio::test]
    async fn test_load_only_once() {
        let engine = EngineManager::new();
        let progress = ProgressAggregator::new();
        engine.load(&loader(false), &progress).await.unwrap();
        assert_eq!(
            engine.load(&loader(false), &progress).await.unwrap_err(),
            DomainError::AlreadyLoaded
        );
        assert!(engine.is_ready());
    }
}
