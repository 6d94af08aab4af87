//! In-memory fakes shared by the integration tests

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use tailtrim::app::container::{AppContainer, ContainerParts};
use tailtrim::domain::errors::DomainError;
use tailtrim::domain::model::{AccessHandle, ProgressState};
use tailtrim::ports::*;

/// Engine workspace that records every call and fakes the transcode
#[derive(Default)]
pub struct FakeWorkspace {
    pub calls: Mutex<Vec<String>>,
    pub invocations: Mutex<Vec<Vec<String>>>,
    pub entries: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_invoke: Mutex<Option<String>>,
    pub progress_script: Mutex<Vec<f64>>,
    /// When set, `invoke` signals `started` and waits on `gate`
    pub gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self {
            progress_script: Mutex::new(vec![0.25, 0.5, 1.0]),
            ..Default::default()
        }
    }

    pub fn gated(started: Arc<Notify>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some((started, gate)),
            ..Self::new()
        }
    }

    pub fn fail_next_invoke(&self, reason: &str) {
        *self.fail_invoke.lock().unwrap() = Some(reason.to_string());
    }

    pub fn set_progress(&self, script: Vec<f64>) {
        *self.progress_script.lock().unwrap() = script;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn entry_names(&self) -> BTreeSet<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    pub fn last_invocation(&self) -> Option<Vec<String>> {
        self.invocations.lock().unwrap().last().cloned()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EngineWorkspace for FakeWorkspace {
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), DomainError> {
        self.record(format!("write {}", name));
        self.entries.lock().unwrap().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn invoke(&self, args: &[String], observer: &dyn ProgressObserver) -> Result<(), DomainError> {
        self.record("invoke".to_string());
        self.invocations.lock().unwrap().push(args.to_vec());

        if let Some((started, gate)) = &self.gate {
            started.notify_one();
            gate.notified().await;
        }

        let script = self.progress_script.lock().unwrap().clone();
        for fraction in script {
            observer.on_progress(fraction);
        }

        if let Some(reason) = self.fail_invoke.lock().unwrap().take() {
            return Err(DomainError::InvocationFail(reason));
        }

        let input = args.get(1).cloned().unwrap_or_default();
        let output = args.last().cloned().unwrap_or_default();
        let mut entries = self.entries.lock().unwrap();
        let source = entries.get(&input).cloned().unwrap_or_default();
        entries.insert(output, [b"trimmed:".as_slice(), source.as_slice()].concat());
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, DomainError> {
        self.record(format!("read {}", name));
        self.entries
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::WorkspaceFail(format!("no such entry: {}", name)))
    }

    async fn remove(&self, name: &str) -> Result<(), DomainError> {
        self.record(format!("remove {}", name));
        self.entries.lock().unwrap().remove(name);
        Ok(())
    }
}

/// Loader handing out a shared fake workspace, or failing
pub struct FakeLoader {
    pub workspace: Arc<FakeWorkspace>,
    pub failure: Option<String>,
    pub loads: AtomicUsize,
}

#[async_trait]
impl EngineLoader for FakeLoader {
    async fn load(&self, observer: &dyn ProgressObserver) -> Result<Arc<dyn EngineWorkspace>, DomainError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        observer.on_progress(0.5);
        if let Some(reason) = &self.failure {
            return Err(DomainError::AssetFail(reason.clone()));
        }
        observer.on_progress(1.0);
        Ok(Arc::clone(&self.workspace) as Arc<dyn EngineWorkspace>)
    }
}

/// Probe that reads the duration from the file body, e.g. `b"10.0"`
#[derive(Default)]
pub struct TextDurationProbe {
    pub calls: AtomicUsize,
}

#[async_trait]
impl DurationProbe for TextDurationProbe {
    async fn probe_duration(&self, bytes: &[u8]) -> Result<f64, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.trim().parse::<f64>().ok())
            .ok_or_else(|| DomainError::ProbeFail("unrecognized container".to_string()))
    }
}

/// Handle registry keeping an ordered event log
#[derive(Default)]
pub struct MemoryRegistry {
    pub next_id: AtomicU64,
    pub events: Mutex<Vec<String>>,
    pub live: Mutex<BTreeSet<u64>>,
}

impl MemoryRegistry {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn live(&self) -> BTreeSet<u64> {
        self.live.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

impl HandleRegistry for MemoryRegistry {
    fn create(&self, _bytes: &[u8], _media_type: &str, name_hint: &str) -> Result<AccessHandle, DomainError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().unwrap().push(format!("create {}", id));
        self.live.lock().unwrap().insert(id);
        Ok(AccessHandle::new(id, format!("mem://{}/{}", id, name_hint)))
    }

    fn revoke(&self, handle: AccessHandle) -> Result<(), RevokeFailure> {
        self.events.lock().unwrap().push(format!("revoke {}", handle.id()));
        self.live.lock().unwrap().remove(&handle.id());
        Ok(())
    }
}

/// Save sink that keeps saved files in memory
#[derive(Default)]
pub struct MemorySink {
    pub saved: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl SaveSink for MemorySink {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
        self.saved.lock().unwrap().push((file_name.to_string(), bytes.to_vec()));
        Ok(PathBuf::from("/memory").join(file_name))
    }
}

/// Progress sink recording every snapshot
#[derive(Default)]
pub struct RecordingProgress {
    pub states: Mutex<Vec<ProgressState>>,
}

impl RecordingProgress {
    pub fn take(&self) -> Vec<ProgressState> {
        std::mem::take(&mut *self.states.lock().unwrap())
    }
}

impl ProgressSink for RecordingProgress {
    fn on_state(&self, state: &ProgressState) {
        self.states.lock().unwrap().push(state.clone());
    }
}

/// Fully wired container over fakes
pub struct Harness {
    pub container: AppContainer,
    pub workspace: Arc<FakeWorkspace>,
    pub loader: Arc<FakeLoader>,
    pub probe: Arc<TextDurationProbe>,
    pub registry: Arc<MemoryRegistry>,
    pub sink: Arc<MemorySink>,
    pub progress: Arc<RecordingProgress>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(FakeWorkspace::new(), None)
    }

    pub fn failing_load(reason: &str) -> Self {
        Self::build(FakeWorkspace::new(), Some(reason.to_string()))
    }

    pub fn build(workspace: FakeWorkspace, failure: Option<String>) -> Self {
        let workspace = Arc::new(workspace);
        let loader = Arc::new(FakeLoader {
            workspace: Arc::clone(&workspace),
            failure,
            loads: AtomicUsize::new(0),
        });
        let probe = Arc::new(TextDurationProbe::default());
        let registry = Arc::new(MemoryRegistry::default());
        let sink = Arc::new(MemorySink::default());
        let progress = Arc::new(RecordingProgress::default());

        let container = AppContainer::with_parts(ContainerParts {
            loader: Arc::clone(&loader) as Arc<dyn EngineLoader>,
            probe: Arc::clone(&probe) as Arc<dyn DurationProbe>,
            registry: Arc::clone(&registry) as Arc<dyn HandleRegistry>,
            sink: Arc::clone(&sink) as Arc<dyn SaveSink>,
            progress_sinks: vec![Arc::clone(&progress) as Arc<dyn ProgressSink>],
            reset_delay: Duration::ZERO,
        });

        Self {
            container,
            workspace,
            loader,
            probe,
            registry,
            sink,
            progress,
        }
    }

    /// Load the engine and forget the load-phase progress
    pub async fn ready() -> Self {
        let harness = Self::new();
        harness.container.load_engine().await.unwrap();
        harness.progress.take();
        harness
    }
}

/// Visible percentages must never go down
pub fn assert_non_decreasing(states: &[ProgressState]) {
    let visible: Vec<u8> = states.iter().filter(|s| s.visible).map(|s| s.percent).collect();
    for pair in visible.windows(2) {
        assert!(pair[0] <= pair[1], "progress went backwards: {:?}", visible);
    }
}
