// Trim interactor - Orchestrates the trailing-trim use case

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::progress::{PhaseObserver, ProgressAggregator, ProgressPhase};
use crate::engine::EngineManager;
use crate::output::ResultStore;
use crate::ports::*;

/// Outcome of one run plus the phases it went through, in order
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub phases: Vec<RunPhase>,
}

/// Interactor for the trim use case
pub struct TrimInteractor {
    probe: Arc<dyn DurationProbe>,
    results: Arc<ResultStore>,
    progress: Arc<ProgressAggregator>,
}

impl TrimInteractor {
    /// Create new trim interactor with injected collaborators
    pub fn new(
        probe: Arc<dyn DurationProbe>,
        results: Arc<ResultStore>,
        progress: Arc<ProgressAggregator>,
    ) -> Self {
        Self {
            probe,
            results,
            progress,
        }
    }

    /// Run one trim: validate, stage, transcode, finalize.
    ///
    /// Every failure is classified into a [`RunOutcome`]; nothing escapes raw.
    /// Staged workspace entries are removed on every path that created them.
    pub async fn run(&self, file: SelectedFile, engine: &EngineManager) -> RunReport {
        let mut phases = vec![RunPhase::Idle];
        let outcome = self.drive(file, engine, &mut phases).await;
        enter(&mut phases, RunPhase::Done);

        match &outcome {
            RunOutcome::Success(summary) => {
                info!(download_name = %summary.download_name, "Trim run succeeded")
            }
            other => warn!(outcome = ?other, "Trim run did not succeed"),
        }
        RunReport { outcome, phases }
    }

    async fn drive(
        &self,
        file: SelectedFile,
        engine: &EngineManager,
        phases: &mut Vec<RunPhase>,
    ) -> RunOutcome {
        enter(phases, RunPhase::Validating);
        info!(name = %file.name, size = file.len(), "Starting trim run");

        let workspace = match engine.workspace() {
            Ok(workspace) => workspace,
            Err(DomainError::EngineFatal(reason)) => return RunOutcome::Fatal(reason),
            Err(_) => return RunOutcome::NotReady,
        };

        let video = match self.validate(file).await {
            Ok(video) => video,
            Err(err) => return RunOutcome::ValidationRejected(err.to_string()),
        };
        let plan = match TrimPlan::for_video(&video) {
            Ok(plan) => plan,
            Err(err) => return RunOutcome::ValidationRejected(err.to_string()),
        };
        debug!(args = ?plan.args, trimmed = video.trimmed_duration(), "Trim plan ready");

        self.progress.begin(ProgressPhase::Transcoding);
        enter(phases, RunPhase::Staging);
        let transcoded = self.transcode(workspace.as_ref(), &video, &plan, phases).await;

        let output = match transcoded {
            Ok(()) => {
                enter(phases, RunPhase::Finalizing);
                self.progress.report(ProgressPhase::Finalizing, 0.0);
                workspace.read(&plan.output_name).await
            }
            Err(err) => Err(err),
        };

        self.clear_workspace(workspace.as_ref(), &plan).await;

        let bytes = match output {
            Ok(bytes) => bytes,
            Err(err) => {
                self.progress.hide();
                return RunOutcome::EngineFailure(err.to_string());
            }
        };
        if bytes.is_empty() {
            self.progress.hide();
            return RunOutcome::EngineFailure("the engine produced an empty output".to_string());
        }

        let media_type = media_type_for(&plan.output_name, &video.file.declared_type);
        match self.results.publish(bytes, &media_type, &video.file.name) {
            Ok(summary) => {
                self.progress.complete();
                RunOutcome::Success(summary)
            }
            Err(err) => {
                self.progress.hide();
                RunOutcome::EngineFailure(err.to_string())
            }
        }
    }

    /// Probe the duration and enforce the minimum length
    async fn validate(&self, file: SelectedFile) -> Result<IntakeVideo, DomainError> {
        let duration = self.probe.probe_duration(&file.bytes).await?;
        debug!(duration, "Probed intake duration");
        IntakeVideo::new(file, duration)
    }

    /// Stage the input and invoke the engine
    async fn transcode(
        &self,
        workspace: &dyn EngineWorkspace,
        video: &IntakeVideo,
        plan: &TrimPlan,
        phases: &mut Vec<RunPhase>,
    ) -> Result<(), DomainError> {
        workspace.write(&plan.input_name, &video.file.bytes).await?;

        enter(phases, RunPhase::Transcoding);
        let observer = PhaseObserver::new(&self.progress, ProgressPhase::Transcoding);
        workspace.invoke(&plan.args, &observer).await
    }

    /// Best-effort removal of every staged entry
    async fn clear_workspace(&self, workspace: &dyn EngineWorkspace, plan: &TrimPlan) {
        for name in plan.staged_names() {
            if let Err(err) = workspace.remove(name).await {
                warn!(%name, %err, "Failed to remove staged workspace entry");
            }
        }
    }
}

fn enter(phases: &mut Vec<RunPhase>, phase: RunPhase) {
    debug!(?phase, "Entering run phase");
    phases.push(phase);
}
