//! Composite progress aggregation and terminal renderers

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::domain::model::ProgressState;
use crate::ports::{ProgressObserver, ProgressSink};
use crate::utils::lock;

/// Phases contributing to the composite percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressPhase {
    /// Engine asset acquisition, `[0, 30)`
    EngineLoad,
    /// Engine invocation, `[30, 90)`
    Transcoding,
    /// Output collection and cleanup, `[90, 100]`
    Finalizing,
    /// Terminal 100%
    Complete,
}

impl ProgressPhase {
    /// Composite window as `(start, end)`
    pub fn window(self) -> (u8, u8) {
        match self {
            ProgressPhase::EngineLoad => (0, 30),
            ProgressPhase::Transcoding => (30, 90),
            ProgressPhase::Finalizing => (90, 100),
            ProgressPhase::Complete => (100, 100),
        }
    }

    /// Highest value the phase may produce; half-open windows stop one short
    fn ceiling(self) -> u8 {
        let (_, end) = self.window();
        match self {
            ProgressPhase::EngineLoad | ProgressPhase::Transcoding => end - 1,
            ProgressPhase::Finalizing | ProgressPhase::Complete => end,
        }
    }
}

/// Clamp an engine-reported fraction into `[0, 1]`; NaN counts as zero
pub fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// Map a phase-local fraction to the composite percentage
pub fn composite_percent(phase: ProgressPhase, fraction: f64) -> u8 {
    let (start, end) = phase.window();
    let span = f64::from(end - start);
    let value = f64::from(start) + (clamp_fraction(fraction) * span).floor();
    (value as u8).min(phase.ceiling())
}

/// Label shown next to the bar for a phase
pub fn phase_label(phase: ProgressPhase, fraction: f64) -> String {
    match phase {
        ProgressPhase::EngineLoad => "Loading engine...".to_string(),
        ProgressPhase::Transcoding => format!(
            "Trimming video... {}%",
            (clamp_fraction(fraction) * 100.0).round() as u8
        ),
        ProgressPhase::Finalizing => "Finalizing...".to_string(),
        ProgressPhase::Complete => "Complete!".to_string(),
    }
}

/// Stateful aggregator: keeps the high-water mark and fans snapshots out to sinks
pub struct ProgressAggregator {
    state: Mutex<ProgressState>,
    sinks: Mutex<Vec<Arc<dyn ProgressSink>>>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProgressState::hidden()),
            sinks: Mutex::new(Vec::new()),
        }
    }

    /// Register a consumer of progress snapshots
    pub fn add_sink(&self, sink: Arc<dyn ProgressSink>) {
        lock(&self.sinks).push(sink);
    }

    /// Start a new monotonic sequence at the opening of `phase`
    pub fn begin(&self, phase: ProgressPhase) {
        let percent = composite_percent(phase, 0.0);
        let label = phase_label(phase, 0.0);
        self.publish(|state| {
            state.visible = true;
            state.percent = percent;
            state.label = label;
        });
    }

    /// Report phase-local progress and return the composite percentage
    pub fn report(&self, phase: ProgressPhase, fraction: f64) -> u8 {
        let composite = composite_percent(phase, fraction);
        let label = phase_label(phase, fraction);
        self.publish(|state| {
            state.visible = true;
            state.percent = state.percent.max(composite);
            state.label = label;
        })
        .percent
    }

    /// Jump to 100% with the completion label
    pub fn complete(&self) {
        self.report(ProgressPhase::Complete, 1.0);
    }

    /// Hide the indicator and reset it to zero
    pub fn hide(&self) {
        self.publish(|state| *state = ProgressState::hidden());
    }

    /// Current indicator state
    pub fn snapshot(&self) -> ProgressState {
        lock(&self.state).clone()
    }

    fn publish<F>(&self, update: F) -> ProgressState
    where
        F: FnOnce(&mut ProgressState),
    {
        let snapshot = {
            let mut state = lock(&self.state);
            update(&mut state);
            state.clone()
        };

        let sinks: Vec<Arc<dyn ProgressSink>> = lock(&self.sinks).clone();
        for sink in sinks {
            sink.on_state(&snapshot);
        }
        snapshot
    }
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes an engine's native progress signal into one phase of an aggregator
pub struct PhaseObserver<'a> {
    aggregator: &'a ProgressAggregator,
    phase: ProgressPhase,
}

impl<'a> PhaseObserver<'a> {
    pub fn new(aggregator: &'a ProgressAggregator, phase: ProgressPhase) -> Self {
        Self { aggregator, phase }
    }
}

impl ProgressObserver for PhaseObserver<'_> {
    fn on_progress(&self, fraction: f64) {
        self.aggregator.report(self.phase, fraction);
    }
}

/// Console progress renderer for CLI usage
pub struct ConsoleProgressSink {
    last: Mutex<Option<ProgressState>>,
}

impl ConsoleProgressSink {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    /// Render one line, e.g. `[########............]  42% Trimming video... 20%`
    pub fn render(state: &ProgressState) -> String {
        let bar_length = 20usize;
        let filled = usize::from(state.percent.min(100)) * bar_length / 100;
        format!(
            "[{}{}] {:>3}% {}",
            "#".repeat(filled),
            ".".repeat(bar_length - filled),
            state.percent,
            state.label
        )
    }
}

impl Default for ConsoleProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgressSink {
    fn on_state(&self, state: &ProgressState) {
        let mut last = lock(&self.last);
        if last.as_ref() == Some(state) {
            return;
        }
        *last = Some(state.clone());

        if state.visible {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout, "{}", Self::render(state));
        }
    }
}

/// JSON progress renderer for structured output
pub struct JsonProgressSink;

impl JsonProgressSink {
    pub fn event(state: &ProgressState) -> serde_json::Value {
        serde_json::json!({
            "event": "progress",
            "visible": state.visible,
            "percent": state.percent,
            "label": state.label,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })
    }
}

impl ProgressSink for JsonProgressSink {
    fn on_state(&self, state: &ProgressState) {
        println!("{}", Self::event(state));
    }
}
