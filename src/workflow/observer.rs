//! Progress observers receiving workflow events

use crate::workflow::step::{ProgressKind, StepOutput};
use parking_lot::Mutex;
use std::time::Duration;

/// Receives start and completion events from the runner.
///
/// Parallel steps report from their own task, so implementations must tolerate
/// concurrent calls.
pub trait ProgressObserver: Send + Sync {
    fn step_started(&self, stage: &str, step: &str, message: &str, progress: ProgressKind);

    fn step_completed(&self, stage: &str, step: &str, output: &StepOutput, progress: ProgressKind);

    fn stage_completed(&self, _stage: &str, _elapsed: Duration) {}

    fn workflow_completed(&self, _elapsed: Duration) {}
}

/// Observer that forwards every event to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn step_started(&self, stage: &str, step: &str, message: &str, progress: ProgressKind) {
        match progress {
            ProgressKind::Status => log::info!("[{stage}] {message}..."),
            ProgressKind::Message => log::debug!("[{stage}] {step}: {message}"),
        }
    }

    fn step_completed(&self, stage: &str, _step: &str, output: &StepOutput, _progress: ProgressKind) {
        log::info!("[{stage}] {output}");
    }

    fn stage_completed(&self, stage: &str, elapsed: Duration) {
        log::debug!("[{stage}] stage finished in {elapsed:?}");
    }

    fn workflow_completed(&self, elapsed: Duration) {
        log::info!("Workflow completed ({elapsed:?})");
    }
}

/// One event captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started { stage: String, step: String },
    Completed { stage: String, step: String, output: StepOutput },
    StageCompleted { stage: String },
    WorkflowCompleted,
}

/// Observer that keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Completion output recorded for `step`, if it finished
    pub fn completed_output(&self, step: &str) -> Option<StepOutput> {
        self.events.lock().iter().find_map(|event| match event {
            ProgressEvent::Completed { step: s, output, .. } if s == step => Some(output.clone()),
            _ => None,
        })
    }
}

impl ProgressObserver for RecordingObserver {
    fn step_started(&self, stage: &str, step: &str, _message: &str, _progress: ProgressKind) {
        self.events.lock().push(ProgressEvent::Started {
            stage: stage.to_string(),
            step: step.to_string(),
        });
    }

    fn step_completed(&self, stage: &str, step: &str, output: &StepOutput, _progress: ProgressKind) {
        self.events.lock().push(ProgressEvent::Completed {
            stage: stage.to_string(),
            step: step.to_string(),
            output: output.clone(),
        });
    }

    fn stage_completed(&self, stage: &str, _elapsed: Duration) {
        self.events.lock().push(ProgressEvent::StageCompleted {
            stage: stage.to_string(),
        });
    }

    fn workflow_completed(&self, _elapsed: Duration) {
        self.events.lock().push(ProgressEvent::WorkflowCompleted);
    }
}
