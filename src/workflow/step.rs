//! Step, stage and workflow definitions

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// How the runner schedules a step relative to the ones after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Awaited before the next step starts
    Sequential,
    /// Spawned and joined at the end of its stage
    Parallel,
}

/// How progress for a step should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    /// Spinner-style status while the step runs
    Status,
    /// Plain informational message
    Message,
}

/// Completion message produced by a step
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepOutput {
    pub message: String,
    pub value: Option<String>,
    pub elapsed: Option<Duration>,
}

impl StepOutput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            value: None,
            elapsed: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }
}

impl fmt::Display for StepOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(value) = &self.value {
            write!(f, " {value}")?;
        }
        if let Some(elapsed) = self.elapsed {
            write!(f, " ({elapsed:?})")?;
        }
        Ok(())
    }
}

/// The work behind a step.
///
/// Actions receive the shared workflow context and return their completion
/// message. Any `Fn(Arc<C>) -> impl Future<Output = Result<StepOutput>>` closure is
/// an action.
#[async_trait]
pub trait StepAction<C: Send + Sync + 'static>: Send + Sync {
    async fn run(&self, context: Arc<C>) -> Result<StepOutput>;
}

#[async_trait]
impl<C, F, Fut> StepAction<C> for F
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<StepOutput>> + Send + 'static,
{
    async fn run(&self, context: Arc<C>) -> Result<StepOutput> {
        (self)(context).await
    }
}

/// One named unit of work
pub struct WorkflowStep<C: Send + Sync + 'static> {
    pub name: String,
    pub start_message: String,
    /// Replaced by the action's output once the step finishes
    pub completed: StepOutput,
    pub mode: StepMode,
    pub progress: ProgressKind,
    pub(crate) action: Arc<dyn StepAction<C>>,
}

impl<C: Send + Sync + 'static> WorkflowStep<C> {
    /// A sequential, status-style step running `action`
    pub fn new<F, Fut>(name: impl Into<String>, start_message: impl Into<String>, action: F) -> Self
    where
        F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StepOutput>> + Send + 'static,
    {
        Self::from_action(name, start_message, action)
    }

    /// A sequential, status-style step backed by any [`StepAction`]
    pub fn from_action(
        name: impl Into<String>,
        start_message: impl Into<String>,
        action: impl StepAction<C> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            start_message: start_message.into(),
            completed: StepOutput::default(),
            mode: StepMode::Sequential,
            progress: ProgressKind::Status,
            action: Arc::new(action),
        }
    }

    pub fn parallel(mut self) -> Self {
        self.mode = StepMode::Parallel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressKind) -> Self {
        self.progress = progress;
        self
    }
}

impl<C: Send + Sync + 'static> fmt::Debug for WorkflowStep<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStep")
            .field("name", &self.name)
            .field("start_message", &self.start_message)
            .field("completed", &self.completed)
            .field("mode", &self.mode)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

/// Ordered steps sharing one join point for their parallel tasks
#[derive(Debug)]
pub struct WorkflowStage<C: Send + Sync + 'static> {
    pub name: String,
    pub steps: Vec<WorkflowStep<C>>,
}

impl<C: Send + Sync + 'static> WorkflowStage<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: WorkflowStep<C>) -> Self {
        self.steps.push(step);
        self
    }
}

#[derive(Debug)]
pub struct Workflow<C: Send + Sync + 'static> {
    pub stages: Vec<WorkflowStage<C>>,
}

impl<C: Send + Sync + 'static> Workflow<C> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn stage(mut self, stage: WorkflowStage<C>) -> Self {
        self.stages.push(stage);
        self
    }
}

impl<C: Send + Sync + 'static> Default for Workflow<C> {
    fn default() -> Self {
        Self::new()
    }
}
