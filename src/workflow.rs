//! Stage-based workflow orchestration.
//!
//! A [`Workflow`] is an ordered list of [`WorkflowStage`]s, each an ordered list of
//! [`WorkflowStep`]s. Steps are plain data: a name, progress messages, a mode tag and
//! an opaque [`StepAction`]. The [`WorkflowRunner`] decides when to await each action
//! and reports progress to a [`ProgressObserver`].

pub mod observer;
pub mod runner;
pub mod step;

pub use observer::{LogObserver, ProgressEvent, ProgressObserver, RecordingObserver};
pub use runner::{StageReport, StepReport, WorkflowReport, WorkflowRunner};
pub use step::{ProgressKind, StepAction, StepMode, StepOutput, Workflow, WorkflowStage, WorkflowStep};
