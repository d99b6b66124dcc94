//! Executes workflows stage by stage
//!
//! Within a stage, sequential steps are awaited in declaration order while parallel
//! steps are spawned and left running. The end of a stage is the only join point:
//! every parallel task spawned in the stage must finish before the next stage starts.

use crate::error::{Result, TabscanError};
use crate::workflow::observer::ProgressObserver;
use crate::workflow::step::{
    ProgressKind, StepAction, StepMode, StepOutput, Workflow, WorkflowStage, WorkflowStep,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Outcome of one finished step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    pub output: StepOutput,
    /// Wall time measured by the runner, independent of what the action reported
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub name: String,
    /// Reports in declaration order, whatever order the steps finished in
    pub steps: Vec<StepReport>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkflowReport {
    pub stages: Vec<StageReport>,
    pub elapsed: Duration,
}

impl WorkflowReport {
    /// Find a step report by name across all stages
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.stages
            .iter()
            .flat_map(|stage| stage.steps.iter())
            .find(|step| step.name == name)
    }
}

type PendingStep = (usize, JoinHandle<Result<StepReport>>);

/// Drives a [`Workflow`] against a shared context
pub struct WorkflowRunner {
    observer: Arc<dyn ProgressObserver>,
}

impl WorkflowRunner {
    pub fn new(observer: Arc<dyn ProgressObserver>) -> Self {
        Self { observer }
    }

    /// Run every stage in order.
    ///
    /// The first failing step aborts the workflow: parallel tasks still pending in
    /// the current stage are aborted and the error is returned wrapped with the
    /// stage and step name.
    pub async fn execute<C: Send + Sync + 'static>(
        &self,
        workflow: &mut Workflow<C>,
        context: Arc<C>,
    ) -> Result<WorkflowReport> {
        let started = Instant::now();
        let mut report = WorkflowReport::default();

        for stage in workflow.stages.iter_mut() {
            let stage_report = self.execute_stage(stage, &context).await?;
            self.observer
                .stage_completed(&stage_report.name, stage_report.elapsed);
            report.stages.push(stage_report);
        }

        report.elapsed = started.elapsed();
        self.observer.workflow_completed(report.elapsed);

        Ok(report)
    }

    async fn execute_stage<C: Send + Sync + 'static>(
        &self,
        stage: &mut WorkflowStage<C>,
        context: &Arc<C>,
    ) -> Result<StageReport> {
        let started = Instant::now();
        let mut reports: Vec<Option<StepReport>> = vec![None; stage.steps.len()];
        let mut pending: Vec<PendingStep> = Vec::new();

        for (index, step) in stage.steps.iter_mut().enumerate() {
            match step.mode {
                StepMode::Parallel => {
                    let handle = tokio::spawn(run_step(
                        Arc::clone(&self.observer),
                        stage.name.clone(),
                        StepHandle::from(&*step),
                        Arc::clone(context),
                    ));
                    pending.push((index, handle));
                }
                StepMode::Sequential => {
                    let result = run_step(
                        Arc::clone(&self.observer),
                        stage.name.clone(),
                        StepHandle::from(&*step),
                        Arc::clone(context),
                    )
                    .await;

                    match result {
                        Ok(step_report) => {
                            step.completed = step_report.output.clone();
                            reports[index] = Some(step_report);
                        }
                        Err(error) => {
                            abort_all(&pending);
                            return Err(TabscanError::step_failed(&stage.name, &step.name, error));
                        }
                    }
                }
            }
        }

        for position in 0..pending.len() {
            let index = pending[position].0;
            let joined = (&mut pending[position].1).await;
            let step_name = stage.steps[index].name.clone();

            let result = match joined {
                Ok(result) => result,
                Err(join_error) => Err(TabscanError::other(format!(
                    "Parallel step task did not complete: {join_error}"
                ))),
            };

            match result {
                Ok(step_report) => {
                    stage.steps[index].completed = step_report.output.clone();
                    reports[index] = Some(step_report);
                }
                Err(error) => {
                    abort_all(&pending[position + 1..]);
                    return Err(TabscanError::step_failed(&stage.name, step_name, error));
                }
            }
        }

        Ok(StageReport {
            name: stage.name.clone(),
            steps: reports.into_iter().flatten().collect(),
            elapsed: started.elapsed(),
        })
    }
}

/// Owned view of a step that can move into a spawned task
struct StepHandle<C: Send + Sync + 'static> {
    name: String,
    start_message: String,
    progress: ProgressKind,
    action: Arc<dyn StepAction<C>>,
}

impl<C: Send + Sync + 'static> From<&WorkflowStep<C>> for StepHandle<C> {
    fn from(step: &WorkflowStep<C>) -> Self {
        Self {
            name: step.name.clone(),
            start_message: step.start_message.clone(),
            progress: step.progress,
            action: Arc::clone(&step.action),
        }
    }
}

async fn run_step<C: Send + Sync + 'static>(
    observer: Arc<dyn ProgressObserver>,
    stage: String,
    step: StepHandle<C>,
    context: Arc<C>,
) -> Result<StepReport> {
    observer.step_started(&stage, &step.name, &step.start_message, step.progress);

    let started = Instant::now();
    let output = step.action.run(context).await?;
    let elapsed = started.elapsed();

    observer.step_completed(&stage, &step.name, &output, step.progress);

    Ok(StepReport {
        name: step.name,
        output,
        elapsed,
    })
}

fn abort_all(pending: &[PendingStep]) {
    for (_, handle) in pending {
        handle.abort();
    }
}
