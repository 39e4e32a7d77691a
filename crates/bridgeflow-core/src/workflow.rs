use std::fmt::{Display, Formatter};

use tracing::{info, instrument, warn};

use crate::process::{CommandSpec, ProcessRunner};
use crate::progress::ProgressReporter;

/// State of a single step. Leaves `Pending` at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed(String),
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A labelled tool invocation inside a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStep {
    label: String,
    spec: CommandSpec,
}

impl WorkflowStep {
    pub fn new(label: impl Into<String>, spec: CommandSpec) -> Self {
        Self {
            label: label.into(),
            spec,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Runs the step under a progress indicator and returns its terminal status.
    ///
    /// Failures are rendered here and handed back as `TaskStatus::Failed`; they
    /// never propagate as errors.
    pub async fn execute(
        &self,
        runner: &dyn ProcessRunner,
        reporter: &dyn ProgressReporter,
    ) -> TaskStatus {
        let task = reporter.start(&self.label);
        match runner.run(&self.spec).await {
            Ok(()) => {
                task.succeed();
                TaskStatus::Succeeded
            }
            Err(err) => {
                let message = err.to_string();
                warn!(step = %self.label, error = %message, "step failed");
                task.fail(&message);
                TaskStatus::Failed(message)
            }
        }
    }
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    name: String,
    header: String,
    completion: String,
    steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(
        name: impl Into<String>,
        header: impl Into<String>,
        completion: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            header: header.into(),
            completion: completion.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, label: impl Into<String>, spec: CommandSpec) -> Self {
        self.steps.push(WorkflowStep::new(label, spec));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn completion(&self) -> &str {
        &self.completion
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Executes the steps strictly in order, stopping at the first failure.
    ///
    /// Steps after a failure are never started and stay `Pending` in the result.
    #[instrument(skip_all, fields(workflow = %self.name))]
    pub async fn run(
        &self,
        runner: &dyn ProcessRunner,
        reporter: &dyn ProgressReporter,
    ) -> WorkflowResult {
        info!(steps = self.steps.len(), "workflow started");
        reporter.header(&self.header);

        let mut reports = self
            .steps
            .iter()
            .map(|step| StepReport {
                label: step.label.clone(),
                status: TaskStatus::Pending,
            })
            .collect::<Vec<_>>();

        for (index, step) in self.steps.iter().enumerate() {
            let status = step.execute(runner, reporter).await;
            let failed = matches!(status, TaskStatus::Failed(_));
            reports[index].status = status;
            if failed {
                warn!(step = %step.label, "workflow aborted");
                return WorkflowResult {
                    workflow: self.name.clone(),
                    steps: reports,
                    failed_at: Some(index),
                };
            }
        }

        reporter.finish(&self.completion);
        info!("workflow finished");
        WorkflowResult {
            workflow: self.name.clone(),
            steps: reports,
            failed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub label: String,
    pub status: TaskStatus,
}

/// Outcome of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowResult {
    workflow: String,
    steps: Vec<StepReport>,
    failed_at: Option<usize>,
}

impl WorkflowResult {
    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    pub fn steps(&self) -> &[StepReport] {
        &self.steps
    }

    pub fn statuses(&self) -> impl Iterator<Item = &TaskStatus> {
        self.steps.iter().map(|s| &s.status)
    }

    pub fn failed_at(&self) -> Option<usize> {
        self.failed_at
    }

    pub fn is_success(&self) -> bool {
        self.failed_at.is_none()
    }

    /// The step that aborted the workflow, if any.
    pub fn failure(&self) -> Option<WorkflowAbort<'_>> {
        let index = self.failed_at?;
        let step = &self.steps[index];
        let message = match &step.status {
            TaskStatus::Failed(message) => message.as_str(),
            _ => "",
        };
        Some(WorkflowAbort {
            workflow: &self.workflow,
            index,
            label: &step.label,
            message,
        })
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// A workflow stopped by a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowAbort<'a> {
    pub workflow: &'a str,
    pub index: usize,
    pub label: &'a str,
    pub message: &'a str,
}

impl Display for WorkflowAbort<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed at step '{}': {}",
            self.workflow, self.label, self.message
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes shared by workflow and catalog tests.

    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};

    use crate::process::{CommandSpec, ProcessRunner, RunError, Termination};
    use crate::progress::{ProgressReporter, TaskHandle};

    /// Records every spec it is asked to run; fails the invocation whose
    /// program matches `fail_program`.
    #[derive(Debug, Default)]
    pub struct FakeRunner {
        pub invoked: Mutex<Vec<CommandSpec>>,
        pub fail_program: Option<String>,
    }

    impl FakeRunner {
        pub fn failing_on(program: &str) -> Self {
            Self {
                invoked: Mutex::default(),
                fail_program: Some(program.to_string()),
            }
        }

        pub fn invoked_lines(&self) -> Vec<String> {
            self.invoked
                .lock()
                .unwrap()
                .iter()
                .map(CommandSpec::command_line)
                .collect()
        }
    }

    impl ProcessRunner for FakeRunner {
        fn run<'a>(
            &'a self,
            spec: &'a CommandSpec,
        ) -> Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + 'a>> {
            Box::pin(async move {
                self.invoked.lock().unwrap().push(spec.clone());
                if self.fail_program.as_deref() == Some(spec.program()) {
                    return Err(RunError::ExternalCommandFailure {
                        program: spec.program().to_string(),
                        args: spec.arguments().to_vec(),
                        termination: Termination::Code(1),
                    });
                }
                Ok(())
            })
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Header(String),
        Start(String),
        Succeed(String),
        Fail(String, String),
        Finish(String),
    }

    #[derive(Debug, Default, Clone)]
    pub struct RecordingReporter {
        pub events: Arc<Mutex<Vec<Event>>>,
    }

    impl RecordingReporter {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    struct RecordingTask {
        label: String,
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl TaskHandle for RecordingTask {
        fn succeed(self: Box<Self>) {
            self.events.lock().unwrap().push(Event::Succeed(self.label));
        }

        fn fail(self: Box<Self>, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Fail(self.label, message.to_string()));
        }
    }

    impl ProgressReporter for RecordingReporter {
        fn header(&self, title: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Header(title.to_string()));
        }

        fn start(&self, label: &str) -> Box<dyn TaskHandle> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Start(label.to_string()));
            Box::new(RecordingTask {
                label: label.to_string(),
                events: Arc::clone(&self.events),
            })
        }

        fn finish(&self, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Finish(message.to_string()));
        }
    }
}
