//! Progress reporting contract for workflow steps.
//!
//! Reporters only render; nothing they do feeds back into control flow.

/// Renders the lifecycle of a workflow and its steps.
pub trait ProgressReporter: Send + Sync {
    /// Announces the workflow before any step starts.
    fn header(&self, title: &str);

    /// Starts a pending indicator for one step.
    fn start(&self, label: &str) -> Box<dyn TaskHandle>;

    /// Announces that every step of the workflow succeeded.
    fn finish(&self, message: &str);
}

/// The live indicator for one step.
///
/// Both methods consume the handle, so a step is marked exactly once.
pub trait TaskHandle: Send {
    fn succeed(self: Box<Self>);
    fn fail(self: Box<Self>, message: &str);
}
