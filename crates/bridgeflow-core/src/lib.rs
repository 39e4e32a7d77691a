//! Core logic for the Bridgeflow developer command runner.
//!
//! This crate defines the command names, project configuration, process
//! runner, workflow engine and interactive sessions used by the `bflow` CLI.

pub mod catalog;
pub mod command;
pub mod config;
pub mod constants;
pub mod process;
pub mod progress;
pub mod session;
pub mod workflow;

pub use catalog::{plan, Plan, PlanError};
pub use command::{CommandParseError, DevCommand};
pub use config::BridgeflowConfig;
pub use process::{
    CommandSpec, ProcessHandle, ProcessRunner, RunError, TerminalRunner, Termination,
};
pub use progress::{ProgressReporter, TaskHandle};
pub use session::{InteractiveSession, SessionOutcome, SessionPlan};
pub use workflow::{TaskStatus, Workflow, WorkflowAbort, WorkflowResult, WorkflowStep};
