//! Spawning external tools attached to the controlling terminal.
//!
//! Output is never captured: the child inherits stdin, stdout and stderr, so
//! whatever the tool prints shows up in real time. Only the exit status is
//! observed, and it is observed exactly once per spawned process.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, instrument};

/// One external tool invocation.
///
/// Built once with the consuming setters below and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// The command line as a user would type it.
    pub fn command_line(&self) -> String {
        render_command(&self.program, &self.args)
    }
}

impl Display for CommandSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.command_line())
    }
}

fn render_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Code(i32),
    Signal(i32),
    Unknown,
}

impl Termination {
    pub fn success(self) -> bool {
        self == Self::Code(0)
    }

    pub fn code(self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(code),
            _ => None,
        }
    }
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signal(signal);
            }
        }
        Self::Unknown
    }
}

impl Display for Termination {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(code) => write!(f, "code {code}"),
            Self::Signal(signal) => write!(f, "signal {signal}"),
            Self::Unknown => f.write_str("an unknown status"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    /// The tool could not be started at all.
    #[error("failed to start \"{}\": {}", render_command(.program, .args), .source)]
    Spawn {
        program: String,
        args: Vec<String>,
        #[source]
        source: io::Error,
    },

    /// The tool ran and reported failure.
    #[error("command \"{}\" exited with {}", render_command(.program, .args), .termination)]
    ExternalCommandFailure {
        program: String,
        args: Vec<String>,
        termination: Termination,
    },

    #[error("failed to wait for \"{command}\": {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to relay interrupt to \"{command}\": {source}")]
    Signal {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }

    /// The observed termination for `ExternalCommandFailure`.
    pub fn termination(&self) -> Option<Termination> {
        match self {
            Self::ExternalCommandFailure { termination, .. } => Some(*termination),
            _ => None,
        }
    }
}

/// A spawned external process whose exit has not been observed yet.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    spec: CommandSpec,
}

impl ProcessHandle {
    /// Spawns `spec` with the terminal's streams attached directly to the child.
    #[instrument(skip_all, fields(command = %spec))]
    pub fn spawn(spec: CommandSpec) -> Result<Self, RunError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| RunError::Spawn {
            program: spec.program.clone(),
            args: spec.args.clone(),
            source,
        })?;
        debug!(pid = child.id(), "spawned");

        Ok(Self { child, spec })
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            pid: self.child.id(),
            command: self.spec.command_line(),
        }
    }

    /// Waits for the child to exit. Consumes the handle, so the exit status
    /// can only be collected once.
    pub async fn wait(mut self) -> Result<Termination, RunError> {
        let status = self.child.wait().await.map_err(|source| RunError::Wait {
            command: self.spec.command_line(),
            source,
        })?;
        let termination = Termination::from(status);
        debug!(command = %self.spec, %termination, "exited");
        Ok(termination)
    }

    /// Waits for the child and turns anything but exit code zero into
    /// `RunError::ExternalCommandFailure`.
    pub async fn finish(self) -> Result<(), RunError> {
        let spec = self.spec.clone();
        let termination = self.wait().await?;
        if termination.success() {
            return Ok(());
        }
        Err(RunError::ExternalCommandFailure {
            program: spec.program,
            args: spec.args,
            termination,
        })
    }
}

/// Sends the interrupt signal to a running child without borrowing its handle.
#[derive(Debug, Clone)]
pub struct Interrupter {
    pid: Option<u32>,
    command: String,
}

impl Interrupter {
    /// Sends SIGINT to the child. Returns `false` when the child was already
    /// gone and nothing was delivered.
    #[cfg(unix)]
    pub fn interrupt(&self) -> Result<bool, RunError> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.pid else {
            debug!(command = %self.command, "child already reaped, interrupt dropped");
            return Ok(false);
        };
        let pid = i32::try_from(pid).map_err(|_| RunError::Signal {
            command: self.command.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"),
        })?;

        match kill(Pid::from_raw(pid), Signal::SIGINT) {
            Ok(()) => Ok(true),
            // Exited between the interrupt and the relay.
            Err(nix::errno::Errno::ESRCH) => Ok(false),
            Err(errno) => Err(RunError::Signal {
                command: self.command.clone(),
                source: io::Error::from(errno),
            }),
        }
    }

    /// Console interrupts already reach every process attached to the
    /// console, so nothing is sent here.
    #[cfg(not(unix))]
    pub fn interrupt(&self) -> Result<bool, RunError> {
        debug!(command = %self.command, pid = ?self.pid, "interrupt delivered by the console");
        Ok(false)
    }
}

/// Runs one external tool to completion.
///
/// Production code uses [`TerminalRunner`]; tests substitute a runner that
/// records invocations without spawning anything.
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + 'a>>;
}

/// Runner that spawns real processes sharing the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalRunner;

impl ProcessRunner for TerminalRunner {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + 'a>> {
        Box::pin(async move { ProcessHandle::spawn(spec.clone())?.finish().await })
    }
}
