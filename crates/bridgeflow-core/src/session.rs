//! Foreground sessions for long-running tools (`dev`, `run`).
//!
//! A session hands the terminal to one child process for its whole lifetime.
//! There is no progress indicator. When interrupt relay is enabled, every
//! Ctrl+C received by the orchestrator is forwarded to the child, and the
//! orchestrator keeps waiting until the child has actually exited.

use std::fmt::{Debug, Formatter};
use std::io;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::process::{CommandSpec, ProcessHandle, RunError, Termination};

/// A resolved interactive command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub name: String,
    pub header: String,
    pub notes: Vec<String>,
    pub spec: CommandSpec,
    pub relay_interrupts: bool,
    /// Shown to the user each time an interrupt is relayed.
    pub interrupt_note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub termination: Termination,
    pub interrupts_relayed: usize,
}

impl SessionOutcome {
    /// The child's exit code; a signal or unknown status counts as success.
    pub fn exit_code(&self) -> i32 {
        self.termination.code().unwrap_or(0)
    }
}

type InterruptHook = Box<dyn Fn() + Send + Sync>;

pub struct InteractiveSession {
    spec: CommandSpec,
    relay_interrupts: bool,
    on_interrupt: Option<InterruptHook>,
}

impl Debug for InteractiveSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveSession")
            .field("spec", &self.spec)
            .field("relay_interrupts", &self.relay_interrupts)
            .field("on_interrupt", &self.on_interrupt.is_some())
            .finish()
    }
}

impl InteractiveSession {
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            relay_interrupts: false,
            on_interrupt: None,
        }
    }

    pub fn from_plan(plan: &SessionPlan) -> Self {
        Self::new(plan.spec.clone()).relay_interrupts(plan.relay_interrupts)
    }

    pub fn relay_interrupts(mut self, enabled: bool) -> Self {
        self.relay_interrupts = enabled;
        self
    }

    /// Called once for every interrupt received while relay is active,
    /// before it is forwarded to the child.
    pub fn on_interrupt(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_interrupt = Some(Box::new(hook));
        self
    }

    /// Spawns the child on the terminal and waits for it to exit.
    ///
    /// With relay enabled, an interrupt listener is installed for exactly the
    /// duration of this call.
    pub async fn attach(self) -> Result<SessionOutcome, RunError> {
        if !self.relay_interrupts {
            let handle = ProcessHandle::spawn(self.spec)?;
            let termination = handle.wait().await?;
            return Ok(SessionOutcome {
                termination,
                interrupts_relayed: 0,
            });
        }

        let command = self.spec.command_line();
        let (listener, interrupts) =
            InterruptListener::install().map_err(|source| RunError::Signal {
                command: command.clone(),
                source,
            })?;
        let outcome = self.attach_with(interrupts).await;
        drop(listener);
        debug!(%command, "interrupt listener removed");
        outcome
    }

    /// Same as [`attach`](Self::attach) with relay, driven by an explicit
    /// stream of interrupt occurrences.
    pub async fn attach_with(
        self,
        interrupts: mpsc::Receiver<()>,
    ) -> Result<SessionOutcome, RunError> {
        let Self { spec, on_interrupt, .. } = self;
        let handle = ProcessHandle::spawn(spec)?;
        relay_until_exit(handle, interrupts, on_interrupt.as_deref()).await
    }
}

async fn relay_until_exit(
    handle: ProcessHandle,
    mut interrupts: mpsc::Receiver<()>,
    on_interrupt: Option<&(dyn Fn() + Send + Sync)>,
) -> Result<SessionOutcome, RunError> {
    let interrupter = handle.interrupter();
    let exited = handle.wait();
    tokio::pin!(exited);

    let mut relayed = 0;
    let mut listening = true;
    loop {
        tokio::select! {
            termination = &mut exited => {
                return Ok(SessionOutcome {
                    termination: termination?,
                    interrupts_relayed: relayed,
                });
            }
            received = interrupts.recv(), if listening => match received {
                Some(()) => {
                    info!("stopping child after interrupt");
                    if let Some(hook) = on_interrupt {
                        hook();
                    }
                    match interrupter.interrupt() {
                        Ok(true) => relayed += 1,
                        Ok(false) => debug!("interrupt not delivered by the orchestrator"),
                        Err(err) => warn!(error = %err, "interrupt relay failed"),
                    }
                }
                None => listening = false,
            },
        }
    }
}

/// Process-wide Ctrl+C listener that lives as long as this value.
pub struct InterruptListener {
    task: JoinHandle<()>,
}

impl InterruptListener {
    pub fn install() -> io::Result<(Self, mpsc::Receiver<()>)> {
        let (tx, rx) = mpsc::channel(8);

        #[cfg(unix)]
        let task = {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigint = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                while sigint.recv().await.is_some() {
                    if tx.send(()).await.is_err() {
                        break;
                    }
                }
            })
        };

        #[cfg(not(unix))]
        let task = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        Ok((Self { task }, rx))
    }
}

impl Drop for InterruptListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
