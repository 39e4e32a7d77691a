use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use bridgeflow_core::constants::CONFIG_FILE;
use bridgeflow_core::{
    plan, BridgeflowConfig, DevCommand, InteractiveSession, Plan, ProgressReporter, RunError,
    SessionOutcome, SessionPlan, TerminalRunner, WorkflowResult,
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod reporter;
mod styles;

use reporter::SpinnerReporter;
use styles::{self as s, StreamColors};

/// The command-line interface for Bridgeflow.
#[derive(Debug, Parser)]
#[command(name = "bflow")]
#[command(version)]
#[command(styles = s::get_clap_styles())]
#[command(
    help_template = "{bin} {version}\n\n{about-with-newline}{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
#[command(about = "Developer workflows for a Flutter app with a native Rust library")]
#[command(
    long_about = "Bridgeflow sequences the tools a Flutter + Rust project needs (dependency
fetch, native build, binding generation, app launch) into named commands with
consistent progress output and exit codes.

Commands:
  setup             Fetch app dependencies, build the native library, generate bindings
  build             Build the native library, then fetch app dependencies
  clean             Clean app and native build artifacts
  generate          Generate the cross-language bindings
  dev               Launch the app with hot reload (Ctrl+C is forwarded to the app)
  run               Launch the app with verbose output
"
)]
#[command(
    after_help = "\x1b[1;32mExamples:\x1b[0m\n  \x1b[36mbflow setup\x1b[0m               \x1b[2m# Prepare a fresh checkout\x1b[0m\n  \x1b[36mbflow build --dry-run\x1b[0m     \x1b[2m# Show the build steps without running them\x1b[0m\n  \x1b[36mbflow dev -- -d chrome\x1b[0m    \x1b[2m# Hot reload on a specific device\x1b[0m"
)]
pub(crate) struct Cli {
    /// Command to run: setup, build, clean, generate, dev, run
    command: Option<String>,
    /// Extra arguments passed verbatim to the launched app (`dev` and `run` only).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    passthrough: Vec<String>,
    /// Path to the bridgeflow config file. Defaults to `bridgeflow.toml` when present.
    #[arg(long)]
    config: Option<String>,
    /// Print the resolved steps instead of running them.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Disable spinner animation.
    #[arg(long, default_value_t = false)]
    plain: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    debug!("parsed cli arguments: {:?}", cli);

    let colors = StreamColors::detect();
    match run(&cli, colors).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("\n{} {err:#}", s::paint(s::ERROR, "error:", colors.stderr));
            ExitCode::FAILURE
        }
    }
}

/// Resolves and executes one command, returning the process exit status.
///
/// This is the only place a result becomes an exit code.
async fn run(cli: &Cli, colors: StreamColors) -> Result<u8> {
    let command_name = match &cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            return Ok(0);
        }
    };

    let command = DevCommand::from_str(command_name)
        .map_err(|e| anyhow!("failed to parse command '{}': {e}", command_name))?;

    let (config_path, explicit) = match &cli.config {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from(CONFIG_FILE), false),
    };
    let cfg = BridgeflowConfig::load(&config_path, explicit)
        .with_context(|| format!("unable to load config '{}'", config_path.display()))?;

    let plan = plan(command, &cfg, &cli.passthrough)?;

    if cli.dry_run {
        print!("{}", render_plan(&plan));
        return Ok(0);
    }

    let animate = !cli.plain && std::io::stderr().is_terminal();
    let reporter = SpinnerReporter::new(animate, colors);

    let code = match plan {
        Plan::Sequence(workflow) => {
            let result = workflow.run(&TerminalRunner, &reporter).await;
            let (code, message) = workflow_exit(&result);
            if let Some(message) = message {
                eprintln!("\n{}", reporter.error(&message));
            }
            code
        }
        Plan::Interactive(session) => {
            reporter.header(&session.header);
            for note in &session.notes {
                println!("{}", reporter.note(note));
            }
            if !session.notes.is_empty() {
                println!();
            }

            let mut attached = InteractiveSession::from_plan(&session);
            if let Some(note) = &session.interrupt_note {
                let line = reporter.note(note);
                attached = attached.on_interrupt(move || println!("\n{line}"));
            }
            let outcome = attached.attach().await;
            let (code, message) = session_exit(command, &session, &outcome);
            if let Some(message) = message {
                eprintln!("\n{}", reporter.error(&message));
            }
            code
        }
    };

    info!(%command, code, "done");
    Ok(code)
}

/// Exit status for a sequential workflow, plus the failure line to print.
fn workflow_exit(result: &WorkflowResult) -> (u8, Option<String>) {
    match result.failure() {
        None => (0, None),
        Some(abort) => (1, Some(format!("Error: {abort}"))),
    }
}

/// Exit status for an interactive session.
///
/// `dev` mirrors the child's exit code; `run` collapses any failure to 1.
fn session_exit(
    command: DevCommand,
    session: &SessionPlan,
    outcome: &Result<SessionOutcome, RunError>,
) -> (u8, Option<String>) {
    match (command, outcome) {
        (_, Err(err)) => (1, Some(format!("Error while running {}: {err}", session.name))),
        (DevCommand::Run, Ok(outcome)) if !outcome.termination.success() => {
            let err = RunError::ExternalCommandFailure {
                program: session.spec.program().to_string(),
                args: session.spec.arguments().to_vec(),
                termination: outcome.termination,
            };
            (1, Some(format!("Error while running {}: {err}", session.name)))
        }
        (_, Ok(outcome)) => {
            let code = outcome.exit_code();
            let message = (code != 0).then(|| {
                format!("{} exited with code {code}", session.spec.program())
            });
            (clamp_exit_code(code), message)
        }
    }
}

fn clamp_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

/// Human-readable description of what a plan would do.
fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    match plan {
        Plan::Sequence(workflow) => {
            out.push_str(&format!("{} (dry-run)\n", workflow.name()));
            out.push_str(&format!("  header: {}\n", workflow.header()));
            for (index, step) in workflow.steps().iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", index + 1, step.label()));
                out.push_str(&format!("       cmd: {}\n", step.spec()));
                if let Some(dir) = step.spec().working_dir() {
                    out.push_str(&format!("       cwd: {}\n", dir.display()));
                }
            }
            out.push_str(&format!("  on success: {}\n", workflow.completion()));
        }
        Plan::Interactive(session) => {
            out.push_str(&format!("{} (dry-run, interactive)\n", session.name));
            out.push_str(&format!("  header: {}\n", session.header));
            out.push_str(&format!("  cmd: {}\n", session.spec));
            if let Some(dir) = session.spec.working_dir() {
                out.push_str(&format!("  cwd: {}\n", dir.display()));
            }
            out.push_str(&format!(
                "  relay Ctrl+C: {}\n",
                if session.relay_interrupts { "yes" } else { "no" }
            ));
        }
    }
    out
}
