//! The fixed step sequences behind each developer command.

use thiserror::Error;
use tracing::debug;

use crate::command::DevCommand;
use crate::config::BridgeflowConfig;
use crate::process::CommandSpec;
use crate::session::SessionPlan;
use crate::workflow::Workflow;

pub const LABEL_APP_DEPS: &str = "Getting application dependencies";
pub const LABEL_NATIVE_BUILD: &str = "Building native library";
pub const LABEL_CODEGEN: &str = "Generating bindings";
pub const LABEL_APP_CLEAN: &str = "Cleaning application project";
pub const LABEL_NATIVE_CLEAN: &str = "Cleaning native build artifacts";

/// What a command resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Sequence(Workflow),
    Interactive(SessionPlan),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("'{0}' runs several tools and does not accept extra arguments")]
    PassthroughNotSupported(DevCommand),
}

/// Resolves `command` against the project configuration.
///
/// `passthrough` is appended verbatim to the launch command of `dev` and `run`.
pub fn plan(
    command: DevCommand,
    cfg: &BridgeflowConfig,
    passthrough: &[String],
) -> Result<Plan, PlanError> {
    if !command.is_interactive() && !passthrough.is_empty() {
        return Err(PlanError::PassthroughNotSupported(command));
    }

    let name = cfg.project_name();
    debug!(%command, project = %name, "planning");

    let plan = match command {
        DevCommand::Setup => Plan::Sequence(
            Workflow::new(
                "setup",
                format!("Setting up {name}"),
                format!("{name} setup completed successfully"),
            )
            .step(LABEL_APP_DEPS, app(cfg).args(["pub", "get"]))
            .step(LABEL_NATIVE_BUILD, native(cfg).arg("build"))
            .step(LABEL_CODEGEN, codegen(cfg)),
        ),
        DevCommand::Build => Plan::Sequence(
            Workflow::new(
                "build",
                format!("Building {name}"),
                format!("{name} built successfully"),
            )
            .step(LABEL_NATIVE_BUILD, native(cfg).arg("build"))
            .step(LABEL_APP_DEPS, app(cfg).args(["pub", "get"])),
        ),
        DevCommand::Clean => Plan::Sequence(
            Workflow::new(
                "clean",
                format!("Cleaning {name}"),
                format!("{name} cleaned successfully"),
            )
            .step(LABEL_APP_CLEAN, app(cfg).arg("clean"))
            .step(LABEL_NATIVE_CLEAN, native(cfg).arg("clean")),
        ),
        DevCommand::Generate => Plan::Sequence(
            Workflow::new(
                "generate",
                format!("Generating bindings for {name}"),
                "Bindings generated successfully",
            )
            .step(LABEL_CODEGEN, codegen(cfg)),
        ),
        DevCommand::Dev => Plan::Interactive(SessionPlan {
            name: "dev".to_string(),
            header: format!("Running {name} in development mode"),
            notes: vec![
                "Hot reload is enabled.".to_string(),
                "Press Ctrl+C to exit.".to_string(),
            ],
            spec: app(cfg)
                .args(["run", "--hot"])
                .args(passthrough.iter().cloned()),
            relay_interrupts: true,
            interrupt_note: Some("Stopping development mode...".to_string()),
        }),
        DevCommand::Run => Plan::Interactive(SessionPlan {
            name: "run".to_string(),
            header: format!("Running {name}"),
            notes: Vec::new(),
            spec: app(cfg)
                .args(["run", "-v"])
                .args(passthrough.iter().cloned()),
            // TODO: decide whether `run` should relay Ctrl+C like `dev` once
            // long verbose sessions are confirmed to need a graceful shutdown.
            relay_interrupts: false,
            interrupt_note: None,
        }),
    };

    Ok(plan)
}

fn app(cfg: &BridgeflowConfig) -> CommandSpec {
    CommandSpec::new(&cfg.app.program)
        .current_dir(&cfg.root)
        .envs(cfg.env.clone())
}

fn native(cfg: &BridgeflowConfig) -> CommandSpec {
    CommandSpec::new(&cfg.native.program)
        .current_dir(cfg.native_dir())
        .envs(cfg.env.clone())
}

fn codegen(cfg: &BridgeflowConfig) -> CommandSpec {
    CommandSpec::new(&cfg.codegen.program)
        .args(cfg.codegen.args.iter().cloned())
        .current_dir(&cfg.root)
        .envs(cfg.env.clone())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::workflow::testing::{Event, FakeRunner, RecordingReporter};

    fn cfg() -> BridgeflowConfig {
        BridgeflowConfig {
            root: PathBuf::from("/work/motek_ui"),
            ..BridgeflowConfig::default()
        }
    }

    fn workflow(command: DevCommand) -> Workflow {
        match plan(command, &cfg(), &[]).expect("plan should resolve") {
            Plan::Sequence(workflow) => workflow,
            Plan::Interactive(_) => panic!("{command} should be a sequence"),
        }
    }

    fn session(command: DevCommand, passthrough: &[String]) -> SessionPlan {
        match plan(command, &cfg(), passthrough).expect("plan should resolve") {
            Plan::Interactive(session) => session,
            Plan::Sequence(_) => panic!("{command} should be interactive"),
        }
    }

    fn lines(workflow: &Workflow) -> Vec<String> {
        workflow
            .steps()
            .iter()
            .map(|s| s.spec().command_line())
            .collect()
    }

    #[test]
    fn setup_fetches_then_builds_then_generates() {
        let wf = workflow(DevCommand::Setup);
        assert_eq!(
            lines(&wf),
            vec![
                "flutter pub get",
                "cargo build",
                "flutter_rust_bridge_codegen generate"
            ]
        );
        assert_eq!(wf.header(), "Setting up motek_ui");
    }

    #[test]
    fn build_compiles_native_before_fetching() {
        let wf = workflow(DevCommand::Build);
        assert_eq!(lines(&wf), vec!["cargo build", "flutter pub get"]);
    }

    #[test]
    fn clean_cleans_app_then_native() {
        let wf = workflow(DevCommand::Clean);
        assert_eq!(lines(&wf), vec!["flutter clean", "cargo clean"]);
    }

    #[test]
    fn generate_runs_codegen_only() {
        let wf = workflow(DevCommand::Generate);
        assert_eq!(lines(&wf), vec!["flutter_rust_bridge_codegen generate"]);
    }

    #[test]
    fn native_steps_run_in_native_directory() {
        let wf = workflow(DevCommand::Setup);
        let dirs = wf
            .steps()
            .iter()
            .map(|s| s.spec().working_dir().map(Path::to_path_buf))
            .collect::<Vec<_>>();
        assert_eq!(
            dirs,
            vec![
                Some(PathBuf::from("/work/motek_ui")),
                Some(PathBuf::from("/work/motek_ui/rust")),
                Some(PathBuf::from("/work/motek_ui")),
            ]
        );
    }

    #[test]
    fn configured_tools_and_env_are_used() {
        let mut cfg = cfg();
        cfg.app.program = "fvm-flutter".to_string();
        cfg.codegen.args = vec!["generate".into(), "--watch".into()];
        cfg.env.insert("CARGO_TERM_COLOR".into(), "always".into());

        let Plan::Sequence(wf) = plan(DevCommand::Setup, &cfg, &[]).unwrap() else {
            panic!("setup should be a sequence");
        };
        assert_eq!(wf.steps()[0].spec().program(), "fvm-flutter");
        assert_eq!(
            wf.steps()[2].spec().command_line(),
            "flutter_rust_bridge_codegen generate --watch"
        );
        assert!(wf
            .steps()
            .iter()
            .all(|s| s.spec().env_overrides().get("CARGO_TERM_COLOR").map(String::as_str)
                == Some("always")));
    }

    #[test]
    fn dev_relays_interrupts_and_run_does_not() {
        let dev = session(DevCommand::Dev, &[]);
        assert_eq!(dev.spec.command_line(), "flutter run --hot");
        assert!(dev.relay_interrupts);

        let run = session(DevCommand::Run, &[]);
        assert_eq!(run.spec.command_line(), "flutter run -v");
        assert!(!run.relay_interrupts);
    }

    #[test]
    fn only_dev_announces_shutdown_on_interrupt() {
        let dev = session(DevCommand::Dev, &[]);
        assert_eq!(dev.interrupt_note.as_deref(), Some("Stopping development mode..."));
        assert!(session(DevCommand::Run, &[]).interrupt_note.is_none());
    }

    #[test]
    fn passthrough_is_appended_to_interactive_commands() {
        let extra = vec!["-d".to_string(), "chrome".to_string()];
        let dev = session(DevCommand::Dev, &extra);
        assert_eq!(dev.spec.command_line(), "flutter run --hot -d chrome");
    }

    #[test]
    fn passthrough_is_rejected_for_sequences() {
        let err = plan(DevCommand::Build, &cfg(), &["--release".to_string()])
            .expect_err("must fail");
        assert_eq!(err, PlanError::PassthroughNotSupported(DevCommand::Build));
    }

    #[tokio::test]
    async fn setup_stops_when_dependency_fetch_fails() {
        let runner = FakeRunner::failing_on("flutter");
        let reporter = RecordingReporter::default();

        let result = workflow(DevCommand::Setup).run(&runner, &reporter).await;

        assert_eq!(result.exit_code(), 1);
        assert_eq!(runner.invoked_lines(), vec!["flutter pub get"]);
        let abort = result.failure().expect("failure expected");
        assert_eq!(abort.label, LABEL_APP_DEPS);
        assert!(reporter
            .events()
            .iter()
            .all(|e| !matches!(e, Event::Start(l) if l == LABEL_NATIVE_BUILD || l == LABEL_CODEGEN)));
    }

    #[tokio::test]
    async fn build_reports_both_steps_in_order() {
        let runner = FakeRunner::default();
        let reporter = RecordingReporter::default();

        let result = workflow(DevCommand::Build).run(&runner, &reporter).await;

        assert_eq!(result.exit_code(), 0);
        let successes = reporter
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Succeed(label) => Some(label),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(successes, vec![LABEL_NATIVE_BUILD, LABEL_APP_DEPS]);
    }

    #[tokio::test]
    async fn clean_twice_succeeds_both_times() {
        let runner = FakeRunner::default();
        let reporter = RecordingReporter::default();

        for _ in 0..2 {
            let wf = workflow(DevCommand::Clean);
            assert_eq!(wf.run(&runner, &reporter).await.exit_code(), 0);
        }
        assert_eq!(
            runner.invoked_lines(),
            vec!["flutter clean", "cargo clean", "flutter clean", "cargo clean"]
        );
    }
}
