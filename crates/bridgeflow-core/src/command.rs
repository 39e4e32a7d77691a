use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// A named developer command, one per `bflow` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevCommand {
    Setup,
    Build,
    Clean,
    Generate,
    Dev,
    Run,
}

impl DevCommand {
    pub fn all() -> &'static [DevCommand] {
        &[
            Self::Setup,
            Self::Build,
            Self::Clean,
            Self::Generate,
            Self::Dev,
            Self::Run,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Build => "build",
            Self::Clean => "clean",
            Self::Generate => "generate",
            Self::Dev => "dev",
            Self::Run => "run",
        }
    }

    /// Commands that attach a long-lived process to the terminal instead of
    /// running a sequence of reported steps.
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::Dev | Self::Run)
    }
}

impl Display for DevCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("unknown command '{}' (supported: {})", .0, supported_commands())]
    Unknown(String),
}

fn supported_commands() -> String {
    DevCommand::all()
        .iter()
        .map(|command| command.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromStr for DevCommand {
    type Err = CommandParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let command = match value.trim() {
            "setup" => Self::Setup,
            "build" => Self::Build,
            "clean" => Self::Clean,
            "generate" => Self::Generate,
            "dev" => Self::Dev,
            "run" => Self::Run,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
