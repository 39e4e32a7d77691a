use std::io::IsTerminal;

use anstyle::{AnsiColor, Color, Style};

pub const HEADER: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Green)))
    .bold();

pub const USAGE: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Green)))
    .bold();

pub const LITERAL: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

pub const SUCCESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));

pub const ERROR: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Red)))
    .bold();

pub const NOTE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));

/// White on blue, used for workflow headers.
pub const BANNER: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::White)))
    .bg_color(Some(Color::Ansi(AnsiColor::Blue)))
    .bold();

pub fn get_clap_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(HEADER)
        .usage(USAGE)
        .literal(LITERAL)
        .placeholder(LITERAL)
}

/// Whether to color each output stream, decided separately because either
/// one may be redirected on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamColors {
    pub stdout: bool,
    pub stderr: bool,
}

impl StreamColors {
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some();
        Self {
            stdout: wants_color(no_color, std::io::stdout().is_terminal()),
            stderr: wants_color(no_color, std::io::stderr().is_terminal()),
        }
    }

    pub fn none() -> Self {
        Self {
            stdout: false,
            stderr: false,
        }
    }
}

/// Colors are emitted only for terminals, and never when `NO_COLOR` is set.
fn wants_color(no_color: bool, is_terminal: bool) -> bool {
    !no_color && is_terminal
}

pub fn paint(style: Style, text: &str, color: bool) -> String {
    if color {
        format!("{}{}{}", style.render(), text, style.render_reset())
    } else {
        text.to_string()
    }
}
