use std::time::Duration;

use bridgeflow_core::{ProgressReporter, TaskHandle};
use indicatif::{ProgressBar, ProgressStyle};

use crate::styles::{self as s, StreamColors};

const TICK: Duration = Duration::from_millis(80);
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✔"];

/// Terminal reporter: one spinner per running step, a check mark or cross
/// once the step is done.
///
/// Headers, notes and the closing message go to stdout; step lines and errors
/// go to stderr. Each is colored according to its own stream.
#[derive(Debug, Clone, Copy)]
pub struct SpinnerReporter {
    animate: bool,
    colors: StreamColors,
}

impl SpinnerReporter {
    pub fn new(animate: bool, colors: StreamColors) -> Self {
        Self { animate, colors }
    }

    pub fn banner(&self, title: &str) -> String {
        s::paint(s::BANNER, &format!(" {title} "), self.colors.stdout)
    }

    pub fn note(&self, text: &str) -> String {
        s::paint(s::NOTE, text, self.colors.stdout)
    }

    pub fn error(&self, text: &str) -> String {
        s::paint(s::ERROR, text, self.colors.stderr)
    }
}

impl ProgressReporter for SpinnerReporter {
    fn header(&self, title: &str) {
        println!("\n{}\n", self.banner(title));
    }

    fn start(&self, label: &str) -> Box<dyn TaskHandle> {
        let bar = if self.animate {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(FRAMES);
        bar.set_style(style);
        bar.set_message(label.to_string());

        if self.animate {
            bar.enable_steady_tick(TICK);
        } else {
            eprintln!("- {label}");
        }

        Box::new(SpinnerTask {
            bar,
            label: label.to_string(),
            color: self.colors.stderr,
        })
    }

    fn finish(&self, message: &str) {
        println!("\n{}", s::paint(s::SUCCESS, message, self.colors.stdout));
    }
}

struct SpinnerTask {
    bar: ProgressBar,
    label: String,
    color: bool,
}

impl TaskHandle for SpinnerTask {
    fn succeed(self: Box<Self>) {
        self.bar.finish_and_clear();
        eprintln!(
            "{}",
            s::paint(s::SUCCESS, &success_line(&self.label), self.color)
        );
    }

    fn fail(self: Box<Self>, message: &str) {
        self.bar.finish_and_clear();
        eprintln!(
            "{}",
            s::paint(s::ERROR, &failure_line(&self.label, message), self.color)
        );
    }
}

fn success_line(label: &str) -> String {
    format!("✔ {label} - completed successfully")
}

fn failure_line(label: &str, message: &str) -> String {
    format!("✖ {label} - error: {message}")
}
