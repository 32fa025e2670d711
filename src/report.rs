//! Human readable rendering of stored commands and execution results

use std::time::Duration;

use anstyle::{AnsiColor, Reset, RgbColor, Style};

use crate::commands::Command;
use crate::executor::ExecutionResult;

const ACCENT: Style = Style::new().fg_color(Some(anstyle::Color::Rgb(RgbColor(207, 106, 76))));
const SUCCESS: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green)));
const FAILURE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));
const DIM: Style = Style::new().dimmed();
const BOLD: Style = Style::new().bold();

/// Applies styles only when color output is enabled.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    color: bool,
}

impl Palette {
    #[must_use]
    pub fn new(color: bool) -> Self {
        Palette { color }
    }

    fn paint(self, style: Style, s: &str) -> String {
        if self.color {
            format!("{style}{s}{Reset}")
        } else {
            s.to_string()
        }
    }

    fn arrow(self) -> String {
        self.paint(ACCENT, "❱")
    }
}

#[must_use]
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let tenths = d.subsec_millis() / 100;
    if total_secs < 60 {
        format!("{total_secs}.{tenths}s")
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{mins}m {secs}.{tenths}s")
    }
}

/// One line per command: index, name, type and the description if there is one.
#[must_use]
pub fn format_listing(commands: &[Command], palette: Palette) -> String {
    if commands.is_empty() {
        return palette.paint(DIM, "No commands stored.");
    }
    let width = (commands.len() - 1).to_string().len();
    commands
        .iter()
        .enumerate()
        .map(|(index, cmd)| {
            let mut line = format!(
                "{} {} {}",
                palette.paint(DIM, &format!("[{index:>width$}]")),
                palette.paint(BOLD, &cmd.name),
                palette.paint(ACCENT, &format!("({})", cmd.kind)),
            );
            if !cmd.description.is_empty() {
                line.push_str(&format!(" {}", palette.paint(DIM, &cmd.description)));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn format_start_message(command: &Command, palette: Palette) -> String {
    format!("{} {}", palette.arrow(), palette.paint(BOLD, &command.name))
}

/// Summary line for a finished execution.
#[must_use]
pub fn format_result(result: &ExecutionResult, palette: Palette) -> String {
    let duration = palette.paint(DIM, &format_duration(result.duration));
    if result.succeeded {
        return format!(
            "{} Command succeeded {} {duration}",
            palette.arrow(),
            palette.paint(SUCCESS, "✓")
        );
    }

    let mut line = format!(
        "{} Command failed {}",
        palette.arrow(),
        palette.paint(FAILURE, "✘")
    );
    if let Some(ref step) = result.failed_step {
        line.push_str(&format!(" at {step}"));
    }
    if let Some(ref failure) = result.failure {
        line.push_str(&format!(" ({failure})"));
    }
    line.push(' ');
    line.push_str(&duration);
    line
}
