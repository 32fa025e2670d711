use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a command is rejected before it reaches the store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command name must not be empty")]
    EmptyName,
    #[error("Command '{0}' has empty content")]
    EmptyContent(String),
    #[error("Command '{0}' has no non-empty lines to run")]
    NoSteps(String),
    #[error("Unsupported command type: {0}")]
    UnknownKind(String),
}

/// How the content of a command is turned into processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// One shell command line
    #[default]
    Single,
    /// Newline separated shell command lines, run in order
    Multi,
    /// Path to an executable file, run without a shell
    Script,
}

impl CommandKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Single => "single",
            CommandKind::Multi => "multi",
            CommandKind::Script => "script",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(CommandKind::Single),
            "multi" => Ok(CommandKind::Multi),
            "script" => Ok(CommandKind::Script),
            other => Err(CommandError::UnknownKind(other.to_string())),
        }
    }
}

/// A named, stored shell invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(rename = "type", alias = "command_type")]
    pub kind: CommandKind,
    pub content: String,
    #[serde(default)]
    pub description: String,
}

impl Command {
    pub fn new(name: impl Into<String>, kind: CommandKind, content: impl Into<String>) -> Self {
        Command {
            name: name.into(),
            kind,
            content: content.into(),
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check that the command carries everything its kind needs to run.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` if the name or content is blank, or if a
    /// multi command has no non-empty line.
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.name.trim().is_empty() {
            return Err(CommandError::EmptyName);
        }
        if self.content.trim().is_empty() {
            return Err(CommandError::EmptyContent(self.name.clone()));
        }
        if self.kind == CommandKind::Multi && self.steps().is_empty() {
            return Err(CommandError::NoSteps(self.name.clone()));
        }
        Ok(())
    }

    /// The shell lines this command runs, in order.
    ///
    /// Multi content is split on newlines with blank lines dropped. Single
    /// and script content is always one step.
    #[must_use]
    pub fn steps(&self) -> Vec<&str> {
        match self.kind {
            CommandKind::Multi => self
                .content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect(),
            CommandKind::Single | CommandKind::Script => {
                let content = self.content.trim();
                if content.is_empty() {
                    Vec::new()
                } else {
                    vec![content]
                }
            }
        }
    }
}
