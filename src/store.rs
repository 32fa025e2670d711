//! Ordered, persisted registry of commands
//!
//! A command's position in the store is its only identity, and the order is the order
//! callers display and run commands in. Every mutation writes the whole file before it is
//! applied in memory, so a failed write leaves both the file and the in-memory list as they
//! were.

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use thiserror::Error;

use crate::commands::{Command, CommandError};
use crate::executor::{ExecutionResult, Executor};
use crate::store_file::{self, StoreFileError};

/// Errors reported by store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid command: {0}")]
    Validation(#[from] CommandError),
    #[error("Index {index} out of range (store has {len} commands)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Command at index {index} cannot move {direction}")]
    AtBoundary { index: usize, direction: Direction },
    #[error("Changes were not saved: {0}")]
    Persist(#[from] StoreFileError),
}

/// Direction for [`Store::move_command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    commands: Vec<Command>,
    executor: Executor,
}

impl Store {
    /// Load the store from `path`.
    ///
    /// A missing file gives an empty store. A file that cannot be read or parsed is logged
    /// and also gives an empty store; the next successful mutation overwrites it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let commands = match store_file::read(&path) {
            Ok(Some(file)) => {
                info!(
                    "Loaded {} commands from {}",
                    file.commands.len(),
                    path.display()
                );
                file.commands
            }
            Ok(None) => {
                info!("No store file at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => {
                error!("Failed to load commands, starting empty: {e}");
                Vec::new()
            }
        };

        for (index, command) in commands.iter().enumerate() {
            if let Err(e) = command.validate() {
                warn!("Stored command at index {index} is invalid: {e}");
            }
        }

        Store {
            path,
            commands,
            executor: Executor::default(),
        }
    }

    /// Use `executor` for [`Store::execute`].
    #[must_use]
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// All commands, in display order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Command> {
        self.commands.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Write the current commands to disk.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Persist` if the file cannot be written.
    pub fn save(&self) -> Result<(), StoreError> {
        store_file::write(&self.path, &self.commands).map_err(|e| {
            error!("Failed to save commands: {e}");
            StoreError::Persist(e)
        })?;
        info!(
            "Saved {} commands to {}",
            self.commands.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Append `command` and return its index.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the command is incomplete, or
    /// `StoreError::Persist` if it could not be saved.
    pub fn add(&mut self, command: Command) -> Result<usize, StoreError> {
        command.validate()?;
        let name = command.name.clone();
        let mut next = self.commands.clone();
        next.push(command);
        self.commit(next)?;
        info!("Added command: {name}");
        Ok(self.commands.len() - 1)
    }

    /// Replace the command at `index`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation`, `StoreError::IndexOutOfRange` or
    /// `StoreError::Persist`.
    pub fn update(&mut self, index: usize, command: Command) -> Result<(), StoreError> {
        command.validate()?;
        self.check_index(index)?;
        let name = command.name.clone();
        let mut next = self.commands.clone();
        next[index] = command;
        self.commit(next)?;
        info!("Updated command at index {index}: {name}");
        Ok(())
    }

    /// Remove the command at `index`, shifting later commands down by one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IndexOutOfRange` or `StoreError::Persist`.
    pub fn delete(&mut self, index: usize) -> Result<Command, StoreError> {
        self.check_index(index)?;
        let mut next = self.commands.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        info!("Deleted command: {}", removed.name);
        Ok(removed)
    }

    /// Swap the command at `index` with its neighbour and return its new index.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IndexOutOfRange`, `StoreError::AtBoundary` when the command is
    /// already first (up) or last (down), or `StoreError::Persist`.
    pub fn move_command(
        &mut self,
        index: usize,
        direction: Direction,
    ) -> Result<usize, StoreError> {
        self.check_index(index)?;
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&i| i < self.commands.len()),
        };
        let Some(target) = target else {
            warn!("Command at index {index} is already at the boundary, cannot move {direction}");
            return Err(StoreError::AtBoundary { index, direction });
        };

        let mut next = self.commands.clone();
        next.swap(index, target);
        self.commit(next)?;
        info!("Moved command from index {index} to {target}");
        Ok(target)
    }

    /// Move the command at `from` so that it ends up at `to`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IndexOutOfRange` if either index is invalid, or
    /// `StoreError::Persist`.
    pub fn relocate(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let mut next = self.commands.clone();
        let command = next.remove(from);
        next.insert(to, command);
        self.commit(next)?;
        info!("Moved command from index {from} to {to}");
        Ok(())
    }

    /// Run the command at `index` and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IndexOutOfRange`. Execution failures are reported through the
    /// returned [`ExecutionResult`].
    pub fn execute(&self, index: usize) -> Result<ExecutionResult, StoreError> {
        self.check_index(index)?;
        Ok(self.executor.execute(&self.commands[index]))
    }

    fn check_index(&self, index: usize) -> Result<(), StoreError> {
        if index < self.commands.len() {
            Ok(())
        } else {
            error!("Invalid command index: {index}");
            Err(StoreError::IndexOutOfRange {
                index,
                len: self.commands.len(),
            })
        }
    }

    /// Persist `next` and make it the current list only once it is on disk.
    fn commit(&mut self, next: Vec<Command>) -> Result<(), StoreError> {
        store_file::write(&self.path, &next).map_err(|e| {
            error!("Failed to save commands: {e}");
            StoreError::Persist(e)
        })?;
        self.commands = next;
        Ok(())
    }
}
