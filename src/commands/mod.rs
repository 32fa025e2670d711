//! Stored command definitions
//!
//! A command is a named shell invocation of one of three kinds: a single shell line, a
//! sequence of shell lines run in order, or the path to an executable script. Commands carry
//! no identity of their own; the store addresses them by position.

pub mod command;

pub use command::{Command, CommandError, CommandKind};
