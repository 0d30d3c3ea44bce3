//! Command-line interface for stratum.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, DepsArgs, RenderArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
