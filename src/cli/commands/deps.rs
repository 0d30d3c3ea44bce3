//! Deps command implementation.
//!
//! The `stratum deps` command lists every template source a template was
//! compiled from: itself, its ancestors, includes and globals.

use std::io::Write;

use crate::cli::args::DepsArgs;
use crate::environment::Environment;
use crate::error::Result;

use super::dispatcher::{Command, CommandResult};

/// The deps command implementation.
pub struct DepsCommand {
    args: DepsArgs,
}

impl DepsCommand {
    /// Create a new deps command.
    pub fn new(args: DepsArgs) -> Self {
        Self { args }
    }
}

impl Command for DepsCommand {
    fn execute(&self, env: &Environment, out: &mut dyn Write) -> Result<CommandResult> {
        let wrapper = env.load(&self.args.name)?;
        for name in wrapper.tracked_names() {
            writeln!(out, "{}", name)?;
        }
        Ok(CommandResult::success())
    }
}
