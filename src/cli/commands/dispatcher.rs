//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for building the environment and routing subcommands

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::args::{Cli, Commands};
use crate::config::{find_config, load_config, EnvironmentConfig};
use crate::environment::Environment;
use crate::error::Result;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command against a configured environment, writing
    /// user-facing output to `out`.
    fn execute(&self, env: &Environment, out: &mut dyn Write) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self { exit_code: 0 }
    }
}

/// Builds the environment from CLI flags and config, then runs a command.
pub struct CommandDispatcher {
    project_root: PathBuf,
}

impl CommandDispatcher {
    /// Create a new dispatcher; relative paths resolve against `project_root`.
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve the configuration and its base directory.
    ///
    /// An explicit `--config` must exist. Otherwise the nearest `stratum.yml`
    /// is used, falling back to defaults rooted at the project root.
    pub fn config(&self, cli: &Cli) -> Result<(EnvironmentConfig, PathBuf)> {
        let path = match &cli.config {
            Some(path) => Some(self.project_root.join(path)),
            None => find_config(&self.project_root),
        };

        let (mut config, base_dir) = match path {
            Some(path) => {
                debug!("Using config {}", path.display());
                let config = load_config(&path)?;
                let base_dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.project_root.clone());
                (config, base_dir)
            }
            None => (EnvironmentConfig::default(), self.project_root.clone()),
        };

        if let Some(root) = &cli.root {
            config.root = self.project_root.join(root);
        }
        if cli.debug {
            config.debug = true;
        }
        Ok((config, base_dir))
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, out: &mut dyn Write) -> Result<CommandResult> {
        let (config, base_dir) = self.config(cli)?;
        let env = config.build(&base_dir)?;

        match &cli.command {
            Commands::Render(args) => super::render::RenderCommand::new(args.clone()).execute(&env, out),
            Commands::Deps(args) => super::deps::DepsCommand::new(args.clone()).execute(&env, out),
        }
    }
}
