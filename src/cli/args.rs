//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stratum - render templates that extend layouts and include fragments.
#[derive(Debug, Parser)]
#[command(name = "stratum")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (default: nearest stratum.yml)
    #[arg(short, long, global = true, env = "STRATUM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Template root directory (overrides the config's root)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Enable debug logging and reparse on every load
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render a template to stdout
    Render(RenderArgs),

    /// List the template sources a template is built from
    Deps(DepsArgs),
}

/// Arguments for the `render` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RenderArgs {
    /// Template name, e.g. `@main/views/home.html`
    pub name: String,

    /// JSON data passed to the template
    #[arg(short, long, value_name = "JSON")]
    pub data: Option<String>,

    /// Render this named template (such as a block) instead of the entry
    #[arg(long, value_name = "NAME")]
    pub block: Option<String>,
}

/// Arguments for the `deps` command.
#[derive(Debug, Clone, clap::Args)]
pub struct DepsArgs {
    /// Template name
    pub name: String,
}
