//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed by the
//! [`CommandDispatcher`], which first builds the [`Environment`] from the
//! config file and global flags.
//!
//! [`Environment`]: crate::environment::Environment

pub mod deps;
pub mod dispatcher;
pub mod render;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
