//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load and validate configuration
//! - Delegate to command handlers
//!
//! The CLI layer is thin: publishing goes through [`crate::publisher`] and
//! [`crate::server`].

pub mod args;
pub mod commands;

pub use args::{Cli, Command, InputFormat};

use std::path::PathBuf;

use anyhow::Result;

/// Settings shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit config file from `--config`
    pub config_path: Option<PathBuf>,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        config_path: cli.config.clone(),
    };

    commands::dispatch(cli.command, &ctx)
}
