//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Async Commands
//!
//! `serve` runs the HTTP server and is async. The dispatch function stays
//! synchronous and the handler builds its own tokio runtime.

mod check_config;
mod render;
mod serve;

pub use check_config::check_config;
pub use render::render;
pub use serve::serve;

use anyhow::{Context as _, Result};

use super::{Command, Context};
use crate::core::config::Config;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Serve { bind } => serve(ctx, bind),
        Command::Render { file, format } => render(ctx, &file, format),
        Command::CheckConfig => check_config(ctx),
    }
}

/// Load the configuration the context points at.
fn load_config(ctx: &Context) -> Result<Config> {
    Config::load(ctx.config_path.as_deref()).context("Failed to load configuration")
}
