//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of searching
//! - `--debug`: Enable debug logging

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// micropub - publish Micropub posts as commits to a GitHub repository
#[derive(Parser, Debug)]
#[command(name = "micropub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the standard locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// How a request file passed to `render` is encoded.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// Micro-format JSON
    Json,
    /// `application/x-www-form-urlencoded`
    Form,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the Micropub HTTP endpoint
    #[command(after_help = "\
EXAMPLES:
    # Serve with the configured bind address
    micropub serve

    # Override the listen address
    micropub serve --bind 0.0.0.0:8080")]
    Serve {
        /// Listen address (overrides `bind_addr`)
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Render a create request without committing it
    #[command(
        long_about = "Render a create request without committing it.\n\n\
            Normalizes the request, resolves its storage path and permalink and \
            prints the document that would be committed. Nothing is sent to the \
            content repository.",
        after_help = "\
EXAMPLES:
    micropub render post.json
    micropub render --format form note.txt"
    )]
    Render {
        /// Request file (JSON or form-encoded)
        file: PathBuf,

        /// Input encoding; detected from the content when omitted
        #[arg(long, value_enum)]
        format: Option<InputFormat>,
    },

    /// Validate the configuration and print a summary
    #[command(name = "check-config")]
    CheckConfig,
}
