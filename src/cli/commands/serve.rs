//! serve command - Run the Micropub HTTP endpoint

use std::net::SocketAddr;

use anyhow::{Context as _, Result};

use super::load_config;
use crate::cli::Context;
use crate::server;

/// Serve until interrupted.
pub fn serve(ctx: &Context, bind: Option<SocketAddr>) -> Result<()> {
    let mut config = load_config(ctx)?;
    if let Some(addr) = bind {
        config.bind_addr = addr;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(server::run(&config))
        .with_context(|| format!("Server on {} failed", config.bind_addr))
}
