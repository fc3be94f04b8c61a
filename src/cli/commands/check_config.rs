//! check-config command - Validate and summarize configuration

use anyhow::Result;

use super::load_config;
use crate::cli::Context;
use crate::core::config::{AuthMode, Config};
use crate::store::Credentials;

/// Load the configuration and print what it resolves to.
pub fn check_config(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    print!("{}", summary(&config));
    Ok(())
}

fn summary(config: &Config) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: String| out.push_str(&format!("{key:<12} {value}\n"));

    if let Some(path) = config.loaded_from() {
        line("config:", path.display().to_string());
    }
    line("site:", config.site_url.clone());
    line("listen:", config.bind_addr.to_string());
    line(
        "repository:",
        format!("{} (branch {})", config.store.repo, config.store.branch),
    );
    line("api:", config.store.api_base.clone());
    line(
        "credentials:",
        match &config.store.credentials {
            Credentials::Bearer(_) => "token".to_string(),
            Credentials::Basic { username, .. } => format!("basic ({username})"),
        },
    );
    line("post path:", config.paths.post.to_string());
    line("permalink:", config.paths.permalink.to_string());
    line(
        "previews:",
        match config.preview {
            Some(timeout) => format!("{} ({}s timeout)", config.paths.preview, timeout.as_secs()),
            None => "disabled".to_string(),
        },
    );
    line(
        "auth:",
        match &config.auth {
            AuthMode::TokenEndpoint(url) => format!("token endpoint {url}"),
            AuthMode::Static(tokens) => format!("{} static token(s)", tokens.len()),
            AuthMode::Disabled => "DISABLED (every request accepted)".to_string(),
        },
    );
    line("utc offset:", config.utc_offset.to_string());
    out.push_str("configuration OK\n");
    out
}
