//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first existing file wins:
//! 1. The explicit `--config` path
//! 2. `$MICROPUB_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/micropub/config.toml`
//! 4. `<platform config dir>/micropub/config.toml`
//!
//! An explicit path that does not exist is an error rather than a fallthrough.
//!
//! # Credentials
//!
//! `GITHUB_TOKEN`, or `GITHUB_USERNAME` together with `GITHUB_PASSWORD`,
//! override the `[store]` credentials. The environment is read once, at load.
//!
//! # Example
//!
//! ```
//! use micropub_git::core::config::Config;
//!
//! let config = Config::from_toml_str(r#"
//!     site_url = "https://example.com/"
//!     utc_offset = "Z"
//!     [store]
//!     repository = "octocat/blog"
//!     token = "ghp_example"
//!     [auth]
//!     disabled = true
//! "#).unwrap();
//!
//! assert_eq!(config.store.repo.to_string(), "octocat/blog");
//! assert_eq!(config.location("2019/08/15/hello"), "https://example.com/2019/08/15/hello");
//! ```

pub mod schema;

pub use schema::{CredentialOverrides, FileConfig, QuerySection, SyndicationTarget};

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use thiserror::Error;
use tracing::debug;

use crate::core::types::{BranchName, RepoId};
use crate::post::template::PathTemplate;
use crate::store::github::Credentials;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "MICROPUB_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no config file found (searched: {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `[store]` after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub repo: RepoId,
    pub branch: BranchName,
    pub api_base: String,
    pub timeout: Duration,
    pub credentials: Credentials,
}

/// `[paths]` after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSettings {
    /// Where posts are stored in the repository
    pub post: PathTemplate,
    /// Public path of a post, relative to the site URL
    pub permalink: PathTemplate,
    /// Where link previews are stored in the repository
    pub preview: PathTemplate,
}

/// How incoming bearer tokens are checked.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Verify against an IndieAuth token endpoint.
    TokenEndpoint(String),
    /// Accept any of a fixed set of tokens.
    Static(Vec<String>),
    /// Accept every request.
    Disabled,
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::TokenEndpoint(url) => f.debug_tuple("TokenEndpoint").field(url).finish(),
            AuthMode::Static(tokens) => write!(f, "Static([{} tokens])", tokens.len()),
            AuthMode::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub site_url: String,
    pub bind_addr: SocketAddr,
    pub commit_message: String,
    /// Offset dates in front matter are written in
    pub utc_offset: FixedOffset,
    pub store: StoreSettings,
    pub paths: PathSettings,
    /// Preview fetch timeout; `None` when previews are disabled
    pub preview: Option<Duration>,
    pub auth: AuthMode,
    pub query: QuerySection,
    /// File the configuration was read from
    pub(crate) source: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if no file is found, the file cannot be read or
    /// parsed, or a value is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let lookup = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty());
        let candidates = search_paths(explicit, lookup, dirs::config_dir());
        Self::load_from(explicit, &candidates, &CredentialOverrides::from_env())
    }

    fn load_from(
        explicit: Option<&Path>,
        candidates: &[PathBuf],
        overrides: &CredentialOverrides,
    ) -> Result<Config, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    searched: vec![path.to_path_buf()],
                });
            }
        }

        let path = candidates
            .iter()
            .find(|p| p.exists())
            .ok_or_else(|| ConfigError::NotFound {
                searched: candidates.to_vec(),
            })?;
        debug!(path = %path.display(), "loading config");

        let mut file = Self::read_file_config(path)?;
        file.apply_overrides(overrides);
        let mut config = file.validate()?;
        config.source = Some(path.clone());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// The environment is not consulted.
    pub fn from_toml_str(contents: &str) -> Result<Config, ConfigError> {
        let file: FileConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        file.validate()
    }

    /// Read and parse a config file.
    fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Absolute URL of a permalink, joined to `site_url`.
    ///
    /// Exactly one `/` separates the two.
    pub fn location(&self, permalink: &str) -> String {
        join_url(&self.site_url, permalink)
    }

    /// Get the path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Join a site root and a relative path with a single `/`.
pub fn join_url(site_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        site_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Candidate config files, in search order.
fn search_paths<F>(explicit: Option<&Path>, lookup: F, config_dir: Option<PathBuf>) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<std::ffi::OsString>,
{
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }

    let mut paths = Vec::new();
    if let Some(path) = lookup(CONFIG_ENV) {
        paths.push(PathBuf::from(path));
    }
    if let Some(xdg) = lookup("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("micropub/config.toml"));
    }
    if let Some(dir) = config_dir {
        let path = dir.join("micropub/config.toml");
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}
