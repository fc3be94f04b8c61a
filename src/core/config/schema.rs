//! core::config::schema
//!
//! Configuration file schema.
//!
//! Every field is optional at parse time; defaults are applied and required
//! values are checked by [`FileConfig::validate`], which produces the typed
//! [`Config`](super::Config).
//!
//! # Example
//!
//! ```toml
//! site_url = "https://example.com/"
//! bind_addr = "127.0.0.1:5000"
//! commit_message = "new post"
//! utc_offset = "+00:00"
//!
//! [store]
//! repository = "owner/site"
//! branch = "master"
//! token = "..."
//!
//! [paths]
//! post = "content/micropub/{Y}/{m}/{d}/{H}{M}{S}.md"
//! permalink = "{Y}/{m}/{d}/{slug}"
//!
//! [auth]
//! token_endpoint = "https://tokens.indieauth.com/token"
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use chrono::{FixedOffset, Local, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthMode, Config, ConfigError, PathSettings, StoreSettings};
use crate::core::types::{BranchName, RepoId};
use crate::post::template::PathTemplate;
use crate::store::github::{Credentials, DEFAULT_API_BASE};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_COMMIT_MESSAGE: &str = "new post";
pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PREVIEW_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_POST_PATH: &str = "content/micropub/{Y}/{m}/{d}/{H}{M}{S}.md";
pub const DEFAULT_PERMALINK: &str = "{Y}/{m}/{d}/{slug}";
pub const DEFAULT_PREVIEW_PATH: &str = "previews/{Y}/{m}/{d}/{slug}.json";

/// The configuration file as written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Public site root; permalinks are joined to it
    pub site_url: Option<String>,

    /// Listen address for `serve`
    pub bind_addr: Option<String>,

    /// Message of every publish commit
    pub commit_message: Option<String>,

    /// Offset dates are written in; host local offset when unset
    pub utc_offset: Option<String>,

    pub store: StoreSection,
    pub paths: PathsSection,
    pub preview: PreviewSection,
    pub auth: AuthSection,
    pub query: QuerySection,
}

/// `[store]`: the content repository.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// `owner/name`
    pub repository: Option<String>,
    pub branch: Option<String>,
    /// API base URL (GitHub Enterprise)
    pub api_base: Option<String>,
    pub timeout_secs: Option<u64>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

// Custom Debug to avoid exposing credentials
impl std::fmt::Debug for StoreSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSection")
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("has_token", &self.token.is_some())
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

/// `[paths]`: storage and permalink templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsSection {
    pub post: Option<String>,
    pub permalink: Option<String>,
    pub preview: Option<String>,
}

/// `[preview]`: link preview enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewSection {
    pub enabled: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// `[auth]`: how bearer tokens are checked. Exactly one mode.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSection {
    /// IndieAuth token endpoint
    pub token_endpoint: Option<String>,
    /// Fixed list of accepted tokens
    pub tokens: Option<Vec<String>>,
    /// Accept every request
    pub disabled: Option<bool>,
}

impl std::fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSection")
            .field("token_endpoint", &self.token_endpoint)
            .field("tokens", &self.tokens.as_ref().map(Vec::len))
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// `[query]`: static answers to `q=config` and `q=syndicate-to`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySection {
    pub media_endpoint: Option<String>,
    pub syndicate_to: Vec<SyndicationTarget>,
}

/// A syndication destination offered to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyndicationTarget {
    pub uid: String,
    pub name: String,
}

/// Credentials taken from the environment, applied over the file.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialOverrides {
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for CredentialOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialOverrides")
            .field("has_token", &self.token.is_some())
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

impl CredentialOverrides {
    /// Read `GITHUB_TOKEN`, `GITHUB_USERNAME` and `GITHUB_PASSWORD`.
    pub fn from_env() -> Self {
        let var = |name| std::env::var(name).ok().filter(|v: &String| !v.is_empty());
        Self {
            token: var("GITHUB_TOKEN"),
            username: var("GITHUB_USERNAME"),
            password: var("GITHUB_PASSWORD"),
        }
    }
}

impl FileConfig {
    /// Apply environment credentials. A username/password pair only
    /// replaces the file's pair when both are present.
    pub fn apply_overrides(&mut self, overrides: &CredentialOverrides) {
        if let Some(token) = &overrides.token {
            self.store.token = Some(token.clone());
        }
        if let (Some(username), Some(password)) = (&overrides.username, &overrides.password) {
            self.store.username = Some(username.clone());
            self.store.password = Some(password.clone());
        }
    }

    /// Validate every value and build the typed configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<Config, ConfigError> {
        let site_url = self.validate_site_url()?;

        let bind_addr: SocketAddr = self
            .bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
            .map_err(|e| invalid(format!("bind_addr: {e}")))?;

        let commit_message = self
            .commit_message
            .clone()
            .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string());
        if commit_message.trim().is_empty() {
            return Err(invalid("commit_message must not be empty"));
        }

        let utc_offset = match self.utc_offset.as_deref() {
            Some(raw) => parse_offset(raw)?,
            None => Local::now().offset().fix(),
        };

        Ok(Config {
            site_url,
            bind_addr,
            commit_message,
            utc_offset,
            store: self.validate_store()?,
            paths: self.validate_paths()?,
            preview: self.validate_preview(),
            auth: self.validate_auth()?,
            query: self.query.clone(),
            source: None,
        })
    }

    fn validate_site_url(&self) -> Result<String, ConfigError> {
        let raw = self
            .site_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| invalid("site_url is required"))?;
        let parsed = url::Url::parse(raw).map_err(|e| invalid(format!("site_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("site_url must be http(s), got '{raw}'")));
        }
        Ok(raw.to_string())
    }

    fn validate_store(&self) -> Result<StoreSettings, ConfigError> {
        let store = &self.store;
        let repo = store
            .repository
            .as_deref()
            .ok_or_else(|| invalid("store.repository is required"))
            .and_then(|r| RepoId::parse(r).map_err(|e| invalid(format!("store.repository: {e}"))))?;
        let branch = BranchName::new(store.branch.as_deref().unwrap_or(DEFAULT_BRANCH))
            .map_err(|e| invalid(format!("store.branch: {e}")))?;

        let credentials = match (&store.token, &store.username, &store.password) {
            (Some(token), _, _) => Credentials::Bearer(token.clone()),
            (None, Some(username), Some(password)) => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => {
                return Err(invalid(
                    "store credentials missing: set store.token or store.username + store.password \
                     (or GITHUB_TOKEN / GITHUB_USERNAME + GITHUB_PASSWORD)",
                ))
            }
        };

        let timeout_secs = store.timeout_secs.unwrap_or(DEFAULT_STORE_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(invalid("store.timeout_secs must be positive"));
        }

        Ok(StoreSettings {
            repo,
            branch,
            api_base: store
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            credentials,
        })
    }

    fn validate_paths(&self) -> Result<PathSettings, ConfigError> {
        let template = |field: &str, value: &Option<String>, default: &str| {
            PathTemplate::parse(value.as_deref().unwrap_or(default))
                .map_err(|e| invalid(format!("paths.{field}: {e}")))
        };
        let post = template("post", &self.paths.post, DEFAULT_POST_PATH)?;
        let permalink = template("permalink", &self.paths.permalink, DEFAULT_PERMALINK)?;
        let preview = template("preview", &self.paths.preview, DEFAULT_PREVIEW_PATH)?;

        for (field, t) in [("post", &post), ("preview", &preview)] {
            if t.is_absolute() {
                return Err(invalid(format!(
                    "paths.{field} must be relative to the repository root, got '{t}'"
                )));
            }
        }

        Ok(PathSettings {
            post,
            permalink,
            preview,
        })
    }

    fn validate_preview(&self) -> Option<Duration> {
        self.preview.enabled.unwrap_or(false).then(|| {
            Duration::from_secs(
                self.preview
                    .timeout_secs
                    .unwrap_or(DEFAULT_PREVIEW_TIMEOUT_SECS)
                    .max(1),
            )
        })
    }

    fn validate_auth(&self) -> Result<AuthMode, ConfigError> {
        let auth = &self.auth;
        let tokens = auth.tokens.as_ref().filter(|t| !t.is_empty());
        let disabled = auth.disabled.unwrap_or(false);

        match (&auth.token_endpoint, tokens, disabled) {
            (Some(endpoint), None, false) => {
                url::Url::parse(endpoint)
                    .map_err(|e| invalid(format!("auth.token_endpoint: {e}")))?;
                Ok(AuthMode::TokenEndpoint(endpoint.clone()))
            }
            (None, Some(tokens), false) => Ok(AuthMode::Static(tokens.clone())),
            (None, None, true) => Ok(AuthMode::Disabled),
            (None, None, false) => Err(invalid(
                "auth: configure one of token_endpoint, tokens or disabled = true",
            )),
            _ => Err(invalid(
                "auth: token_endpoint, tokens and disabled are mutually exclusive",
            )),
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue(message.into())
}

/// Parse `+HH:MM`, `-HH:MM`, `Z` or `UTC`.
pub fn parse_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    trimmed
        .parse::<FixedOffset>()
        .map_err(|e| invalid(format!("utc_offset '{raw}': {e}")))
}
