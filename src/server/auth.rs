//! server::auth
//!
//! Bearer-token authorization.
//!
//! The HTTP layer extracts a token (header or body field) and asks an
//! [`Authorizer`] whether it may publish. Three implementations exist,
//! selected by the `[auth]` config section:
//!
//! - [`TokenEndpointAuthorizer`]: IndieAuth token endpoint verification
//! - [`StaticTokens`]: a configured list of accepted tokens
//! - [`AllowAll`]: no checks, for local testing

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::core::config::{AuthMode, Config};

/// Scopes that grant permission to create posts.
const CREATE_SCOPES: [&str; 2] = ["create", "post"];

/// Why a request was not authorized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer token was supplied.
    #[error("missing access token")]
    MissingToken,

    /// The token was checked and refused.
    #[error("access token rejected: {0}")]
    Rejected(String),
}

/// Decides whether a bearer token may publish.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Authorize `token`, which is `None` when the request carried none.
    async fn authorize(&self, token: Option<&str>) -> Result<(), AuthError>;
}

/// Build the authorizer `config` selects.
///
/// # Errors
///
/// Returns `AuthError::Rejected` if the token endpoint client cannot be built.
pub fn from_config(config: &Config) -> Result<Arc<dyn Authorizer>, AuthError> {
    Ok(match &config.auth {
        AuthMode::TokenEndpoint(endpoint) => Arc::new(TokenEndpointAuthorizer::new(
            endpoint.clone(),
            config.site_url.clone(),
            config.store.timeout,
        )?),
        AuthMode::Static(tokens) => Arc::new(StaticTokens::new(tokens.clone())),
        AuthMode::Disabled => Arc::new(AllowAll),
    })
}

/// Accepts every request, with or without a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _token: Option<&str>) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Accepts a fixed set of tokens.
#[derive(Clone)]
pub struct StaticTokens {
    tokens: Vec<String>,
}

impl std::fmt::Debug for StaticTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokens")
            .field("count", &self.tokens.len())
            .finish()
    }
}

impl StaticTokens {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Authorizer for StaticTokens {
    async fn authorize(&self, token: Option<&str>) -> Result<(), AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        if self.tokens.iter().any(|t| t == token) {
            Ok(())
        } else {
            Err(AuthError::Rejected("unknown token".to_string()))
        }
    }
}

/// Token endpoint verification response.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    me: String,
    #[serde(default)]
    scope: String,
}

/// Verifies tokens against an IndieAuth token endpoint.
///
/// The endpoint must answer 2xx with JSON whose `me` is the site URL and
/// whose `scope` grants `create` (or the older `post`).
#[derive(Debug, Clone)]
pub struct TokenEndpointAuthorizer {
    client: Client,
    endpoint: String,
    me: String,
}

impl TokenEndpointAuthorizer {
    pub fn new(
        endpoint: impl Into<String>,
        me: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Rejected(format!("token endpoint client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            me: me.into(),
        })
    }
}

#[async_trait]
impl Authorizer for TokenEndpointAuthorizer {
    async fn authorize(&self, token: Option<&str>) -> Result<(), AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;

        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("micropub-git/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| AuthError::Rejected(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(format!(
                "token endpoint answered {}",
                status.as_u16()
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(format!("unreadable token info: {e}")))?;
        debug!(me = %info.me, scope = %info.scope, "token verified by endpoint");
        check_token_info(&info, &self.me)
    }
}

fn check_token_info(info: &TokenInfo, me: &str) -> Result<(), AuthError> {
    if !same_site(&info.me, me) {
        return Err(AuthError::Rejected(format!(
            "token belongs to '{}', not '{me}'",
            info.me
        )));
    }
    if !info
        .scope
        .split_whitespace()
        .any(|s| CREATE_SCOPES.contains(&s))
    {
        return Err(AuthError::Rejected(format!(
            "scope '{}' does not allow creating posts",
            info.scope
        )));
    }
    Ok(())
}

fn same_site(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Extract the token from an `Authorization: Bearer` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
