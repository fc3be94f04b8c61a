//! server
//!
//! The micropub HTTP surface.
//!
//! # Endpoints
//!
//! | Method | Path | Behavior |
//! |---|---|---|
//! | `POST` | `/` | Publish (JSON or form body), `202` + `Location` |
//! | `GET` | `/?q=config` | Media endpoint and syndication targets |
//! | `GET` | `/?q=syndicate-to` | Syndication targets |
//!
//! Both endpoints require authorization through the configured
//! [`Authorizer`](auth::Authorizer).

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;

pub use error::{ApiError, ApiResult};
pub use router::create_router;

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use self::auth::{AuthError, Authorizer};
use crate::core::config::{Config, QuerySection};
use crate::preview::PreviewError;
use crate::publisher::Publisher;
use crate::store::{GitHubStore, StoreError};

/// Errors starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("preview setup failed: {0}")]
    Preview(#[from] PreviewError),

    #[error("authorizer setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<Publisher>,
    pub authorizer: Arc<dyn Authorizer>,
    /// Static answers to `q=` queries
    pub query: Arc<QuerySection>,
}

impl AppState {
    pub fn new(publisher: Publisher, authorizer: Arc<dyn Authorizer>, query: QuerySection) -> Self {
        Self {
            publisher: Arc::new(publisher),
            authorizer,
            query: Arc::new(query),
        }
    }

    /// Wire up the GitHub store, publisher and authorizer `config` describes.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let store = GitHubStore::new(
            config.store.repo.clone(),
            config.store.credentials.clone(),
            config.store.api_base.clone(),
            config.store.timeout,
        )?;
        let publisher = Publisher::from_config(config, Arc::new(store))?;
        let authorizer = auth::from_config(config)?;
        Ok(Self::new(publisher, authorizer, config.query.clone()))
    }
}

/// Serve until interrupted.
pub async fn run(config: &Config) -> Result<(), ServerError> {
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        repo = %config.store.repo,
        branch = %config.store.branch,
        "micropub endpoint listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("received terminate signal, shutting down");
        }
    }
}
