//! publisher
//!
//! End-to-end publishing: raw request to committed files to public URL.
//!
//! # Pipeline
//!
//! ```text
//! CreateRequest -> normalize -> Document
//!               -> resolve + format -> FormattedPost
//!               -> (optional) link preview
//!               -> FileSet -> CommitEngine -> Location
//! ```
//!
//! Everything before the commit is pure and available on its own through
//! [`Renderer`], which the `render` command uses as a dry run.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::config::{join_url, Config, PathSettings};
use crate::core::types::BranchName;
use crate::engine::{CommitEngine, CommitError, CommitOutcome, FileSet};
use crate::mf2::{normalize, CreateRequest, Document, ValidationError};
use crate::post::format::Formatter;
use crate::post::path;
use crate::post::{FormattedPost, FormattingError};
use crate::preview::{preview_url, LinkPreviewer, OpenGraphPreviewer, PreviewError};
use crate::store::ObjectStore;

/// Errors from publishing a post.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PublishError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Formatting(#[from] FormattingError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// A post rendered but not committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// The normalized document.
    pub document: Document,
    pub post: FormattedPost,
    /// Absolute public URL.
    pub location: String,
}

/// A committed post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Absolute public URL.
    pub location: String,
    /// Every repository path written by the commit.
    pub files: Vec<String>,
    pub commit: CommitOutcome,
}

/// The pure half of publishing: request to formatted post.
#[derive(Debug, Clone)]
pub struct Renderer {
    formatter: Formatter,
    paths: PathSettings,
    site_url: String,
}

impl Renderer {
    pub fn new(config: &Config) -> Self {
        Self {
            formatter: Formatter::with_offset(config.utc_offset),
            paths: config.paths.clone(),
            site_url: config.site_url.clone(),
        }
    }

    /// Offset the formatter writes dates in.
    pub fn offset(&self) -> FixedOffset {
        self.formatter.offset()
    }

    /// Normalize, locate and format a request.
    ///
    /// `now` stands in for a missing `published` property.
    ///
    /// # Errors
    ///
    /// [`PublishError::Validation`] or [`PublishError::Formatting`]; nothing
    /// here touches the store.
    pub fn render(
        &self,
        request: CreateRequest,
        now: DateTime<FixedOffset>,
    ) -> Result<Rendered, PublishError> {
        let document = normalize(request, now)?;
        let resolved = path::resolve(&document, &self.paths.post, &self.paths.permalink)?;
        let post = FormattedPost::assemble(resolved, self.formatter.format(&document)?);
        let location = join_url(&self.site_url, &post.permalink);

        Ok(Rendered {
            document,
            post,
            location,
        })
    }

    /// Storage path of the preview file for `doc`.
    fn preview_path(&self, doc: &Document) -> Option<String> {
        // Keyed by the same slug and date as the post.
        path::resolve(doc, &self.paths.preview, &self.paths.permalink)
            .ok()
            .map(|resolved| resolved.storage_path)
    }
}

/// Turns create requests into commits.
pub struct Publisher {
    renderer: Renderer,
    engine: CommitEngine,
    branch: BranchName,
    message: String,
    previewer: Option<Arc<dyn LinkPreviewer>>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("engine", &self.engine)
            .field("branch", &self.branch.as_str())
            .field("site_url", &self.renderer.site_url)
            .field("previews", &self.previewer.is_some())
            .finish()
    }
}

impl Publisher {
    /// Build a publisher writing through `store`, without previews.
    pub fn new(config: &Config, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            renderer: Renderer::new(config),
            engine: CommitEngine::new(store),
            branch: config.store.branch.clone(),
            message: config.commit_message.clone(),
            previewer: None,
        }
    }

    /// Build a publisher with the previewer `config` asks for.
    ///
    /// # Errors
    ///
    /// Returns an error if the preview HTTP client cannot be built.
    pub fn from_config(config: &Config, store: Arc<dyn ObjectStore>) -> Result<Self, PreviewError> {
        let publisher = Self::new(config, store);
        Ok(match config.preview {
            Some(timeout) => publisher.with_previewer(Arc::new(OpenGraphPreviewer::new(timeout)?)),
            None => publisher,
        })
    }

    /// Enrich posts with link previews from `previewer`.
    pub fn with_previewer(mut self, previewer: Arc<dyn LinkPreviewer>) -> Self {
        self.previewer = Some(previewer);
        self
    }

    pub fn offset(&self) -> FixedOffset {
        self.renderer.offset()
    }

    /// See [`Renderer::render`].
    pub fn render(
        &self,
        request: CreateRequest,
        now: DateTime<FixedOffset>,
    ) -> Result<Rendered, PublishError> {
        self.renderer.render(request, now)
    }

    /// Publish a create request as one commit.
    ///
    /// # Errors
    ///
    /// Any [`PublishError`]. Preview failures are logged, never returned.
    #[instrument(skip_all, fields(branch = %self.branch))]
    pub async fn publish(
        &self,
        request: CreateRequest,
        now: DateTime<FixedOffset>,
    ) -> Result<Published, PublishError> {
        let Rendered {
            document,
            post,
            location,
        } = self.render(request, now)?;
        debug!(path = %post.path, permalink = %post.permalink, "post rendered");

        let mut files = FileSet::new();
        files.insert(post.path.clone(), post.bytes);
        if let Some((preview_path, bytes)) = self.preview_file(&document).await {
            files.insert(preview_path, bytes);
        }

        let commit = self.engine.commit(&files, &self.message, &self.branch).await?;
        info!(%location, commit = %commit.commit.short(7), files = files.len(), "post published");

        Ok(Published {
            location,
            files: files.iter().map(|(p, _)| p.to_string()).collect(),
            commit,
        })
    }

    /// The preview file for `doc`, if one could be produced.
    async fn preview_file(&self, doc: &Document) -> Option<(String, Vec<u8>)> {
        let previewer = self.previewer.as_ref()?;
        let url = preview_url(doc)?;

        let preview = match previewer.preview(&url).await {
            Ok(Some(preview)) => preview,
            Ok(None) => {
                debug!(%url, "nothing to preview");
                return None;
            }
            Err(err) => {
                warn!(%url, error = %err, "link preview failed, publishing without it");
                return None;
            }
        };

        let preview_path = self.renderer.preview_path(doc)?;

        match serde_json::to_vec_pretty(&preview) {
            Ok(bytes) => Some((preview_path, bytes)),
            Err(err) => {
                warn!(%url, error = %err, "preview not serializable");
                None
            }
        }
    }
}
