//! post
//!
//! Turning a canonical document into a file that can be committed.
//!
//! # Modules
//!
//! - [`policy`] - Which properties land in the header, under which key
//! - [`template`] - Storage path and permalink templates
//! - [`path`] - Slug, storage path and permalink resolution
//! - [`format`] - Front-matter rendering
//!
//! # Example
//!
//! ```
//! use chrono::FixedOffset;
//! use micropub_git::mf2::{Document, PropertyValue};
//! use micropub_git::post::{format::Formatter, path, template::PathTemplate, FormattedPost};
//!
//! let mut doc = Document::new(vec!["h-entry".into()]);
//! doc.set_property("content", vec![PropertyValue::text("hello")]);
//! doc.set_property("published", vec![PropertyValue::text("2019-08-15T14:16:34.6")]);
//!
//! let storage = PathTemplate::parse("content/{Y}/{m}/{d}/{slug}.md").unwrap();
//! let permalink = PathTemplate::parse("{Y}/{m}/{d}/{slug}").unwrap();
//! let resolved = path::resolve(&doc, &storage, &permalink).unwrap();
//!
//! let formatter = Formatter::with_offset(FixedOffset::east_opt(0).unwrap());
//! let post = FormattedPost::assemble(resolved, formatter.format(&doc).unwrap());
//! assert_eq!(post.path, "content/2019/08/15/141634.md");
//! assert_eq!(post.permalink, "2019/08/15/141634");
//! ```

pub mod format;
pub mod path;
pub mod policy;
pub mod template;

use thiserror::Error;

use self::format::RenderedPost;
use self::path::ResolvedPath;

/// The kind of body a post carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Marked-up (HTML) body.
    Markup,
    /// Plain or lightweight-markup body.
    Structured,
}

impl ContentType {
    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ContentType::Markup => "html",
            ContentType::Structured => "md",
        }
    }
}

/// A post ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedPost {
    /// Storage path inside the repository.
    pub path: String,
    /// Path component of the public URL.
    pub permalink: String,
    pub content_type: ContentType,
    pub bytes: Vec<u8>,
}

impl FormattedPost {
    /// Combine a resolved location with rendered content.
    pub fn assemble(resolved: ResolvedPath, rendered: RenderedPost) -> Self {
        Self {
            path: resolved.storage_path,
            permalink: resolved.permalink,
            content_type: rendered.content_type,
            bytes: rendered.bytes,
        }
    }
}

/// Failure to render a document. Unexpected for normalized input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormattingError {
    #[error("document has no header fields")]
    EmptyMetadata,

    #[error("field '{field}' holds an unparseable date: {value}")]
    InvalidDate { field: String, value: String },

    #[error("header serialization failed: {0}")]
    Serialize(String),
}
