//! preview
//!
//! Link preview enrichment.
//!
//! Posts that point at another page (likes, replies, reposts, bookmarks, or
//! a link inside the content) can carry a preview of that page. The preview
//! is committed as a JSON file next to the post, in the same commit.
//!
//! # Design
//!
//! Previewing is best-effort. The publisher asks an injected
//! [`LinkPreviewer`]; errors and empty results are logged and the post is
//! published without a preview.
//!
//! # Example
//!
//! ```
//! use micropub_git::mf2::{Document, PropertyValue};
//! use micropub_git::preview::preview_url;
//!
//! let mut doc = Document::new(vec!["h-entry".into()]);
//! doc.set_property("content", vec![PropertyValue::text("see https://example.com/a for more")]);
//! assert_eq!(preview_url(&doc), Some("https://example.com/a".to_string()));
//!
//! doc.set_property("like-of", vec![PropertyValue::text("https://example.com/liked")]);
//! assert_eq!(preview_url(&doc), Some("https://example.com/liked".to_string()));
//! ```

pub mod opengraph;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mf2::{Document, PropertyValue};

pub use opengraph::OpenGraphPreviewer;

/// Properties naming the target of a response post, in priority order.
const TARGET_PROPERTIES: [&str; 4] = ["like-of", "in-reply-to", "repost-of", "bookmark-of"];

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).expect("valid regex"));

/// Summary of a linked page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

impl Preview {
    /// Whether anything beyond the URL was found.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.site_name.is_none()
    }
}

/// Errors from fetching a preview.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreviewError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("page answered with status {0}")]
    Status(u16),

    #[error("preview request timed out")]
    Timeout,
}

/// Produces previews of linked pages.
#[async_trait]
pub trait LinkPreviewer: Send + Sync {
    /// Preview `url`; `Ok(None)` when the page has nothing worth keeping.
    async fn preview(&self, url: &str) -> Result<Option<Preview>, PreviewError>;
}

/// The URL a post should be previewed for.
///
/// The first value of `like-of`, `in-reply-to`, `repost-of` or
/// `bookmark-of`, in that order; otherwise the first http(s) link in the
/// first `content` value.
pub fn preview_url(doc: &Document) -> Option<String> {
    for name in TARGET_PROPERTIES {
        if let Some(first) = doc.property(name).and_then(|values| values.first()) {
            return Some(first.plain().to_string());
        }
    }

    let content = doc.property("content")?.first()?;
    let text = match content {
        PropertyValue::Html { html, .. } => html.as_str(),
        other => other.plain(),
    };
    LINK.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(props: &[(&str, &str)]) -> Document {
        let mut doc = Document::new(vec!["h-entry".into()]);
        for (name, value) in props {
            doc.set_property(*name, vec![PropertyValue::text(*value)]);
        }
        doc
    }

    #[test]
    fn target_priority() {
        let d = doc(&[
            ("bookmark-of", "https://b.example"),
            ("in-reply-to", "https://r.example"),
            ("content", "https://c.example"),
        ]);
        assert_eq!(preview_url(&d).as_deref(), Some("https://r.example"));
    }

    #[test]
    fn link_from_html_content() {
        let mut d = doc(&[]);
        d.set_property(
            "content",
            vec![PropertyValue::Html {
                html: r#"<a href="https://example.com/x">x</a>"#.into(),
                value: "x".into(),
            }],
        );
        assert_eq!(preview_url(&d).as_deref(), Some("https://example.com/x"));
    }

    #[test]
    fn nothing_to_preview() {
        assert_eq!(preview_url(&doc(&[("content", "no links here")])), None);
        assert_eq!(preview_url(&doc(&[("name", "title")])), None);
    }

    #[test]
    fn empty_preview() {
        let p = Preview {
            url: "https://example.com".into(),
            ..Default::default()
        };
        assert!(p.is_empty());
        assert_eq!(
            serde_json::to_string(&p).unwrap(),
            r#"{"url":"https://example.com"}"#
        );
    }
}
