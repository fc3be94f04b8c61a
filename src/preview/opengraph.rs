//! preview::opengraph
//!
//! Previews built from a page's Open Graph `<meta>` tags, falling back to
//! `<title>`.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Response};
use tracing::debug;

use super::{LinkPreviewer, Preview, PreviewError};

/// Upper bound on the amount of HTML inspected.
const MAX_BODY: usize = 512 * 1024;

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid regex"));

static META_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b(?:property|name)\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

static META_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));

/// Fetches pages over HTTP and reads their Open Graph metadata.
#[derive(Debug, Clone)]
pub struct OpenGraphPreviewer {
    client: Client,
}

impl OpenGraphPreviewer {
    /// # Errors
    ///
    /// Returns `PreviewError::Fetch` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, PreviewError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("micropub-git/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PreviewError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkPreviewer for OpenGraphPreviewer {
    async fn preview(&self, url: &str) -> Result<Option<Preview>, PreviewError> {
        let response = self.client.get(url).send().await.map_err(map_fetch)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::Status(status.as_u16()));
        }

        let body = read_capped(response, MAX_BODY).await?;
        let preview = extract(url, &String::from_utf8_lossy(&body));
        debug!(url, found = !preview.is_empty(), "page inspected");
        Ok((!preview.is_empty()).then_some(preview))
    }
}

fn map_fetch(err: reqwest::Error) -> PreviewError {
    if err.is_timeout() {
        PreviewError::Timeout
    } else {
        PreviewError::Fetch(err.to_string())
    }
}

/// Read at most `max` bytes of the body, dropping the rest unread.
async fn read_capped(mut response: Response, max: usize) -> Result<Vec<u8>, PreviewError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(map_fetch)? {
        let room = max - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Build a preview of `url` from its HTML.
pub fn extract(url: &str, html: &str) -> Preview {
    let mut preview = Preview {
        url: url.to_string(),
        ..Preview::default()
    };

    for tag in META_TAG.find_iter(html) {
        let tag = tag.as_str();
        let Some(key) = META_KEY.captures(tag).map(|c| c[1].to_ascii_lowercase()) else {
            continue;
        };
        let Some(content) = META_CONTENT
            .captures(tag)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| decode_entities(m.as_str().trim()))
        else {
            continue;
        };
        if content.is_empty() {
            continue;
        }

        let slot = match key.as_str() {
            "og:title" => &mut preview.title,
            "og:description" => &mut preview.description,
            "og:image" => &mut preview.image,
            "og:site_name" => &mut preview.site_name,
            _ => continue,
        };
        slot.get_or_insert(content);
    }

    if preview.title.is_none() {
        preview.title = TITLE
            .captures(html)
            .map(|c| decode_entities(c[1].trim()))
            .filter(|t| !t.is_empty());
    }

    preview
}

fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
