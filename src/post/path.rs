//! post::path
//!
//! Resolution of a document's storage path and permalink.
//!
//! The published timestamp is read as a wall-clock time: any UTC offset is
//! discarded so that `2019-08-15T14:16:34.6+02:00` files under 14:16:34.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::mf2::document::PUBLISHED;
use crate::mf2::{Document, ValidationError};

use super::template::PathTemplate;

/// Primary published-timestamp grammar; the fraction is optional.
const PUBLISHED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Where a post is stored and where it will be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub storage_path: String,
    pub permalink: String,
    pub slug: String,
    pub published: NaiveDateTime,
}

/// Resolve the storage path and permalink of `doc`.
///
/// The slug is the first `mp-slug` value (or legacy `mp_slug`), else the
/// published time as `HHMMSS`.
///
/// # Errors
///
/// - `published` missing
/// - `published` matching neither timestamp grammar
pub fn resolve(
    doc: &Document,
    storage: &PathTemplate,
    permalink: &PathTemplate,
) -> Result<ResolvedPath, ValidationError> {
    let raw = doc.published().ok_or(ValidationError::MissingField {
        path: "properties".to_string(),
        field: PUBLISHED,
    })?;
    let published = parse_published(raw)?;

    let slug = match doc.slug() {
        Some(slug) => slug.to_string(),
        None => default_slug(&published),
    };

    Ok(ResolvedPath {
        storage_path: storage.render(&published, &slug),
        permalink: permalink.render(&published, &slug),
        slug,
        published,
    })
}

/// The slug used when the request names none.
pub fn default_slug(published: &NaiveDateTime) -> String {
    published.format("%H%M%S").to_string()
}

/// Parse a published timestamp.
///
/// Two grammars are accepted: `YYYY-MM-DDTHH:MM:SS[.ffffff]` and
/// `YYYY-MM-DDTHH:MM:SS-ffffff`. A trailing `Z` or `±HH:MM` is dropped first.
///
/// ```
/// use micropub_git::post::path::parse_published;
///
/// let a = parse_published("2019-08-15T14:16:34.6").unwrap();
/// let b = parse_published("2019-08-15T14:16:34-600000").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn parse_published(raw: &str) -> Result<NaiveDateTime, ValidationError> {
    let wall = strip_offset(raw);
    NaiveDateTime::parse_from_str(wall, PUBLISHED_FORMAT)
        .ok()
        .or_else(|| parse_dash_fraction(wall))
        .ok_or_else(|| ValidationError::InvalidPublished(raw.to_string()))
}

fn strip_offset(raw: &str) -> &str {
    if let Some(stripped) = raw.strip_suffix('Z') {
        return stripped;
    }
    // ±HH:MM; the date part has no colon at this distance from the end.
    let bytes = raw.as_bytes();
    if bytes.len() > 6 {
        let tail = &bytes[bytes.len() - 6..];
        if matches!(tail[0], b'+' | b'-')
            && tail[1].is_ascii_digit()
            && tail[2].is_ascii_digit()
            && tail[3] == b':'
            && tail[4].is_ascii_digit()
            && tail[5].is_ascii_digit()
        {
            return &raw[..raw.len() - 6];
        }
    }
    raw
}

/// `YYYY-MM-DDTHH:MM:SS-ffffff`, the fraction right-padded to nanoseconds.
pub(crate) fn parse_dash_fraction(wall: &str) -> Option<NaiveDateTime> {
    let (date, time) = wall.split_once('T')?;
    let (clock, fraction) = time.split_once('-')?;
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let clock = NaiveTime::parse_from_str(clock, "%H:%M:%S").ok()?;
    let nanos: u32 = format!("{fraction:0<9}").parse().ok()?;
    let time = clock.with_nanosecond(nanos)?;
    Some(date.and_time(time))
}
