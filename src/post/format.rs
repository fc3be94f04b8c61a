//! post::format
//!
//! Rendering of a [`Document`] into a stored post: a YAML front-matter
//! header followed by the body.
//!
//! ```text
//! ---
//! date: '2019-08-15T14:35:45+00:00'
//! tags:
//! - tag1
//! - tag2
//! title: this is a title
//! ---
//!
//! hello
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Timelike};
use serde_yaml::Value;

use crate::mf2::{Document, PropertyValue};

use super::path::parse_dash_fraction;
use super::policy::{Policy, PolicyTable, DATE_FIELDS, DEFAULT_POLICY};
use super::{ContentType, FormattingError};

/// Property holding the post body.
const CONTENT: &str = "content";

/// Naive timestamp grammars tried after the zone-aware ones.
const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Zone-aware grammars beyond strict RFC 3339.
const AWARE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Bytes and content type of a rendered post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPost {
    pub content_type: ContentType,
    pub bytes: Vec<u8>,
}

/// Renders documents through a policy table.
#[derive(Debug, Clone)]
pub struct Formatter {
    policy: &'static PolicyTable,
    offset: FixedOffset,
}

impl Formatter {
    /// `offset` is the zone naive dates are read in and every date is
    /// written in.
    pub fn new(policy: &'static PolicyTable, offset: FixedOffset) -> Self {
        Self { policy, offset }
    }

    /// Formatter over the built-in policy table.
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self::new(&DEFAULT_POLICY, offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Render `doc`.
    ///
    /// # Errors
    ///
    /// - No property survives the policy table
    /// - A date field cannot be parsed
    /// - A header value cannot be serialized
    pub fn format(&self, doc: &Document) -> Result<RenderedPost, FormattingError> {
        let header = self.front_matter(doc)?;
        if header.is_empty() {
            return Err(FormattingError::EmptyMetadata);
        }

        let mut out = String::from("---\n");
        for (key, value) in &header {
            write_entry(&mut out, key, value)?;
        }
        out.push_str("---\n");

        let (content_type, body) = body_of(doc);
        if !body.is_empty() {
            out.push('\n');
            out.push_str(body);
        }

        Ok(RenderedPost {
            content_type,
            bytes: out.into_bytes(),
        })
    }

    /// The header mapping, keyed by destination name.
    ///
    /// Properties are visited in name order; when two sources share a
    /// destination the later name wins.
    pub fn front_matter(&self, doc: &Document) -> Result<BTreeMap<String, Value>, FormattingError> {
        let mut header = BTreeMap::new();

        for (name, values) in &doc.properties {
            let transform = self.policy.lookup(name);
            let value = match transform.policy {
                Policy::Omit => continue,
                Policy::FirstOnly => match values.first() {
                    Some(first) => to_yaml(first)?,
                    None => continue,
                },
                Policy::CopyAll => to_yaml(values)?,
            };

            let key = transform.destination_for(name);
            let value = if DATE_FIELDS.contains(&key) {
                self.repair_dates(key, value)?
            } else {
                value
            };
            header.insert(key.to_string(), value);
        }

        Ok(header)
    }

    fn repair_dates(&self, field: &str, value: Value) -> Result<Value, FormattingError> {
        match value {
            Value::String(raw) => self.repair_date(field, &raw).map(Value::String),
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| self.repair_dates(field, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            other => Err(FormattingError::InvalidDate {
                field: field.to_string(),
                value: format!("{other:?}"),
            }),
        }
    }

    /// Parse `raw` and re-emit it at second precision in this formatter's offset.
    pub fn repair_date(&self, field: &str, raw: &str) -> Result<String, FormattingError> {
        let parsed = self
            .parse_any(raw.trim())
            .ok_or_else(|| FormattingError::InvalidDate {
                field: field.to_string(),
                value: raw.to_string(),
            })?;
        let parsed = parsed.with_nanosecond(0).unwrap_or(parsed);
        Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, false))
    }

    fn parse_any(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        let aware = DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
            AWARE_FORMATS
                .iter()
                .find_map(|format| DateTime::parse_from_str(raw, format).ok())
        });
        if let Some(aware) = aware {
            return Some(aware.with_timezone(&self.offset));
        }

        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .or_else(|| parse_dash_fraction(raw))
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })?;
        self.offset.from_local_datetime(&naive).single()
    }
}

fn to_yaml<T: serde::Serialize>(value: &T) -> Result<Value, FormattingError> {
    serde_yaml::to_value(value).map_err(|e| FormattingError::Serialize(e.to_string()))
}

fn write_entry(out: &mut String, key: &str, value: &Value) -> Result<(), FormattingError> {
    if let (true, Value::String(date)) = (DATE_FIELDS.contains(&key), value) {
        out.push_str(&format!("{key}: '{}'\n", date.replace('\'', "''")));
        return Ok(());
    }

    let mut entry = BTreeMap::new();
    entry.insert(key, value);
    let rendered =
        serde_yaml::to_string(&entry).map_err(|e| FormattingError::Serialize(e.to_string()))?;
    out.push_str(&rendered);
    Ok(())
}

fn body_of(doc: &Document) -> (ContentType, &str) {
    match doc.property(CONTENT).and_then(|values| values.first()) {
        Some(PropertyValue::Html { html, .. }) => (ContentType::Markup, html),
        Some(PropertyValue::Text(text)) => (ContentType::Structured, text),
        _ => (ContentType::Structured, ""),
    }
}
