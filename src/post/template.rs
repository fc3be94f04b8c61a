//! post::template
//!
//! Storage path and permalink templates.
//!
//! # Syntax
//!
//! Literal text with `{...}` placeholders:
//! - `{slug}` - the post slug
//! - `{Y}`, `{m}`, `{d}`, `{H}`, `{M}`, `{S}`, ... - one strftime conversion
//!   applied to the published time
//! - `{published:%Y}` - long form, any strftime string
//!
//! Substitution does no escaping. Templates are parsed once when
//! configuration loads; rendering cannot fail.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use micropub_git::post::template::PathTemplate;
//!
//! let template = PathTemplate::parse("{Y}/{m}/{d}/{slug}").unwrap();
//! let published = NaiveDate::from_ymd_opt(2019, 8, 15).unwrap()
//!     .and_hms_opt(14, 16, 34).unwrap();
//! assert_eq!(template.render(&published, "blub"), "2019/08/15/blub");
//! ```

use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from template parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unbalanced braces in template '{0}'")]
    Unbalanced(String),

    #[error("unknown placeholder '{{{name}}}' in template '{template}'")]
    UnknownPlaceholder { template: String, name: String },

    #[error("invalid time format '{format}' in template '{template}'")]
    InvalidFormat { template: String, format: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slug,
    Time(String),
}

/// A parsed path or permalink template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template string.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for unbalanced braces, unknown placeholder
    /// names, or strftime strings that cannot format a zone-less timestamp.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while !rest.is_empty() {
            let open = rest.find('{');
            let close = rest.find('}');
            match (open, close) {
                (None, None) => {
                    segments.push(Segment::Literal(rest.to_string()));
                    break;
                }
                (Some(o), Some(c)) if o < c => {
                    if o > 0 {
                        segments.push(Segment::Literal(rest[..o].to_string()));
                    }
                    let name = &rest[o + 1..c];
                    if name.contains('{') {
                        return Err(TemplateError::Unbalanced(source.to_string()));
                    }
                    segments.push(Self::placeholder(source, name)?);
                    rest = &rest[c + 1..];
                }
                _ => return Err(TemplateError::Unbalanced(source.to_string())),
            }
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    fn placeholder(template: &str, name: &str) -> Result<Segment, TemplateError> {
        if name == "slug" {
            return Ok(Segment::Slug);
        }

        let format = if let Some(format) = name.strip_prefix("published:") {
            format.to_string()
        } else if name.len() == 1 && name.chars().all(|c| c.is_ascii_alphabetic()) {
            format!("%{name}")
        } else {
            return Err(TemplateError::UnknownPlaceholder {
                template: template.to_string(),
                name: name.to_string(),
            });
        };

        // Formatting errors depend on the conversion kinds only, so one probe
        // decides it for every timestamp.
        let probe = NaiveDate::default().and_time(Default::default());
        let mut out = String::new();
        if format.is_empty() || write!(out, "{}", probe.format(&format)).is_err() {
            return Err(TemplateError::InvalidFormat {
                template: template.to_string(),
                format,
            });
        }
        Ok(Segment::Time(format))
    }

    /// Substitute the published time and slug.
    pub fn render(&self, published: &NaiveDateTime, slug: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + slug.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slug => out.push_str(slug),
                Segment::Time(format) => {
                    let _ = write!(out, "{}", published.format(format));
                }
            }
        }
        out
    }

    /// Whether the rendered value starts with a literal `/`.
    pub fn is_absolute(&self) -> bool {
        self.source.starts_with('/')
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl TryFrom<String> for PathTemplate {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PathTemplate> for String {
    fn from(template: PathTemplate) -> Self {
        template.source
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}
