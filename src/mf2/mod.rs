//! mf2
//!
//! Request normalization: turns a JSON or form-encoded create request into a
//! canonical micro-format [`Document`].
//!
//! # Modules
//!
//! - [`document`] - The canonical document and its closed value type
//! - [`schema`] - Strict validation of structured (JSON) input
//! - [`normalize`] - Form conversion, defaulting and token stripping
//!
//! # Example
//!
//! ```
//! use chrono::{FixedOffset, TimeZone};
//! use micropub_git::mf2::{normalize, CreateRequest};
//!
//! let now = FixedOffset::east_opt(0).unwrap()
//!     .with_ymd_and_hms(2019, 8, 15, 14, 16, 34).unwrap();
//! let request = CreateRequest::Form(vec![
//!     ("content".into(), "hello".into()),
//!     ("category[]".into(), "one".into()),
//!     ("category[]".into(), "two".into()),
//! ]);
//!
//! let doc = normalize(request, now).unwrap();
//! assert_eq!(doc.types, vec!["h-entry"]);
//! assert_eq!(doc.property("category").unwrap().len(), 2);
//! assert!(doc.published().is_some());
//! ```

pub mod document;
pub mod normalize;
pub mod schema;

pub use document::{Document, NestedItem, Properties, PropertyValue};
pub use normalize::{normalize, CreateRequest};

use thiserror::Error;

/// Malformed or schema-violating input. Always the caller's fault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{path}: expected an object")]
    NotAnObject { path: String },

    #[error("{path}: expected an array")]
    NotAnArray { path: String },

    #[error("{path}: missing required field '{field}'")]
    MissingField { path: String, field: &'static str },

    #[error("{path}: unexpected field '{field}'")]
    UnexpectedField { path: String, field: String },

    #[error("{path}: at least one entry type is required")]
    EmptyTypes { path: String },

    #[error("{path}: invalid entry type {value}")]
    InvalidType { path: String, value: String },

    #[error("{path}: invalid property name '{name}'")]
    InvalidPropertyName { path: String, name: String },

    #[error("{path}: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("form request carries no properties")]
    NoProperties,

    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("invalid published date '{0}'")]
    InvalidPublished(String),
}
