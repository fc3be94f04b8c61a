//! mf2::normalize
//!
//! Conversion of raw create requests into canonical documents.
//!
//! Structured input is validated by [`schema`](super::schema) and otherwise
//! left alone. Form input is converted field by field: `h` / `h[]` supply
//! entry types, every other field becomes a property whose value sequence
//! keeps submission order. Both paths then get the same defaulting:
//! `h-entry` when no type survived, a `published` timestamp when none was
//! given, and removal of any `access_token`.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde_json::Value;

use super::document::{Document, PropertyValue, ACCESS_TOKEN, DEFAULT_ENTRY_TYPE, PUBLISHED};
use super::schema::{is_entry_type, parse_document};
use super::ValidationError;

/// Form field naming additional entry types.
const TYPE_FIELD: &str = "h";

/// Field selecting a non-create operation.
const ACTION_FIELD: &str = "action";

/// Suffix marking a multi-valued form field.
const MULTI_SUFFIX: &str = "[]";

/// A create request as received, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateRequest {
    /// Structured micro-format JSON.
    Json(Value),
    /// Decoded form fields in submission order.
    Form(Vec<(String, String)>),
}

impl CreateRequest {
    /// Pick the request representation. Structured input always wins and the
    /// two are never merged.
    pub fn from_parts(json: Option<Value>, form: Vec<(String, String)>) -> Self {
        match json {
            Some(value) if !value.is_null() => CreateRequest::Json(value),
            _ => CreateRequest::Form(form),
        }
    }

    /// The requested action, if the request names one explicitly.
    pub fn action(&self) -> Option<&str> {
        match self {
            CreateRequest::Json(value) => value.get(ACTION_FIELD).and_then(Value::as_str),
            CreateRequest::Form(fields) => field(fields, ACTION_FIELD),
        }
    }

    /// A bearer token carried inside the body.
    pub fn access_token(&self) -> Option<&str> {
        match self {
            CreateRequest::Json(value) => value.get(ACCESS_TOKEN).and_then(Value::as_str),
            CreateRequest::Form(fields) => field(fields, ACCESS_TOKEN),
        }
    }
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Normalize a create request into a canonical document.
///
/// `now` is used only when the request carries no `published` property.
///
/// # Errors
///
/// - Structured input that violates the micro-format schema
/// - Form input without any property fields
/// - Form entry types that do not form a valid `h-*` tag
pub fn normalize(
    request: CreateRequest,
    now: DateTime<FixedOffset>,
) -> Result<Document, ValidationError> {
    let mut doc = match request {
        CreateRequest::Json(value) => json_to_document(value)?,
        CreateRequest::Form(fields) => form_to_document(&fields)?,
    };
    fill_defaults(&mut doc, now);
    doc.remove_property(ACCESS_TOKEN);
    Ok(doc)
}

fn json_to_document(mut value: Value) -> Result<Document, ValidationError> {
    // Transport-level keys are not part of the document.
    if let Some(obj) = value.as_object_mut() {
        obj.remove(ACTION_FIELD);
        obj.remove(ACCESS_TOKEN);
    }
    parse_document(&value)
}

/// Convert decoded form fields into a document (no defaulting).
///
/// # Errors
///
/// Returns `ValidationError::NoProperties` if nothing but `h`, `action` and
/// `access_token` was submitted.
pub fn form_to_document(fields: &[(String, String)]) -> Result<Document, ValidationError> {
    let mut doc = Document::new(Vec::new());

    for (key, value) in fields {
        let name = key.strip_suffix(MULTI_SUFFIX).unwrap_or(key);
        match name {
            "" | ACTION_FIELD | ACCESS_TOKEN => {}
            TYPE_FIELD => {
                let tag = format!("h-{value}");
                if !is_entry_type(&tag) {
                    return Err(ValidationError::InvalidType {
                        path: key.clone(),
                        value: format!("\"{value}\""),
                    });
                }
                doc.types.push(tag);
            }
            _ => doc
                .properties
                .entry(name.to_string())
                .or_default()
                .push(PropertyValue::Text(value.clone())),
        }
    }

    if doc.properties.is_empty() {
        return Err(ValidationError::NoProperties);
    }
    Ok(doc)
}

fn fill_defaults(doc: &mut Document, now: DateTime<FixedOffset>) {
    if doc.types.is_empty() {
        doc.types.push(DEFAULT_ENTRY_TYPE.to_string());
    }
    if doc.property(PUBLISHED).is_none() {
        doc.set_property(
            PUBLISHED,
            vec![PropertyValue::Text(
                now.to_rfc3339_opts(SecondsFormat::Micros, false),
            )],
        );
    }
}
