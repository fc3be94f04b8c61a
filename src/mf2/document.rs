//! mf2::document
//!
//! The canonical micro-format document.
//!
//! A [`Document`] is a list of entry-type tags plus a map of property name to
//! a non-empty sequence of [`PropertyValue`]s. Every shape the wire format
//! allows for a property value is one of the four `PropertyValue` cases;
//! nothing downstream inspects raw JSON.

use std::collections::BTreeMap;

use serde::Serialize;

/// Property map: name to value sequence (sequence order is submission order).
pub type Properties = BTreeMap<String, Vec<PropertyValue>>;

/// The default entry type when a request names none.
pub const DEFAULT_ENTRY_TYPE: &str = "h-entry";

/// Property that carries the post's publication time.
pub const PUBLISHED: &str = "published";

/// Property that carries a caller-chosen slug.
pub const SLUG: &str = "mp-slug";

/// Legacy spelling of [`SLUG`] still sent by some form clients.
pub const SLUG_LEGACY: &str = "mp_slug";

/// Property some clients use to pass the bearer token; never persisted.
pub const ACCESS_TOKEN: &str = "access_token";

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A plain string.
    Text(String),
    /// Rich text: plain rendering plus marked-up rendering.
    Html { html: String, value: String },
    /// An embedded micro-format item (e.g. an `h-card` author).
    Nested(Box<NestedItem>),
    /// Embedded media with alternative text.
    Media { value: String, alt: String },
}

impl PropertyValue {
    /// Shorthand for a [`PropertyValue::Text`].
    pub fn text(value: impl Into<String>) -> Self {
        PropertyValue::Text(value.into())
    }

    /// The string if this is plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The plain-text reading of any value.
    pub fn plain(&self) -> &str {
        match self {
            PropertyValue::Text(s) => s,
            PropertyValue::Html { value, .. } => value,
            PropertyValue::Nested(item) => &item.value,
            PropertyValue::Media { value, .. } => value,
        }
    }
}

/// A nested micro-format item used as a property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedItem {
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub properties: Properties,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// A canonical micro-format document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub properties: Properties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Document {
    /// Create a document with the given types and no properties.
    pub fn new(types: Vec<String>) -> Self {
        Self {
            types,
            properties: Properties::new(),
            children: Vec::new(),
            id: None,
        }
    }

    /// The primary (first) entry type.
    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }

    /// All values of a property.
    pub fn property(&self, name: &str) -> Option<&[PropertyValue]> {
        self.properties.get(name).map(Vec::as_slice)
    }

    /// The first value of a property, if it is plain text.
    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.property(name)
            .and_then(|values| values.first())
            .and_then(PropertyValue::as_text)
    }

    /// Replace a property. Empty sequences are not stored.
    pub fn set_property(&mut self, name: impl Into<String>, values: Vec<PropertyValue>) {
        if !values.is_empty() {
            self.properties.insert(name.into(), values);
        }
    }

    /// Remove a property, returning its values.
    pub fn remove_property(&mut self, name: &str) -> Option<Vec<PropertyValue>> {
        self.properties.remove(name)
    }

    /// The raw `published` string, if present.
    pub fn published(&self) -> Option<&str> {
        self.first_text(PUBLISHED)
    }

    /// The caller-supplied slug, if any.
    pub fn slug(&self) -> Option<&str> {
        self.first_text(SLUG).or_else(|| self.first_text(SLUG_LEGACY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> Document {
        let mut doc = Document::new(vec![DEFAULT_ENTRY_TYPE.to_string()]);
        doc.set_property("content", vec![PropertyValue::text("hello")]);
        doc
    }

    #[test]
    fn first_text_only_for_text_values() {
        let mut doc = entry();
        doc.set_property(
            "summary",
            vec![PropertyValue::Html {
                html: "<b>hi</b>".into(),
                value: "hi".into(),
            }],
        );
        assert_eq!(doc.first_text("content"), Some("hello"));
        assert_eq!(doc.first_text("summary"), None);
        assert_eq!(doc.first_text("missing"), None);
    }

    #[test]
    fn empty_sequences_are_not_stored() {
        let mut doc = entry();
        doc.set_property("category", vec![]);
        assert!(doc.property("category").is_none());
    }

    #[test]
    fn slug_prefers_dashed_spelling() {
        let mut doc = entry();
        doc.set_property(SLUG_LEGACY, vec![PropertyValue::text("old")]);
        assert_eq!(doc.slug(), Some("old"));
        doc.set_property(SLUG, vec![PropertyValue::text("new")]);
        assert_eq!(doc.slug(), Some("new"));
    }

    #[test]
    fn plain_reading_of_each_case() {
        let nested = PropertyValue::Nested(Box::new(NestedItem {
            types: vec!["h-card".into()],
            properties: Properties::new(),
            value: "Jane".into(),
            html: None,
        }));
        let media = PropertyValue::Media {
            value: "https://example.com/a.jpg".into(),
            alt: "a cat".into(),
        };
        assert_eq!(nested.plain(), "Jane");
        assert_eq!(media.plain(), "https://example.com/a.jpg");
    }

    #[test]
    fn serializes_to_wire_shape() {
        let mut doc = entry();
        doc.set_property(
            "photo",
            vec![PropertyValue::Media {
                value: "https://example.com/a.jpg".into(),
                alt: "a cat".into(),
            }],
        );
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "type": ["h-entry"],
                "properties": {
                    "content": ["hello"],
                    "photo": [{"value": "https://example.com/a.jpg", "alt": "a cat"}]
                }
            })
        );
    }
}
