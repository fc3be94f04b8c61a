//! mf2::schema
//!
//! Strict validation of structured (JSON) micro-format input.
//!
//! # Schema
//!
//! - Top level: object with required `type` and `properties`, optional
//!   `children` (array of documents) and `id` (string). No other keys.
//! - `type`: non-empty array of strings matching `h-<name>`.
//! - `properties`: object whose keys are lowercase, dash-separated names and
//!   whose values are arrays. Each array item is one of
//!   - a string,
//!   - rich text `{ "html", "value" }`,
//!   - a nested item `{ "type", "properties", "value", "html"? }`,
//!   - media `{ "value", "alt" }`,
//!
//!   with no extra keys on any of the object forms.
//!
//! Validation and conversion happen in one pass: a value that validates is
//! already a [`Document`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::document::{Document, NestedItem, Properties, PropertyValue};
use super::ValidationError;

static TYPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^h-([0-9a-z]+-)?[a-z]+(-[a-z]+)*$").expect("valid regex"));

static PROPERTY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-z]+-)?[a-z]+(-[a-z]+)*$").expect("valid regex"));

/// Validate a JSON value and convert it into a [`Document`].
///
/// # Errors
///
/// Returns a [`ValidationError`] naming the offending location
/// (e.g. `properties.content[0]`).
pub fn parse_document(value: &Value) -> Result<Document, ValidationError> {
    parse_item(value, "")
}

/// Whether `name` is a valid entry type tag.
pub fn is_entry_type(name: &str) -> bool {
    TYPE_PATTERN.is_match(name)
}

/// Whether `name` is a valid property name.
pub fn is_property_name(name: &str) -> bool {
    PROPERTY_PATTERN.is_match(name)
}

fn parse_item(value: &Value, path: &str) -> Result<Document, ValidationError> {
    let obj = value.as_object().ok_or_else(|| ValidationError::NotAnObject {
        path: display_path(path),
    })?;
    reject_unknown_keys(obj, &["type", "properties", "children", "id"], path)?;

    let types = parse_types(required(obj, "type", path)?, &join(path, "type"))?;
    let properties = parse_properties(
        required(obj, "properties", path)?,
        &join(path, "properties"),
    )?;

    let children = match obj.get("children") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, child)| parse_item(child, &format!("{}[{}]", join(path, "children"), i)))
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(ValidationError::NotAnArray {
                path: join(path, "children"),
            })
        }
    };

    let id = match obj.get("id") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(ValidationError::InvalidValue {
                path: join(path, "id"),
                reason: "must be a string".into(),
            })
        }
    };

    Ok(Document {
        types,
        properties,
        children,
        id,
    })
}

fn parse_types(value: &Value, path: &str) -> Result<Vec<String>, ValidationError> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::NotAnArray { path: path.into() })?;
    if items.is_empty() {
        return Err(ValidationError::EmptyTypes { path: path.into() });
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item.as_str() {
            Some(t) if is_entry_type(t) => Ok(t.to_string()),
            _ => Err(ValidationError::InvalidType {
                path: format!("{path}[{i}]"),
                value: item.to_string(),
            }),
        })
        .collect()
}

fn parse_properties(value: &Value, path: &str) -> Result<Properties, ValidationError> {
    let obj = value.as_object().ok_or_else(|| ValidationError::NotAnObject {
        path: path.into(),
    })?;

    let mut properties = Properties::new();
    for (name, values) in obj {
        if !is_property_name(name) {
            return Err(ValidationError::InvalidPropertyName {
                path: path.into(),
                name: name.clone(),
            });
        }
        let prop_path = join(path, name);
        let items = values.as_array().ok_or_else(|| ValidationError::NotAnArray {
            path: prop_path.clone(),
        })?;
        if items.is_empty() {
            return Err(ValidationError::InvalidValue {
                path: prop_path,
                reason: "must not be empty".into(),
            });
        }
        let parsed = items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_value(item, &format!("{prop_path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        properties.insert(name.clone(), parsed);
    }
    Ok(properties)
}

fn parse_value(value: &Value, path: &str) -> Result<PropertyValue, ValidationError> {
    let obj = match value {
        Value::String(s) => return Ok(PropertyValue::Text(s.clone())),
        Value::Object(obj) => obj,
        _ => {
            return Err(ValidationError::InvalidValue {
                path: path.into(),
                reason: "must be a string or an object".into(),
            })
        }
    };

    if obj.contains_key("type") || obj.contains_key("properties") {
        reject_unknown_keys(obj, &["type", "properties", "value", "html"], path)?;
        let types = parse_types(required(obj, "type", path)?, &join(path, "type"))?;
        let properties = parse_properties(
            required(obj, "properties", path)?,
            &join(path, "properties"),
        )?;
        let value = required_str(obj, "value", path)?;
        let html = optional_str(obj, "html", path)?;
        return Ok(PropertyValue::Nested(Box::new(NestedItem {
            types,
            properties,
            value,
            html,
        })));
    }

    if obj.contains_key("html") {
        reject_unknown_keys(obj, &["html", "value"], path)?;
        return Ok(PropertyValue::Html {
            html: required_str(obj, "html", path)?,
            value: required_str(obj, "value", path)?,
        });
    }

    if obj.contains_key("alt") {
        reject_unknown_keys(obj, &["value", "alt"], path)?;
        return Ok(PropertyValue::Media {
            value: required_str(obj, "value", path)?,
            alt: required_str(obj, "alt", path)?,
        });
    }

    Err(ValidationError::InvalidValue {
        path: path.into(),
        reason: "object must be rich text, a nested item or media".into(),
    })
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    key: &'static str,
    path: &str,
) -> Result<&'a Value, ValidationError> {
    obj.get(key).ok_or_else(|| ValidationError::MissingField {
        path: display_path(path),
        field: key,
    })
}

fn required_str(
    obj: &Map<String, Value>,
    key: &'static str,
    path: &str,
) -> Result<String, ValidationError> {
    match required(obj, key, path)? {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ValidationError::InvalidValue {
            path: join(path, key),
            reason: "must be a string".into(),
        }),
    }
}

fn optional_str(
    obj: &Map<String, Value>,
    key: &'static str,
    path: &str,
) -> Result<Option<String>, ValidationError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::InvalidValue {
            path: join(path, key),
            reason: "must be a string".into(),
        }),
    }
}

fn reject_unknown_keys(
    obj: &Map<String, Value>,
    allowed: &[&str],
    path: &str,
) -> Result<(), ValidationError> {
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(ValidationError::UnexpectedField {
            path: display_path(path),
            field: key.clone(),
        }),
        None => Ok(()),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod accepts {
        use super::*;

        #[test]
        fn minimal_entry() {
            let doc = parse_document(&json!({
                "type": ["h-entry"],
                "properties": {"content": ["hello"]}
            }))
            .unwrap();
            assert_eq!(doc.types, vec!["h-entry"]);
            assert_eq!(doc.first_text("content"), Some("hello"));
        }

        #[test]
        fn all_four_value_shapes() {
            let doc = parse_document(&json!({
                "type": ["h-entry"],
                "properties": {
                    "content": [{"html": "<p>hi</p>", "value": "hi"}],
                    "author": [{
                        "type": ["h-card"],
                        "properties": {"name": ["Jane"]},
                        "value": "Jane"
                    }],
                    "photo": [{"value": "https://example.com/a.jpg", "alt": "a cat"}],
                    "category": ["one", "two"]
                }
            }))
            .unwrap();

            assert!(matches!(
                doc.property("content").unwrap()[0],
                PropertyValue::Html { .. }
            ));
            assert!(matches!(
                doc.property("author").unwrap()[0],
                PropertyValue::Nested(_)
            ));
            assert!(matches!(
                doc.property("photo").unwrap()[0],
                PropertyValue::Media { .. }
            ));
            assert_eq!(doc.property("category").unwrap().len(), 2);
        }

        #[test]
        fn vendor_prefixed_names() {
            assert!(is_entry_type("h-x-custom"));
            assert!(is_entry_type("h-entry"));
            assert!(is_property_name("mp-slug"));
            assert!(is_property_name("in-reply-to"));
            assert!(is_property_name("p3k-flag"));
        }

        #[test]
        fn children_and_id() {
            let doc = parse_document(&json!({
                "type": ["h-feed"],
                "properties": {},
                "id": "feed",
                "children": [{"type": ["h-entry"], "properties": {}}]
            }))
            .unwrap();
            assert_eq!(doc.id.as_deref(), Some("feed"));
            assert_eq!(doc.children.len(), 1);
        }
    }

    mod rejects {
        use super::*;

        #[test]
        fn non_object() {
            let err = parse_document(&json!("this is not good json")).unwrap_err();
            assert!(matches!(err, ValidationError::NotAnObject { .. }));
        }

        #[test]
        fn missing_type_and_properties() {
            let err = parse_document(&json!({"stuff": "blah"})).unwrap_err();
            assert!(matches!(err, ValidationError::UnexpectedField { .. }));

            let err = parse_document(&json!({"properties": {}})).unwrap_err();
            assert!(matches!(
                err,
                ValidationError::MissingField { field: "type", .. }
            ));

            let err = parse_document(&json!({"type": ["h-entry"]})).unwrap_err();
            assert!(matches!(
                err,
                ValidationError::MissingField {
                    field: "properties",
                    ..
                }
            ));
        }

        #[test]
        fn bad_entry_type() {
            let err = parse_document(&json!({"type": ["entry"], "properties": {}})).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidType { .. }));

            let err = parse_document(&json!({"type": [], "properties": {}})).unwrap_err();
            assert!(matches!(err, ValidationError::EmptyTypes { .. }));

            let err = parse_document(&json!({"type": "h-entry", "properties": {}})).unwrap_err();
            assert!(matches!(err, ValidationError::NotAnArray { .. }));
        }

        #[test]
        fn bad_property_name() {
            let err = parse_document(&json!({
                "type": ["h-entry"],
                "properties": {"Content": ["x"]}
            }))
            .unwrap_err();
            assert!(matches!(err, ValidationError::InvalidPropertyName { .. }));

            let err = parse_document(&json!({
                "type": ["h-entry"],
                "properties": {"access_token": ["x"]}
            }))
            .unwrap_err();
            assert!(matches!(err, ValidationError::InvalidPropertyName { .. }));
        }

        #[test]
        fn scalar_property() {
            let err = parse_document(&json!({
                "type": ["h-entry"],
                "properties": {"content": "hello"}
            }))
            .unwrap_err();
            assert!(matches!(err, ValidationError::NotAnArray { ref path } if path == "properties.content"));
        }

        #[test]
        fn empty_value_sequences() {
            for name in ["published", "category"] {
                let err = parse_document(&json!({
                    "type": ["h-entry"],
                    "properties": {"content": ["hi"], name: []}
                }))
                .unwrap_err();
                assert_eq!(
                    err,
                    ValidationError::InvalidValue {
                        path: format!("properties.{name}"),
                        reason: "must not be empty".into(),
                    }
                );
            }
        }

        #[test]
        fn disallowed_value_shapes() {
            for bad in [
                json!(42),
                json!(null),
                json!(["nested"]),
                json!({"value": "no alt or html"}),
                json!({"html": "<b>x</b>"}),
                json!({"html": "<b>x</b>", "value": "x", "extra": 1}),
                json!({"value": "u", "alt": 3}),
                json!({"type": ["h-card"], "properties": {}}),
            ] {
                let input = json!({"type": ["h-entry"], "properties": {"content": [bad.clone()]}});
                assert!(parse_document(&input).is_err(), "{bad} should be rejected");
            }
        }

        #[test]
        fn error_names_location() {
            let err = parse_document(&json!({
                "type": ["h-entry"],
                "properties": {"content": ["ok", 1]}
            }))
            .unwrap_err();
            assert!(err.to_string().contains("properties.content[1]"));
        }
    }
}
