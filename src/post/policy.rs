//! post::policy
//!
//! The property transform table.
//!
//! Most micro-format properties are copied into the document header as-is.
//! A small set of well-known names is reshaped: `name` becomes `title`,
//! reply/like/repost/bookmark targets collapse to a single value, `content`
//! moves to the body. The table is plain data; the formatter consults it once
//! per property and has no per-name branches of its own.

/// What happens to a property's value sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Copy the whole sequence.
    CopyAll,
    /// Keep only the first value, as a scalar.
    FirstOnly,
    /// Drop the property from the header.
    Omit,
}

/// How one source property maps into the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    /// Header key; `None` keeps the source name.
    pub destination: Option<&'static str>,
    pub policy: Policy,
}

impl Transform {
    const fn new(destination: Option<&'static str>, policy: Policy) -> Self {
        Self {
            destination,
            policy,
        }
    }

    /// The header key for a property called `source`.
    pub fn destination_for<'a>(&self, source: &'a str) -> &'a str {
        self.destination.unwrap_or(source)
    }
}

/// Transform applied to properties the table does not list.
pub const DEFAULT_TRANSFORM: Transform = Transform::new(None, Policy::CopyAll);

/// Immutable mapping from source property name to [`Transform`].
#[derive(Debug)]
pub struct PolicyTable {
    entries: &'static [(&'static str, Transform)],
}

impl PolicyTable {
    pub const fn new(entries: &'static [(&'static str, Transform)]) -> Self {
        Self { entries }
    }

    /// The transform for `source`, or [`DEFAULT_TRANSFORM`].
    ///
    /// ```
    /// use micropub_git::post::policy::{Policy, DEFAULT_POLICY};
    ///
    /// let name = DEFAULT_POLICY.lookup("name");
    /// assert_eq!(name.destination_for("name"), "title");
    /// assert_eq!(name.policy, Policy::FirstOnly);
    ///
    /// let custom = DEFAULT_POLICY.lookup("x-custom");
    /// assert_eq!(custom.destination_for("x-custom"), "x-custom");
    /// assert_eq!(custom.policy, Policy::CopyAll);
    /// ```
    pub fn lookup(&self, source: &str) -> Transform {
        self.entries
            .iter()
            .find(|(name, _)| *name == source)
            .map(|(_, transform)| *transform)
            .unwrap_or(DEFAULT_TRANSFORM)
    }

    pub fn entries(&self) -> &'static [(&'static str, Transform)] {
        self.entries
    }
}

/// Header keys holding timestamps; the formatter re-emits these in a fixed form.
pub const DATE_FIELDS: [&str; 2] = ["date", "modified"];

/// The built-in table.
pub static DEFAULT_POLICY: PolicyTable = PolicyTable::new(&[
    ("name", Transform::new(Some("title"), Policy::FirstOnly)),
    ("in-reply-to", Transform::new(None, Policy::FirstOnly)),
    ("like-of", Transform::new(None, Policy::FirstOnly)),
    ("repost-of", Transform::new(None, Policy::FirstOnly)),
    ("bookmark-of", Transform::new(None, Policy::FirstOnly)),
    ("published", Transform::new(Some("date"), Policy::FirstOnly)),
    ("updated", Transform::new(Some("modified"), Policy::FirstOnly)),
    ("category", Transform::new(Some("tags"), Policy::CopyAll)),
    ("summary", Transform::new(None, Policy::FirstOnly)),
    ("location", Transform::new(None, Policy::FirstOnly)),
    ("content", Transform::new(None, Policy::Omit)),
    ("mp-slug", Transform::new(Some("slug"), Policy::FirstOnly)),
]);
