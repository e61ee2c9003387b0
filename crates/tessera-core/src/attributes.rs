//! Attribute values and maps.
//!
//! Attributes are released by authentication handlers and attribute
//! repositories as multi-valued entries: every key maps to an ordered list of
//! values. Values are either plain strings or instants in time.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Prefix reserved for internal bookkeeping attributes.
///
/// Keys under this namespace never leave the server inside a token.
pub const RESERVED_ATTRIBUTE_NAMESPACE: &str = "tessera.";

/// Multi-valued attribute map keyed by attribute name.
pub type AttributeMap = BTreeMap<String, Vec<AttributeValue>>;

/// Check whether an attribute key lives under the reserved internal namespace.
#[must_use]
pub fn is_reserved_attribute(key: &str) -> bool {
    key.starts_with(RESERVED_ATTRIBUTE_NAMESPACE)
}

/// A single attribute value.
///
/// Serialized with an explicit kind tag so instants survive a store round
/// trip instead of coming back as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Plain text value.
    Text(String),
    /// Point in time, serialized as RFC 3339.
    DateTime(DateTime<Utc>),
}

impl AttributeValue {
    /// Render the value as a string; instants use RFC 3339 with second precision.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            AttributeValue::Text(s) => s.clone(),
            AttributeValue::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::DateTime(value)
    }
}

/// Build an attribute map from `(key, values)` pairs.
///
/// ```
/// use tessera_core::attributes::attribute_map;
///
/// let attrs = attribute_map([("mail", vec!["alice@example.org"])]);
/// assert_eq!(attrs["mail"].len(), 1);
/// ```
pub fn attribute_map<K, V, I>(entries: impl IntoIterator<Item = (K, I)>) -> AttributeMap
where
    K: Into<String>,
    V: Into<AttributeValue>,
    I: IntoIterator<Item = V>,
{
    entries
        .into_iter()
        .map(|(k, values)| (k.into(), values.into_iter().map(Into::into).collect()))
        .collect()
}

/// Merge `incoming` into `target`; keys present in both take the incoming values.
pub fn merge_attributes(target: &mut AttributeMap, incoming: &AttributeMap) {
    for (key, values) in incoming {
        target.insert(key.clone(), values.clone());
    }
}
