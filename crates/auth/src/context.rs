//! Trusted request context.
//!
//! Whatever builds a [`RequestContext`] (the HTTP layer, a test) is asserting
//! that every attribute in it came from the trusted reverse proxy. Nothing in
//! this crate reads headers implicitly.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value of a single asserted attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multi(Vec<String>),
}

impl AttributeValue {
    /// All values of the attribute; a scalar is a one-element set.
    pub fn values(&self) -> &[String] {
        match self {
            AttributeValue::Single(v) => std::slice::from_ref(v),
            AttributeValue::Multi(vs) => vs,
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.values().first().map(String::as_str)
    }

    /// The attribute rendered as one string. Multi-valued attributes are joined
    /// with `,`, the way a proxy folds repeated headers.
    pub fn joined(&self) -> Cow<'_, str> {
        match self {
            AttributeValue::Single(v) => Cow::Borrowed(v),
            AttributeValue::Multi(vs) if vs.len() == 1 => Cow::Borrowed(&vs[0]),
            AttributeValue::Multi(vs) => Cow::Owned(vs.join(",")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values().iter().all(|v| v.is_empty())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Single(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Single(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        AttributeValue::Multi(value)
    }
}

impl<const N: usize> From<[&str; N]> for AttributeValue {
    fn from(value: [&str; N]) -> Self {
        AttributeValue::Multi(value.iter().map(|v| v.to_string()).collect())
    }
}

/// Attribute map for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestContext {
    attributes: BTreeMap<String, AttributeValue>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut AttributeValue> {
        self.attributes.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RequestContext
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = RequestContext::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

/// Scheme and host the client used to reach the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// `scheme://host`
    pub fn application_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}
