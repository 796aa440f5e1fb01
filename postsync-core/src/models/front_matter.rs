use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single front-matter value: either a scalar string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontMatterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FrontMatterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontMatterValue::Scalar(s) => Some(s),
            FrontMatterValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FrontMatterValue::Scalar(_) => None,
            FrontMatterValue::List(items) => Some(items),
        }
    }
}

impl From<&str> for FrontMatterValue {
    fn from(value: &str) -> Self {
        FrontMatterValue::Scalar(value.to_string())
    }
}

impl From<String> for FrontMatterValue {
    fn from(value: String) -> Self {
        FrontMatterValue::Scalar(value)
    }
}

impl From<Vec<String>> for FrontMatterValue {
    fn from(value: Vec<String>) -> Self {
        FrontMatterValue::List(value)
    }
}

impl fmt::Display for FrontMatterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontMatterValue::Scalar(s) => write!(f, "{}", s),
            FrontMatterValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// Ordered mapping of front-matter keys to values.
///
/// Keys keep the order in which they were first inserted, so a decoded header
/// is re-encoded with its keys in the original order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter(IndexMap<String, FrontMatterValue>);

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FrontMatterValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FrontMatterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FrontMatterValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FrontMatterValue> {
        self.0.shift_remove(key)
    }

    /// Returns the `title` key when it holds a scalar.
    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(FrontMatterValue::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FrontMatterValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<FrontMatterValue>> FromIterator<(K, V)> for FrontMatter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fm = FrontMatter::new();
        for (k, v) in iter {
            fm.insert(k, v);
        }
        fm
    }
}
