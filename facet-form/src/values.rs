//! The flat, ordered multimap that form submissions and query strings decode into.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use indexmap::IndexMap;

/// An ordered multimap of string keys to string values.
///
/// Keys are case-sensitive and remember the order they were first seen in.
/// A key may carry several values (a multi-select, repeated checkboxes), and
/// those values keep the order they were appended in, which is the element
/// order of scalar collections.
///
/// ```
/// use facet_form::FlatValueSet;
///
/// let values = FlatValueSet::from_urlencoded("Employee.Reports=3&Employee.Reports=4");
/// assert_eq!(values.get("Employee.Reports"), Some(&["3".to_string(), "4".to_string()][..]));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FlatValueSet {
    entries: IndexMap<String, Vec<String>>,
}

impl FlatValueSet {
    /// Create an empty value set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an `application/x-www-form-urlencoded` body or query string.
    ///
    /// `+` decodes to a space and percent-escapes are decoded; invalid UTF-8
    /// sequences are replaced rather than rejected, the way browsers submit them.
    pub fn from_urlencoded(input: &str) -> Self {
        form_urlencoded::parse(input.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    /// Append a value under `key`, after any values already stored there.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// All values stored under exactly `key`, in insertion order.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// The first value stored under exactly `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Iterate over `(key, values)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any key is `prefix` itself or lies below it (`prefix.` or `prefix[`).
    ///
    /// An empty prefix matches any non-empty set.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return !self.is_empty();
        }
        self.entries.keys().any(|key| {
            key.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(['.', '[']))
        })
    }
}

impl<K, V> FromIterator<(K, V)> for FlatValueSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FlatValueSet::new();
        values.extend(iter);
        values
    }
}

impl<K, V> Extend<(K, V)> for FlatValueSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.append(key, value);
        }
    }
}

impl fmt::Debug for FlatValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl From<&str> for FlatValueSet {
    fn from(input: &str) -> Self {
        Self::from_urlencoded(input)
    }
}

impl<'a> From<&'a [(&'a str, &'a str)]> for FlatValueSet {
    fn from(pairs: &'a [(&'a str, &'a str)]) -> Self {
        pairs
            .iter()
            .map(|&(key, value)| (key.to_owned(), value.to_owned()))
            .collect()
    }
}
