use std::{borrow::Cow, iter::FromIterator};

use crate::{BINARY_PARAM_KEYS, FILE_REF_PREFIX};

/// A single request parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Sent as-is.
    Text(String),
    /// Locator (path or URL) whose content is uploaded as a file part.
    FileRef(String),
}

impl ParamValue {
    /// Classify a raw value the way the API documents it: `@<locator>` on an
    /// image-carrying key is a file reference, anything else is text.
    ///
    /// An empty value is never a file reference.
    pub fn classify(key: &str, raw: &str) -> Self {
        match raw.strip_prefix(FILE_REF_PREFIX) {
            Some(locator) if BINARY_PARAM_KEYS.contains(&key) => {
                ParamValue::FileRef(locator.to_string())
            }
            _ => ParamValue::Text(raw.to_string()),
        }
    }

    pub fn is_file_ref(&self) -> bool {
        matches!(self, ParamValue::FileRef(_))
    }

    /// The value in the raw form it was given in, `@`-prefixed for files.
    pub fn to_raw(&self) -> Cow<'_, str> {
        match self {
            ParamValue::Text(s) => Cow::Borrowed(s),
            ParamValue::FileRef(s) => Cow::Owned(format!("{}{}", FILE_REF_PREFIX, s)),
        }
    }
}

/// Ordered parameter mapping with unique keys.
///
/// Inserting an existing key replaces its value and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert<K: Into<String>>(&mut self, key: K, value: ParamValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Add a plain text parameter.
    pub fn text<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.insert(key, ParamValue::Text(value.into()));
        self
    }

    /// Add a file parameter; `locator` is read when the request is built.
    pub fn file<K, V>(mut self, key: K, locator: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.insert(key, ParamValue::FileRef(locator.into()));
        self
    }

    /// Add a parameter given in raw form, see [`ParamValue::classify`].
    pub fn raw<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let key = key.into();
        let value = ParamValue::classify(&key, value.as_ref());
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_file_ref(&self) -> bool {
        self.entries.iter().any(|(_, v)| v.is_file_ref())
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Params::new(), |params, (k, v)| params.raw(k, v))
    }
}
