//! Ordered, multi-valued request parameters.
//!
//! Query strings and form bodies are both built from [`Params`]. Keys may
//! repeat; insertion order is preserved on the wire.

use std::fmt::Display;
use url::form_urlencoded;

/// Builder for assembling request parameter pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a required key/value pair.
    pub fn add<T>(&mut self, key: &str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Append the value unless it is empty.
    pub fn maybe_add(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.add(key, value);
        }
    }

    /// Append each non-empty value under the same key.
    pub fn maybe_add_many<S>(&mut self, key: &str, values: &[S])
    where
        S: AsRef<str>,
    {
        for value in values {
            self.maybe_add(key, value.as_ref());
        }
    }

    /// Append the value unless it is zero.
    pub fn maybe_add_int(&mut self, key: &str, value: i64) {
        if value != 0 {
            self.add(key, value);
        }
    }

    /// Append `true` when the flag is set; an unset flag is omitted.
    pub fn maybe_add_bool(&mut self, key: &str, value: bool) {
        if value {
            self.add(key, "true");
        }
    }

    /// All values stored under `key`, in insertion order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The collected key/value pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }

    /// Decode an `application/x-www-form-urlencoded` string.
    #[must_use]
    pub fn decode(input: &str) -> Self {
        form_urlencoded::parse(input.as_bytes())
            .into_owned()
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
