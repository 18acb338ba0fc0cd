//! Ordered document
//!
//! Keys keep their insertion order. The server picks indexes by the position
//! of the first key, so reordering a document changes its meaning.

use crate::error::{DriverError, Result};

use super::{Binary, ObjectId, Value};

/// An ordered mapping from string keys to values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set a key.
    ///
    /// An existing key keeps its position and its previous value is returned;
    /// a new key is appended.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Chaining form of [`insert`](Self::insert)
    pub fn append(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Remove a key, shifting later keys down so their order is kept
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|index| self.entries.remove(index).1)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Key of the first entry
    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|(k, _)| k.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// Append a key the caller knows is not present yet
    pub(crate) fn push_new(&mut self, key: String, value: Value) {
        self.entries.push((key, value));
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    fn require(&self, key: &str) -> Result<&Value> {
        self.get(key)
            .ok_or_else(|| DriverError::KeyNotFound(key.to_string()))
    }

    fn mismatch(key: &str, expected: &'static str, found: &Value) -> DriverError {
        DriverError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| Self::mismatch(key, "string", value))
    }

    pub fn get_i32(&self, key: &str) -> Result<i32> {
        let value = self.require(key)?;
        value.as_i32().ok_or_else(|| Self::mismatch(key, "int32", value))
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        let value = self.require(key)?;
        value.as_i64().ok_or_else(|| Self::mismatch(key, "int64", value))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        value.as_f64().ok_or_else(|| Self::mismatch(key, "double", value))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| Self::mismatch(key, "bool", value))
    }

    pub fn get_document(&self, key: &str) -> Result<&Document> {
        let value = self.require(key)?;
        value
            .as_document()
            .ok_or_else(|| Self::mismatch(key, "document", value))
    }

    pub fn get_array(&self, key: &str) -> Result<&[Value]> {
        let value = self.require(key)?;
        value.as_array().ok_or_else(|| Self::mismatch(key, "array", value))
    }

    pub fn get_binary(&self, key: &str) -> Result<&Binary> {
        let value = self.require(key)?;
        value.as_binary().ok_or_else(|| Self::mismatch(key, "binary", value))
    }

    pub fn get_object_id(&self, key: &str) -> Result<ObjectId> {
        let value = self.require(key)?;
        value
            .as_object_id()
            .ok_or_else(|| Self::mismatch(key, "objectId", value))
    }

    /// Any numeric field as i64, failing if the conversion would lose data
    pub fn get_integer(&self, key: &str) -> Result<i64> {
        let value = self.require(key)?;
        value
            .to_i64_lossless()
            .ok_or_else(|| Self::mismatch(key, "integral number", value))
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Borrowing iterator over `(key, value)` pairs in insertion order
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, (String, Value)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a str, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut document = Document::new();
        for (key, value) in iter {
            document.insert(key, value);
        }
        document
    }
}

/// Build a [`Document`] from `key => value` pairs, keeping their order.
///
/// ```
/// use docwire::doc;
///
/// let query = doc! { "name" => "ada", "age" => 36 };
/// assert_eq!(query.first_key(), Some("name"));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::bson::Document::new()
    };
    ( $( $key:expr => $value:expr ),+ $(,)? ) => {{
        let mut document = $crate::bson::Document::new();
        $( document.insert($key, $value); )+
        document
    }};
}
