//! Transient result carriers produced by matching operations.

/// A matched key together with its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<V> {
    /// The complete key that matched.
    pub key: String,
    /// The value stored under that key.
    pub value: V,
}

impl<V> Match<V> {
    pub(crate) fn new(key: String, value: V) -> Self {
        Self { key, value }
    }
}

/// A key found inside a scanned text, with its span.
///
/// Offsets are in characters, not bytes, and `end` is inclusive: the key
/// `"ab"` found at the start of a text has `start == 0` and `end == 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found<V> {
    /// Character offset of the first character of the match.
    pub start: usize,
    /// Character offset of the last character of the match (inclusive).
    pub end: usize,
    /// The key that matched.
    pub key: String,
    /// The value stored under that key.
    pub value: V,
}
