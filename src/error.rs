//! Precondition errors reported at the call boundary.
//!
//! Missing keys, absent prefixes, and empty match results are *not* errors;
//! they come back as `None` or an empty `Vec`. Only malformed input is.

use thiserror::Error;

/// Rejected input to a trie operation. No partial mutation occurs when one of
/// these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrieError {
    /// The key passed to `put`, `get`, or `remove` was empty.
    #[error("key must not be empty")]
    EmptyKey,
    /// The word passed to a prefix-matching operation was empty.
    #[error("word must not be empty")]
    EmptyWord,
    /// The prefix passed to an enumeration operation was empty.
    #[error("prefix must not be empty")]
    EmptyPrefix,
    /// The text passed to a scanning operation was empty.
    #[error("text must not be empty")]
    EmptyText,
}
