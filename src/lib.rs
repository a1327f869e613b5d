//! # striped-trie
//!
//! A concurrent, mutable prefix trie mapping character sequences to values.
//!
//! The trie supports exact lookup, shortest/longest prefix matching,
//! full-text scanning for every contained key inside an arbitrary text,
//! bounded prefix enumeration (depth-first or breadth-first), and weakly
//! consistent whole-structure traversal — all under concurrent readers and
//! writers.
//!
//! ## Design
//!
//! - **Hybrid buckets**: siblings colliding under a child-table mask live in
//!   a singly-linked chain until there are eight of them, then in an AVL
//!   tree keyed by character; small trees revert to chains.
//! - **Per-node resizing**: each node's child table doubles when its bucket
//!   load overflows (splitting every bucket in two) and halves when
//!   occupancy falls below an asymmetric band threshold (joining bucket
//!   pairs), with no global rehash ever.
//! - **Striped locking**: one reader-writer lock per leading-character
//!   stripe, so writers on different leading characters never contend and a
//!   whole-structure scan never holds more than one stripe at a time.
//!
//! ## Example
//!
//! ```rust
//! use striped_trie::StripedTrie;
//!
//! let trie = StripedTrie::new();
//! trie.put("rust", 1).unwrap();
//! trie.put("rustacean", 2).unwrap();
//!
//! assert_eq!(trie.get("rust").unwrap(), Some(1));
//!
//! let m = trie.prefix_match("rustaceans unite", true).unwrap().unwrap();
//! assert_eq!(m.key, "rustacean");
//!
//! let found = trie.contains_in_text("the rust book").unwrap();
//! assert_eq!(found[0].key, "rust");
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod found;
mod node;
mod resize;
mod trie;
mod walk;

pub use error::TrieError;
pub use found::{Found, Match};
pub use trie::StripedTrie;

#[cfg(test)]
mod proptests;
