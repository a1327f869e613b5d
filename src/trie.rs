//! The top-level concurrent trie.
//!
//! Concurrency is striped by leading character: the fixed root table has one
//! slot per low-16-bit character value, and every slot carries its own
//! reader-writer lock guarding the whole subtree hanging off it. A single-key
//! operation therefore locks exactly one stripe for its duration, and writes
//! to keys with different leading characters never contend.
//!
//! Global bookkeeping (`len`, `height`, the key-length histogram) lives
//! behind one small mutex, always acquired *after* the stripe lock and never
//! the other way around, so counter maintenance cannot invert lock order or
//! block an unrelated stripe.
//!
//! Whole-structure scans (`traversal`, `values`, `keys`, `clear`) take the
//! stripe locks one at a time, releasing each before moving on. They are
//! weakly consistent by design: a key inserted concurrently under an
//! already-visited stripe can be missed and one under a not-yet-visited
//! stripe can be observed, but no key is seen twice and no committed entry
//! is ever partially read. A global lock would serialize every scan against
//! every writer; this structure exists to avoid exactly that.

use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};

use crate::error::TrieError;
use crate::found::{Found, Match};
use crate::node::{find_sibling_mut, insert_sibling, maybe_treeify, Slot};
use crate::walk;

/// Width of the fixed root table and of the lock striping, in bits.
const ROOT_BITS: u32 = 16;
/// Number of root slots (and stripes). The root never resizes.
const ROOT_CAPACITY: usize = 1 << ROOT_BITS;
const ROOT_MASK: usize = ROOT_CAPACITY - 1;

/// Global counters, maintained under their own mutex.
#[derive(Default)]
struct Counters {
    /// Number of keys carrying a value.
    size: usize,
    /// Count of active keys by character length. `height` is the last
    /// populated length, so deletion never needs a tree scan.
    lengths: BTreeMap<usize, usize>,
}

impl Counters {
    fn record_insert(&mut self, key_len: usize) {
        self.size += 1;
        *self.lengths.entry(key_len).or_insert(0) += 1;
    }

    fn record_remove(&mut self, key_len: usize) {
        self.size = self.size.saturating_sub(1);
        if let Some(n) = self.lengths.get_mut(&key_len) {
            *n -= 1;
            if *n == 0 {
                self.lengths.remove(&key_len);
            }
        }
    }

    fn height(&self) -> usize {
        self.lengths.keys().next_back().copied().unwrap_or(0)
    }
}

/// A concurrent mutable prefix trie mapping character sequences to values.
///
/// Supports exact lookup, shortest/longest prefix matching, full-text
/// scanning for contained keys, bounded prefix enumeration, and weakly
/// consistent whole-structure traversal, all under concurrent readers and
/// writers.
///
/// Values are cloned out under the read lock, so `V: Clone`; cheap-to-clone
/// payloads (or `Arc`-wrapped ones) are the intended use.
///
/// # Example
///
/// ```rust
/// use striped_trie::StripedTrie;
///
/// let trie = StripedTrie::new();
/// trie.put("he", 1).unwrap();
/// trie.put("hello", 2).unwrap();
///
/// assert_eq!(trie.get("hello").unwrap(), Some(2));
/// assert_eq!(trie.match_word("hello world", true).unwrap(), Some(2));
/// assert_eq!(trie.match_word("hello world", false).unwrap(), Some(1));
/// ```
pub struct StripedTrie<V> {
    /// One bucket head per low-16-bit leading character, each behind its
    /// own stripe lock. Characters above U+FFFF collide after masking and
    /// are told apart inside the bucket like any other collision.
    slots: Box<[RwLock<Slot<V>>]>,
    counters: Mutex<Counters>,
}

impl<V: Clone> StripedTrie<V> {
    /// Create an empty trie.
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(ROOT_CAPACITY);
        slots.resize_with(ROOT_CAPACITY, || RwLock::new(None));
        Self {
            slots: slots.into_boxed_slice(),
            counters: Mutex::new(Counters::default()),
        }
    }

    fn stripe(&self, ch: char) -> &RwLock<Slot<V>> {
        &self.slots[ch as usize & ROOT_MASK]
    }

    fn leading(input: &str, empty: TrieError) -> Result<char, TrieError> {
        input.chars().next().ok_or(empty)
    }

    /// Insert `key` with `value`, returning the previous value if the key
    /// was already present.
    pub fn put(&self, key: &str, value: V) -> Result<Option<V>, TrieError> {
        let first = Self::leading(key, TrieError::EmptyKey)?;
        let mut guard = self.stripe(first).write();
        insert_sibling(&mut guard, first);
        maybe_treeify(&mut guard);
        let mut node = find_sibling_mut(&mut guard, first).expect("just inserted");
        for ch in key.chars().skip(1) {
            node.add_child(ch);
            node = node.find_child_mut(ch).expect("just inserted");
        }
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.counters.lock().record_insert(key.chars().count());
        }
        Ok(previous)
    }

    /// Insert every pair of an iterator. Insertion order does not affect the
    /// resulting structure's contents; callers conventionally pass sorted
    /// maps.
    pub fn put_all<I>(&self, pairs: I) -> Result<(), TrieError>
    where
        I: IntoIterator<Item = (String, V)>,
    {
        for (key, value) in pairs {
            self.put(&key, value)?;
        }
        Ok(())
    }

    /// Exact lookup.
    pub fn get(&self, key: &str) -> Result<Option<V>, TrieError> {
        let first = Self::leading(key, TrieError::EmptyKey)?;
        let guard = self.stripe(first).read();
        Ok(walk::find_node(guard.as_deref(), key).and_then(|n| n.value.clone()))
    }

    /// Value of the shortest (`longest == false`) or longest valued prefix
    /// of `word`.
    pub fn match_word(&self, word: &str, longest: bool) -> Result<Option<V>, TrieError> {
        let first = Self::leading(word, TrieError::EmptyWord)?;
        let guard = self.stripe(first).read();
        Ok(walk::prefix_match(guard.as_deref(), word, longest).map(|hit| hit.value.clone()))
    }

    /// Values of every valued prefix of `word`, shortest to longest, at most
    /// `max` of them.
    pub fn match_word_all(&self, word: &str, max: usize) -> Result<Vec<V>, TrieError> {
        let first = Self::leading(word, TrieError::EmptyWord)?;
        let guard = self.stripe(first).read();
        Ok(walk::prefix_match_all(guard.as_deref(), word, max)
            .into_iter()
            .map(|hit| hit.value.clone())
            .collect())
    }

    /// The shortest or longest valued prefix of `word`, as a key/value pair.
    pub fn prefix_match(&self, word: &str, longest: bool) -> Result<Option<Match<V>>, TrieError> {
        let first = Self::leading(word, TrieError::EmptyWord)?;
        let guard = self.stripe(first).read();
        Ok(walk::prefix_match(guard.as_deref(), word, longest)
            .map(|hit| Match::new(word[..hit.bytes].to_string(), hit.value.clone())))
    }

    /// Every valued prefix of `word` as key/value pairs, shortest to
    /// longest, at most `max` of them.
    pub fn prefix_match_all(&self, word: &str, max: usize) -> Result<Vec<Match<V>>, TrieError> {
        let first = Self::leading(word, TrieError::EmptyWord)?;
        let guard = self.stripe(first).read();
        Ok(walk::prefix_match_all(guard.as_deref(), word, max)
            .into_iter()
            .map(|hit| Match::new(word[..hit.bytes].to_string(), hit.value.clone()))
            .collect())
    }

    /// One key extending `prefix`: the shallowest such key, or the deepest
    /// when `longest` is set. The prefix itself counts when it is a key.
    pub fn key_with_prefix(
        &self,
        prefix: &str,
        longest: bool,
    ) -> Result<Option<Match<V>>, TrieError> {
        let first = Self::leading(prefix, TrieError::EmptyPrefix)?;
        let guard = self.stripe(first).read();
        let Some(node) = walk::find_node(guard.as_deref(), prefix) else {
            return Ok(None);
        };
        let hit = if longest {
            walk::deepest_key(node, prefix)
        } else {
            walk::shallowest_key(node, prefix)
        };
        Ok(hit.map(|(key, value)| Match::new(key, value.clone())))
    }

    /// Keys extending `prefix` (the prefix itself included when it is a
    /// key), at most `max` results, at most `depth` characters beyond the
    /// prefix. Depth-first order is lexicographic; breadth-first order is
    /// by level (shorter keys first).
    pub fn keys_with_prefix(
        &self,
        prefix: &str,
        max: usize,
        depth: usize,
        depth_first: bool,
    ) -> Result<Vec<Match<V>>, TrieError> {
        let first = Self::leading(prefix, TrieError::EmptyPrefix)?;
        let guard = self.stripe(first).read();
        let Some(node) = walk::find_node(guard.as_deref(), prefix) else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        if depth_first {
            walk::collect_dfs(node, prefix, max, depth, &mut found);
        } else {
            walk::collect_bfs(node, prefix, max, depth, &mut found);
        }
        Ok(found
            .into_iter()
            .map(|(key, value)| Match::new(key, value.clone()))
            .collect())
    }

    /// Scan `text` for contained keys, keeping the best match per anchor
    /// position: the longest valued prefix when `longest` is set, otherwise
    /// the shortest. With `one_by_one` the anchor advances one character at
    /// a time; without it the anchor jumps past each match.
    ///
    /// Each anchor locks only its own stripe, so a scan interleaves freely
    /// with writers on other leading characters.
    pub fn match_in_text(
        &self,
        text: &str,
        longest: bool,
        one_by_one: bool,
    ) -> Result<Vec<Found<V>>, TrieError> {
        Self::leading(text, TrieError::EmptyText)?;
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut found = Vec::new();
        let mut anchor = 0;
        while anchor < chars.len() {
            let (byte_pos, first) = chars[anchor];
            let hit = {
                let guard = self.stripe(first).read();
                walk::prefix_match(guard.as_deref(), &text[byte_pos..], longest)
                    .map(|hit| (hit.chars, hit.bytes, hit.value.clone()))
            };
            match hit {
                Some((hit_chars, hit_bytes, value)) => {
                    found.push(Found {
                        start: anchor,
                        end: anchor + hit_chars - 1,
                        key: text[byte_pos..byte_pos + hit_bytes].to_string(),
                        value,
                    });
                    anchor += if one_by_one { 1 } else { hit_chars };
                }
                None => anchor += 1,
            }
        }
        Ok(found)
    }

    /// Scan `text` for contained keys, keeping *every* valued prefix at each
    /// anchor position, at most `max` results overall. Anchor advancement
    /// works as in [`Self::match_in_text`]; without `one_by_one` the anchor jumps
    /// past the longest match found at the position.
    pub fn match_all_in_text(
        &self,
        text: &str,
        one_by_one: bool,
        max: usize,
    ) -> Result<Vec<Found<V>>, TrieError> {
        Self::leading(text, TrieError::EmptyText)?;
        let mut found = Vec::new();
        if max == 0 {
            return Ok(found);
        }
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut anchor = 0;
        while anchor < chars.len() && found.len() < max {
            let (byte_pos, first) = chars[anchor];
            let hits = {
                let guard = self.stripe(first).read();
                walk::prefix_match_all(guard.as_deref(), &text[byte_pos..], max - found.len())
                    .into_iter()
                    .map(|hit| (hit.chars, hit.bytes, hit.value.clone()))
                    .collect::<Vec<_>>()
            };
            let advance = match hits.last() {
                Some((last_chars, _, _)) if !one_by_one => *last_chars,
                _ => 1,
            };
            for (hit_chars, hit_bytes, value) in hits {
                found.push(Found {
                    start: anchor,
                    end: anchor + hit_chars - 1,
                    key: text[byte_pos..byte_pos + hit_bytes].to_string(),
                    value,
                });
            }
            anchor += advance;
        }
        Ok(found)
    }

    /// Scan `text` for contained keys: longest match per position, jumping
    /// past each match. Shorthand for the common containment query.
    pub fn contains_in_text(&self, text: &str) -> Result<Vec<Found<V>>, TrieError> {
        self.match_in_text(text, true, false)
    }

    /// Visit every key of length at most `depth` in lexicographic order,
    /// until the visitor returns `false`.
    ///
    /// Weakly consistent: stripes are locked and released one at a time, so
    /// concurrent writes under other stripes may or may not be observed.
    pub fn traversal<F>(&self, depth: usize, mut visitor: F)
    where
        F: FnMut(&str, &V) -> bool,
    {
        if depth == 0 {
            return;
        }
        for slot in self.slots.iter() {
            let guard = slot.read();
            if !walk::visit_bucket(guard.as_deref(), depth, &mut visitor) {
                return;
            }
        }
    }

    /// All values for keys of length at most `depth`, in key order.
    pub fn values(&self, depth: usize) -> Vec<V> {
        let mut out = Vec::new();
        self.traversal(depth, |_, value| {
            out.push(value.clone());
            true
        });
        out
    }

    /// All keys of length at most `depth`, in order.
    pub fn keys(&self, depth: usize) -> Vec<String> {
        let mut out = Vec::new();
        self.traversal(depth, |key, _| {
            out.push(key.to_string());
            true
        });
        out
    }

    /// Remove `key`, returning its previous value. Dead branches left by the
    /// removal are pruned. Absent keys change nothing.
    pub fn remove(&self, key: &str) -> Result<Option<V>, TrieError> {
        let first = Self::leading(key, TrieError::EmptyKey)?;
        let mut guard = self.stripe(first).write();
        let previous = walk::remove_key(&mut guard, key);
        if previous.is_some() {
            self.counters.lock().record_remove(key.chars().count());
        }
        Ok(previous)
    }

    /// Length in characters of the longest key present.
    pub fn height(&self) -> usize {
        self.counters.lock().height()
    }

    /// Number of keys present.
    pub fn len(&self) -> usize {
        self.counters.lock().size
    }

    /// Whether the trie holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every key. Stripes are cleared one at a time, each reconciling
    /// the counters for exactly the keys it drops before its write lock is
    /// released. A writer racing the sweep loses its entry when its stripe
    /// has not been swept yet and keeps it when it has; either way the
    /// counters agree with the surviving keys.
    pub fn clear(&self) {
        for slot in self.slots.iter() {
            let mut guard = slot.write();
            let mut dropped: Vec<usize> = Vec::new();
            walk::visit_bucket(guard.as_deref(), usize::MAX, &mut |key: &str, _| {
                dropped.push(key.chars().count());
                true
            });
            *guard = None;
            if !dropped.is_empty() {
                let mut counters = self.counters.lock();
                for key_len in dropped {
                    counters.record_remove(key_len);
                }
            }
        }
    }
}

impl<V: Clone> Default for StripedTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}
