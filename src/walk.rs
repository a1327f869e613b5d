//! Stateless matching and traversal algorithms over nodes.
//!
//! Everything here operates on a bucket head or a node reference handed in
//! by the trie, which is responsible for holding the right striping lock for
//! the duration of the call. Nothing in this module locks or touches global
//! counters.
//!
//! Ordered enumeration gathers all siblings of a node — across every table
//! slot — into one transient sorted collection before descending. Table
//! slots are masked by low character bits, so slot order alone is not
//! lexicographic, and chain buckets keep insertion order; the per-node sort
//! gives both variants the same canonical order.

use std::str::Chars;

use smallvec::SmallVec;

use crate::node::{
    delete_sibling, find_sibling, find_sibling_mut, maybe_untreeify, Link, Node, Slot,
};

/// A valued prefix of a word, located during a prefix walk.
pub(crate) struct PrefixHit<'a, V> {
    /// Length of the matched prefix in characters.
    pub(crate) chars: usize,
    /// Length of the matched prefix in bytes.
    pub(crate) bytes: usize,
    /// The value stored at the matched prefix.
    pub(crate) value: &'a V,
}

/// Walk `word` exactly, starting at a bucket head. Fails fast on the first
/// missing character.
pub(crate) fn find_node<'a, V>(head: Option<&'a Node<V>>, word: &str) -> Option<&'a Node<V>> {
    let mut chars = word.chars();
    let first = chars.next()?;
    let mut node = find_sibling(head, first)?;
    for ch in chars {
        node = node.find_child(ch)?;
    }
    Some(node)
}

/// Find the shortest (`longest == false`) or deepest (`longest == true`)
/// valued prefix of `word`. The walk stops at the first missing character.
pub(crate) fn prefix_match<'a, V>(
    head: Option<&'a Node<V>>,
    word: &str,
    longest: bool,
) -> Option<PrefixHit<'a, V>> {
    let mut best = None;
    let mut node: Option<&Node<V>> = None;
    for (count, (pos, ch)) in word.char_indices().enumerate() {
        let next = match node {
            None => find_sibling(head, ch),
            Some(n) => n.find_child(ch),
        };
        let Some(n) = next else { break };
        if let Some(value) = &n.value {
            let hit = PrefixHit {
                chars: count + 1,
                bytes: pos + ch.len_utf8(),
                value,
            };
            if !longest {
                return Some(hit);
            }
            best = Some(hit);
        }
        node = Some(n);
    }
    best
}

/// Collect every valued prefix of `word`, shortest to longest, stopping at
/// `max` results.
pub(crate) fn prefix_match_all<'a, V>(
    head: Option<&'a Node<V>>,
    word: &str,
    max: usize,
) -> Vec<PrefixHit<'a, V>> {
    let mut out = Vec::new();
    if max == 0 {
        return out;
    }
    let mut node: Option<&Node<V>> = None;
    for (count, (pos, ch)) in word.char_indices().enumerate() {
        let next = match node {
            None => find_sibling(head, ch),
            Some(n) => n.find_child(ch),
        };
        let Some(n) = next else { break };
        if let Some(value) = &n.value {
            out.push(PrefixHit {
                chars: count + 1,
                bytes: pos + ch.len_utf8(),
                value,
            });
            if out.len() >= max {
                break;
            }
        }
        node = Some(n);
    }
    out
}

/// All children of a node, sorted by character.
fn children_sorted<V>(node: &Node<V>) -> SmallVec<[&Node<V>; 8]> {
    let mut out = SmallVec::new();
    if let Some(table) = &node.table {
        for slot in table.iter() {
            push_bucket(slot.as_deref(), &mut out);
        }
    }
    out.sort_unstable_by_key(|n| n.ch);
    out
}

/// All siblings of a bucket, appended in bucket-internal order.
fn push_bucket<'a, V>(head: Option<&'a Node<V>>, out: &mut SmallVec<[&'a Node<V>; 8]>) {
    let Some(node) = head else { return };
    match &node.link {
        Link::Chain { next } => {
            out.push(node);
            push_bucket(next.as_deref(), out);
        }
        Link::Tree { left, right, .. } => {
            push_bucket(left.as_deref(), out);
            out.push(node);
            push_bucket(right.as_deref(), out);
        }
    }
}

/// Depth-first enumeration of valued descendants of `start` (itself
/// included), in lexicographic order, at most `depth` characters beyond the
/// anchor, capped at `max` results.
pub(crate) fn collect_dfs<'a, V>(
    start: &'a Node<V>,
    anchor: &str,
    max: usize,
    depth: usize,
    out: &mut Vec<(String, &'a V)>,
) {
    if max == 0 {
        return;
    }
    let mut key = String::from(anchor);
    dfs(start, &mut key, depth, max, out);
}

fn dfs<'a, V>(
    node: &'a Node<V>,
    key: &mut String,
    levels_left: usize,
    max: usize,
    out: &mut Vec<(String, &'a V)>,
) -> bool {
    if let Some(value) = &node.value {
        out.push((key.clone(), value));
        if out.len() >= max {
            return false;
        }
    }
    if levels_left == 0 {
        return true;
    }
    for child in children_sorted(node) {
        key.push(child.ch);
        let keep_going = dfs(child, key, levels_left - 1, max, out);
        key.pop();
        if !keep_going {
            return false;
        }
    }
    true
}

/// Breadth-first enumeration of valued descendants of `start` (itself
/// included), in level order, bounded like [`collect_dfs`].
pub(crate) fn collect_bfs<'a, V>(
    start: &'a Node<V>,
    anchor: &str,
    max: usize,
    depth: usize,
    out: &mut Vec<(String, &'a V)>,
) {
    if max == 0 {
        return;
    }
    if let Some(value) = &start.value {
        out.push((anchor.to_string(), value));
        if out.len() >= max {
            return;
        }
    }
    let mut level: Vec<(String, &Node<V>)> = vec![(anchor.to_string(), start)];
    let mut remaining = depth;
    while remaining > 0 && !level.is_empty() {
        let mut next_level = Vec::new();
        for (key, node) in &level {
            for child in children_sorted(*node) {
                let mut child_key = key.clone();
                child_key.push(child.ch);
                if let Some(value) = &child.value {
                    out.push((child_key.clone(), value));
                    if out.len() >= max {
                        return;
                    }
                }
                next_level.push((child_key, child));
            }
        }
        level = next_level;
        remaining -= 1;
    }
}

/// The shallowest valued descendant of `start` (anchor included); among
/// equals, the lexicographically first.
pub(crate) fn shallowest_key<'a, V>(start: &'a Node<V>, anchor: &str) -> Option<(String, &'a V)> {
    let mut out = Vec::with_capacity(1);
    collect_bfs(start, anchor, 1, usize::MAX, &mut out);
    out.pop()
}

/// The deepest valued descendant of `start` (anchor included); among
/// equals, the lexicographically first.
pub(crate) fn deepest_key<'a, V>(start: &'a Node<V>, anchor: &str) -> Option<(String, &'a V)> {
    let mut key = String::from(anchor);
    let mut best: Option<(String, &V)> = None;
    let mut best_depth = 0usize;
    deepest(start, &mut key, 0, &mut best, &mut best_depth);
    best
}

fn deepest<'a, V>(
    node: &'a Node<V>,
    key: &mut String,
    depth: usize,
    best: &mut Option<(String, &'a V)>,
    best_depth: &mut usize,
) {
    if let Some(value) = &node.value {
        if best.is_none() || depth > *best_depth {
            *best = Some((key.clone(), value));
            *best_depth = depth;
        }
    }
    for child in children_sorted(node) {
        key.push(child.ch);
        deepest(child, key, depth + 1, best, best_depth);
        key.pop();
    }
}

/// Visit valued nodes of a top-level bucket in lexicographic order, keys at
/// most `depth` characters long. The visitor returns `false` to stop the
/// whole traversal.
pub(crate) fn visit_bucket<'a, V, F>(head: Option<&'a Node<V>>, depth: usize, f: &mut F) -> bool
where
    F: FnMut(&str, &'a V) -> bool,
{
    if depth == 0 {
        return true;
    }
    let mut siblings: SmallVec<[&Node<V>; 8]> = SmallVec::new();
    push_bucket(head, &mut siblings);
    siblings.sort_unstable_by_key(|n| n.ch);
    let mut key = String::new();
    for node in siblings {
        key.push(node.ch);
        let keep_going = visit_node(node, &mut key, depth - 1, f);
        key.clear();
        if !keep_going {
            return false;
        }
    }
    true
}

fn visit_node<'a, V, F>(node: &'a Node<V>, key: &mut String, levels_left: usize, f: &mut F) -> bool
where
    F: FnMut(&str, &'a V) -> bool,
{
    if let Some(value) = &node.value {
        if !f(key, value) {
            return false;
        }
    }
    if levels_left == 0 {
        return true;
    }
    for child in children_sorted(node) {
        key.push(child.ch);
        let keep_going = visit_node(child, key, levels_left - 1, f);
        key.pop();
        if !keep_going {
            return false;
        }
    }
    true
}

/// Remove `key` from the bucket rooted at `slot`, pruning the dead branch
/// left behind: ancestors with no value and no remaining children unwind
/// away with the removal. Returns the previous value, `None` when the key
/// was absent (in which case nothing is mutated).
pub(crate) fn remove_key<V>(slot: &mut Slot<V>, key: &str) -> Option<V> {
    let mut chars = key.chars();
    let first = chars.next()?;
    let node = find_sibling_mut(slot, first)?;
    let (previous, delete_node) = remove_rec(node, chars);
    if delete_node {
        delete_sibling(slot, first).expect("walked sibling must still be present");
        maybe_untreeify(slot);
    }
    previous
}

fn remove_rec<V>(node: &mut Node<V>, mut rest: Chars<'_>) -> (Option<V>, bool) {
    let Some(ch) = rest.next() else {
        let previous = node.value.take();
        return (previous, node.child_count == 0);
    };
    let Some(child) = node.find_child_mut(ch) else {
        return (None, false);
    };
    let (previous, delete_child) = remove_rec(child, rest);
    if delete_child {
        node.remove_child(ch).expect("walked child must still be present");
    }
    (previous, node.value.is_none() && node.child_count == 0)
}
