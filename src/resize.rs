//! Per-parent-node resize engine.
//!
//! Child tables grow and shrink one parent at a time, never globally. Growth
//! doubles the table and splits every bucket in two; shrinking halves it and
//! joins bucket pairs. Either way each affected bucket re-evaluates its
//! chain/tree representation, so resizing is observationally transparent:
//! every child reachable before is reachable after, at its new masked index.

use crate::node::{
    collect_bucket, delete_sibling, insert_sibling, maybe_treeify, maybe_untreeify,
    rebuild_bucket, Node, Slot,
};

fn new_table<V>(capacity: usize) -> Box<[Slot<V>]> {
    debug_assert!(capacity.is_power_of_two());
    let mut table = Vec::with_capacity(capacity);
    table.resize_with(capacity, || None);
    table.into_boxed_slice()
}

/// Shrink headroom for a given capacity. The bands are asymmetric on purpose:
/// after halving, the table can still absorb this many inserts before it
/// would grow again, so one insert/delete pair cannot thrash.
fn shrink_headroom(capacity: usize) -> usize {
    if capacity >= 32 {
        8
    } else if capacity >= 16 {
        6
    } else if capacity >= 8 {
        4
    } else if capacity >= 4 {
        2
    } else {
        0
    }
}

impl<V> Node<V> {
    /// Add a child with `ch`, creating the table on first use and growing it
    /// when the child count overflows. Idempotent on an existing character.
    pub(crate) fn add_child(&mut self, ch: char) -> bool {
        let table = self.table.get_or_insert_with(|| new_table(1));
        let capacity = table.len();
        let idx = ch as usize & (capacity - 1);
        if !insert_sibling(&mut table[idx], ch) {
            return false;
        }
        maybe_treeify(&mut table[idx]);
        self.child_count += 1;
        if self.child_count > 2 * capacity - 1 {
            self.grow();
        }
        true
    }

    /// Remove the child with `ch` and return it, shrinking the table when
    /// occupancy falls below the band threshold and dropping it entirely at
    /// zero children.
    pub(crate) fn remove_child(&mut self, ch: char) -> Option<Box<Node<V>>> {
        let table = self.table.as_mut()?;
        let capacity = table.len();
        let idx = ch as usize & (capacity - 1);
        let removed = delete_sibling(&mut table[idx], ch)?;
        maybe_untreeify(&mut table[idx]);
        self.child_count -= 1;
        if self.child_count == 0 {
            self.table = None;
        } else if capacity >= 2 && self.child_count < capacity - shrink_headroom(capacity) {
            self.shrink();
        }
        Some(removed)
    }

    /// Double the table, splitting every bucket across the new index bit.
    fn grow(&mut self) {
        let old = self.table.take().expect("grow on a node without a table");
        let old_capacity = old.len();
        let mut table = new_table(old_capacity * 2);
        for (idx, mut slot) in old.into_vec().into_iter().enumerate() {
            if slot.is_none() {
                continue;
            }
            let nodes = collect_bucket(&mut slot);
            let (stay, moved): (Vec<_>, Vec<_>) = nodes
                .into_iter()
                .partition(|n| n.ch as usize & old_capacity == 0);
            table[idx] = rebuild_bucket(stay);
            table[idx + old_capacity] = rebuild_bucket(moved);
        }
        self.table = Some(table);
    }

    /// Halve the table, joining bucket `i + new_capacity` into bucket `i`.
    fn shrink(&mut self) {
        let old = self.table.take().expect("shrink on a node without a table");
        let new_capacity = old.len() / 2;
        let mut table = old.into_vec();
        let upper = table.split_off(new_capacity);
        for (idx, mut high) in upper.into_iter().enumerate() {
            if high.is_none() {
                continue;
            }
            let low = &mut table[idx];
            if low.is_none() {
                // Joining with an empty bucket is a plain move.
                *low = high;
                continue;
            }
            let mut nodes = collect_bucket(low);
            nodes.extend(collect_bucket(&mut high));
            *low = rebuild_bucket(nodes);
        }
        self.table = Some(table.into_boxed_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nth_char(i: u32) -> char {
        char::from_u32('0' as u32 + i).unwrap()
    }

    fn table_capacity<V>(node: &Node<V>) -> usize {
        node.table.as_ref().map_or(0, |t| t.len())
    }

    #[test]
    fn table_created_on_first_child_and_dropped_at_zero() {
        let mut node: Node<u32> = Node::new('r');
        assert!(node.table.is_none());
        assert!(node.add_child('a'));
        assert_eq!(node.child_count, 1);
        assert!(node.table.is_some());
        assert!(node.remove_child('a').is_some());
        assert_eq!(node.child_count, 0);
        assert!(node.table.is_none());
    }

    #[test]
    fn add_child_is_idempotent() {
        let mut node: Node<u32> = Node::new('r');
        assert!(node.add_child('a'));
        assert!(!node.add_child('a'));
        assert_eq!(node.child_count, 1);
    }

    #[test]
    fn grow_doubles_when_count_overflows() {
        let mut node: Node<u32> = Node::new('r');
        node.add_child('a');
        assert_eq!(table_capacity(&node), 1);
        // Second child: 2 > 2*1-1, table doubles.
        node.add_child('b');
        assert_eq!(table_capacity(&node), 2);
        node.add_child('c');
        node.add_child('d');
        assert_eq!(table_capacity(&node), 4);
    }

    #[test]
    fn lookups_survive_grow_and_shrink_cycles() {
        let mut node: Node<u32> = Node::new('r');
        for i in 0..200 {
            assert!(node.add_child(nth_char(i)));
        }
        assert_eq!(node.child_count, 200);
        for i in 0..200 {
            assert!(node.find_child(nth_char(i)).is_some(), "child {i} lost");
        }
        for i in 100..200 {
            assert!(node.remove_child(nth_char(i)).is_some());
        }
        assert_eq!(node.child_count, 100);
        for i in 0..100 {
            assert!(node.find_child(nth_char(i)).is_some(), "child {i} lost");
        }
        for i in 100..200 {
            assert!(node.find_child(nth_char(i)).is_none());
        }
    }

    #[test]
    fn shrink_bands_leave_headroom() {
        let mut node: Node<u32> = Node::new('r');
        for i in 0..64 {
            node.add_child(nth_char(i));
        }
        let capacity = table_capacity(&node);
        assert_eq!(capacity, 64);
        // Deleting down to just below the band threshold halves the table.
        for i in 0..64 {
            node.remove_child(nth_char(i));
            let cap = table_capacity(&node);
            let count = node.child_count;
            if count > 0 && cap > 2 {
                assert!(
                    count >= cap.saturating_sub(shrink_headroom(cap)),
                    "count {count} too low for capacity {cap}"
                );
            }
        }
        assert!(node.table.is_none());
    }

    #[test]
    fn values_ride_through_resizes() {
        let mut node: Node<u32> = Node::new('r');
        for i in 0..50 {
            let ch = nth_char(i);
            node.add_child(ch);
            node.find_child_mut(ch).unwrap().value = Some(i);
        }
        for i in 0..50 {
            assert_eq!(node.find_child(nth_char(i)).unwrap().value, Some(i));
        }
    }
}
