//! Node variant model: the recursive unit of the trie.
//!
//! A node carries one character of a key, an optional value (presence means
//! "this prefix is a complete key"), and a power-of-two child table whose
//! slots hold *buckets* of sibling nodes colliding under the table mask.
//!
//! A bucket is represented one of two ways, tagged on the node's `Link`:
//!
//! - **Chain**: a singly-linked list in insertion order. Cheap for the
//!   common case of a handful of siblings.
//! - **Tree**: an AVL tree keyed by character, used once a chain reaches
//!   [`TREEIFY_SIZE`] siblings. Brings worst-case sibling lookup from O(k)
//!   to O(log k).
//!
//! All nodes of a bucket share one representation. Conversion back to a
//! chain happens when the AVL height drops below [`UNTREEIFY_HEIGHT`].
//! Finding the wrong `Link` variant inside a bucket is a structural bug and
//! panics rather than risk corrupting the shared structure.

/// Chain length at which a bucket converts to the AVL representation.
pub(crate) const TREEIFY_SIZE: usize = 8;

/// AVL height below which a tree bucket reverts to a chain.
pub(crate) const UNTREEIFY_HEIGHT: i32 = 3;

/// A bucket head: the first sibling stored in a table slot, or nothing.
pub(crate) type Slot<V> = Option<Box<Node<V>>>;

/// Sibling linkage, tagging the bucket representation.
pub(crate) enum Link<V> {
    /// Chain-variant bucket: next sibling in insertion order.
    Chain { next: Slot<V> },
    /// Tree-variant bucket: AVL children keyed by character.
    ///
    /// `height` is the height of the subtree rooted here; a missing child
    /// has height −1, a lone node height 0.
    Tree {
        left: Slot<V>,
        right: Slot<V>,
        height: i32,
    },
}

impl<V> Link<V> {
    pub(crate) fn height(&self) -> i32 {
        match self {
            Link::Chain { .. } => 0,
            Link::Tree { height, .. } => *height,
        }
    }

    fn chain_next_mut(&mut self) -> &mut Slot<V> {
        match self {
            Link::Chain { next } => next,
            Link::Tree { .. } => panic!("tree link inside chain bucket"),
        }
    }

    fn tree_children_mut(&mut self) -> (&mut Slot<V>, &mut Slot<V>) {
        match self {
            Link::Tree { left, right, .. } => (left, right),
            Link::Chain { .. } => panic!("chain link inside tree bucket"),
        }
    }
}

/// One node of the trie: a character, an optional value, and children.
pub(crate) struct Node<V> {
    /// The discriminating character at this position.
    pub(crate) ch: char,
    /// Payload; `Some` marks a complete key ending here.
    pub(crate) value: Option<V>,
    /// Number of distinct children reachable through `table`.
    pub(crate) child_count: usize,
    /// Child buckets, power-of-two sized, indexed by `ch & (len - 1)`.
    /// `None` iff `child_count == 0`.
    pub(crate) table: Option<Box<[Slot<V>]>>,
    /// Sibling linkage within this node's own bucket.
    pub(crate) link: Link<V>,
}

impl<V> Node<V> {
    pub(crate) fn new(ch: char) -> Self {
        Self {
            ch,
            value: None,
            child_count: 0,
            table: None,
            link: Link::Chain { next: None },
        }
    }

    pub(crate) fn is_tree(&self) -> bool {
        matches!(self.link, Link::Tree { .. })
    }

    /// Look up a child by exact character.
    pub(crate) fn find_child(&self, ch: char) -> Option<&Node<V>> {
        let table = self.table.as_ref()?;
        let idx = ch as usize & (table.len() - 1);
        find_sibling(table[idx].as_deref(), ch)
    }

    /// Mutable child lookup by exact character.
    pub(crate) fn find_child_mut(&mut self, ch: char) -> Option<&mut Node<V>> {
        let table = self.table.as_mut()?;
        let idx = ch as usize & (table.len() - 1);
        find_sibling_mut(&mut table[idx], ch)
    }
}

// =============================================================================
// Bucket-head operations, dispatched on the head's Link variant
// =============================================================================

/// Find the sibling with `ch` in a bucket.
pub(crate) fn find_sibling<'a, V>(head: Option<&'a Node<V>>, ch: char) -> Option<&'a Node<V>> {
    let node = head?;
    if node.ch == ch {
        return Some(node);
    }
    match &node.link {
        Link::Chain { next } => find_sibling(next.as_deref(), ch),
        Link::Tree { left, right, .. } => {
            if ch < node.ch {
                find_sibling(left.as_deref(), ch)
            } else {
                find_sibling(right.as_deref(), ch)
            }
        }
    }
}

/// Mutable sibling lookup by character.
pub(crate) fn find_sibling_mut<V>(slot: &mut Slot<V>, ch: char) -> Option<&mut Node<V>> {
    let node = slot.as_deref_mut()?;
    if node.ch == ch {
        return Some(node);
    }
    match &mut node.link {
        Link::Chain { next } => find_sibling_mut(next, ch),
        Link::Tree { left, right, .. } => {
            if ch < node.ch {
                find_sibling_mut(left, ch)
            } else {
                find_sibling_mut(right, ch)
            }
        }
    }
}

/// Insert a sibling with `ch` into a bucket.
///
/// Idempotent: an already-present character leaves the bucket untouched and
/// returns `false`. Returns `true` when a node was created.
pub(crate) fn insert_sibling<V>(slot: &mut Slot<V>, ch: char) -> bool {
    let is_tree = matches!(slot.as_deref(), Some(n) if n.is_tree());
    if is_tree {
        if find_sibling(slot.as_deref(), ch).is_some() {
            return false;
        }
        let mut node = Box::new(Node::new(ch));
        node.link = Link::Tree {
            left: None,
            right: None,
            height: 0,
        };
        tree_insert_node(slot, node);
        true
    } else {
        chain_insert(slot, ch)
    }
}

/// Remove the sibling with `ch` from a bucket and return it, detached.
pub(crate) fn delete_sibling<V>(slot: &mut Slot<V>, ch: char) -> Option<Box<Node<V>>> {
    match slot.as_deref() {
        None => None,
        Some(node) if node.is_tree() => tree_remove(slot, ch),
        Some(_) => chain_remove(slot, ch),
    }
}

/// Drain a bucket into a list of detached nodes in canonical order:
/// key-sorted for a tree bucket (in-order walk), insertion order for a
/// chain bucket.
pub(crate) fn collect_bucket<V>(slot: &mut Slot<V>) -> Vec<Box<Node<V>>> {
    let mut out = Vec::new();
    collect_into(slot.take(), &mut out);
    out
}

fn collect_into<V>(node: Option<Box<Node<V>>>, out: &mut Vec<Box<Node<V>>>) {
    let Some(mut node) = node else {
        return;
    };
    match &mut node.link {
        Link::Chain { next } => {
            let rest = next.take();
            out.push(node);
            collect_into(rest, out);
        }
        Link::Tree { left, right, .. } => {
            let l = left.take();
            let r = right.take();
            collect_into(l, out);
            node.link = Link::Chain { next: None };
            out.push(node);
            collect_into(r, out);
        }
    }
}

/// Rebuild a bucket from detached nodes, choosing the representation by
/// size: [`TREEIFY_SIZE`] or more siblings become an AVL tree, fewer stay a
/// chain in the given order.
pub(crate) fn rebuild_bucket<V>(nodes: Vec<Box<Node<V>>>) -> Slot<V> {
    if nodes.len() >= TREEIFY_SIZE {
        let mut head: Slot<V> = None;
        for mut node in nodes {
            node.link = Link::Tree {
                left: None,
                right: None,
                height: 0,
            };
            tree_insert_node(&mut head, node);
        }
        head
    } else {
        let mut head: Slot<V> = None;
        for mut node in nodes.into_iter().rev() {
            node.link = Link::Chain { next: head.take() };
            head = Some(node);
        }
        head
    }
}

/// Convert a chain bucket that has reached [`TREEIFY_SIZE`] into a tree.
pub(crate) fn maybe_treeify<V>(slot: &mut Slot<V>) {
    let len = match slot.as_deref() {
        Some(node) if !node.is_tree() => chain_len(node),
        _ => return,
    };
    if len >= TREEIFY_SIZE {
        let nodes = collect_bucket(slot);
        *slot = rebuild_bucket(nodes);
    }
}

/// Revert a tree bucket to a chain once its height falls below
/// [`UNTREEIFY_HEIGHT`].
pub(crate) fn maybe_untreeify<V>(slot: &mut Slot<V>) {
    let revert = matches!(
        slot.as_deref(),
        Some(node) if node.is_tree() && node.link.height() < UNTREEIFY_HEIGHT
    );
    if revert {
        // An AVL tree below that height holds at most 7 nodes, so the
        // rebuild lands on the chain representation.
        let nodes = collect_bucket(slot);
        *slot = rebuild_bucket(nodes);
    }
}

fn chain_len<V>(mut node: &Node<V>) -> usize {
    let mut n = 1;
    loop {
        match &node.link {
            Link::Chain { next } => match next.as_deref() {
                Some(rest) => {
                    node = rest;
                    n += 1;
                }
                None => return n,
            },
            Link::Tree { .. } => panic!("tree link inside chain bucket"),
        }
    }
}

// =============================================================================
// Chain variant
// =============================================================================

fn chain_insert<V>(slot: &mut Slot<V>, ch: char) -> bool {
    match slot {
        None => {
            *slot = Some(Box::new(Node::new(ch)));
            true
        }
        Some(node) if node.ch == ch => false,
        Some(node) => chain_insert(node.link.chain_next_mut(), ch),
    }
}

fn chain_remove<V>(slot: &mut Slot<V>, ch: char) -> Option<Box<Node<V>>> {
    let head_ch = slot.as_deref()?.ch;
    if head_ch == ch {
        let mut removed = slot.take().expect("head checked above");
        *slot = removed.link.chain_next_mut().take();
        return Some(removed);
    }
    let node = slot.as_deref_mut().expect("head checked above");
    chain_remove(node.link.chain_next_mut(), ch)
}

// =============================================================================
// Tree variant (AVL keyed by character)
// =============================================================================

fn tree_height<V>(slot: &Slot<V>) -> i32 {
    slot.as_deref().map_or(-1, |n| n.link.height())
}

fn update_height<V>(node: &mut Node<V>) {
    let (left_h, right_h) = match &node.link {
        Link::Tree { left, right, .. } => (tree_height(left), tree_height(right)),
        Link::Chain { .. } => panic!("chain link inside tree bucket"),
    };
    match &mut node.link {
        Link::Tree { height, .. } => *height = 1 + left_h.max(right_h),
        Link::Chain { .. } => unreachable!(),
    }
}

fn balance_of<V>(node: &Node<V>) -> i32 {
    match &node.link {
        Link::Tree { left, right, .. } => tree_height(left) - tree_height(right),
        Link::Chain { .. } => panic!("chain link inside tree bucket"),
    }
}

/// Insert an already-detached node into a tree bucket. The caller must have
/// ruled out a duplicate character and set a `Tree` link on the node.
fn tree_insert_node<V>(slot: &mut Slot<V>, node: Box<Node<V>>) {
    if slot.is_none() {
        *slot = Some(node);
        return;
    }
    {
        let cur = slot.as_deref_mut().expect("non-empty slot");
        let cur_ch = cur.ch;
        debug_assert_ne!(node.ch, cur_ch, "duplicate character in tree bucket");
        let (left, right) = cur.link.tree_children_mut();
        if node.ch < cur_ch {
            tree_insert_node(left, node);
        } else {
            tree_insert_node(right, node);
        }
        update_height(cur);
    }
    rebalance(slot);
}

fn tree_remove<V>(slot: &mut Slot<V>, ch: char) -> Option<Box<Node<V>>> {
    let node_ch = slot.as_deref()?.ch;
    if ch == node_ch {
        let mut removed = slot.take().expect("node checked above");
        let (left, right) = removed.link.tree_children_mut();
        let l = left.take();
        let r = right.take();
        *slot = match (l, r) {
            (None, sub) | (sub, None) => sub,
            (Some(l), Some(r)) => {
                // Promote the in-order successor to this position.
                let mut right_slot = Some(r);
                let mut successor = take_min(&mut right_slot);
                successor.link = Link::Tree {
                    left: Some(l),
                    right: right_slot,
                    height: 0,
                };
                let mut promoted = Some(successor);
                let n = promoted.as_deref_mut().expect("just built");
                update_height(n);
                rebalance(&mut promoted);
                promoted
            }
        };
        return Some(removed);
    }

    let node = slot.as_deref_mut().expect("node checked above");
    let (left, right) = node.link.tree_children_mut();
    let removed = if ch < node_ch {
        tree_remove(left, ch)
    } else {
        tree_remove(right, ch)
    };
    if removed.is_some() {
        update_height(node);
        rebalance(slot);
    }
    removed
}

/// Detach and return the minimum node of a non-empty tree bucket.
fn take_min<V>(slot: &mut Slot<V>) -> Box<Node<V>> {
    let has_left = match &slot.as_deref().expect("non-empty slot").link {
        Link::Tree { left, .. } => left.is_some(),
        Link::Chain { .. } => panic!("chain link inside tree bucket"),
    };
    if !has_left {
        let mut node = slot.take().expect("non-empty slot");
        let (_, right) = node.link.tree_children_mut();
        *slot = right.take();
        node.link = Link::Chain { next: None };
        node
    } else {
        let min = {
            let node = slot.as_deref_mut().expect("non-empty slot");
            let (left, _) = node.link.tree_children_mut();
            let min = take_min(left);
            update_height(node);
            min
        };
        rebalance(slot);
        min
    }
}

fn rebalance<V>(slot: &mut Slot<V>) {
    let bf = balance_of(slot.as_deref().expect("rebalance on empty slot"));
    if bf > 1 {
        let node = slot.as_deref_mut().expect("checked above");
        let (left, _) = node.link.tree_children_mut();
        if balance_of(left.as_deref().expect("left-heavy implies left child")) < 0 {
            rotate_left(left);
        }
        rotate_right(slot);
    } else if bf < -1 {
        let node = slot.as_deref_mut().expect("checked above");
        let (_, right) = node.link.tree_children_mut();
        if balance_of(right.as_deref().expect("right-heavy implies right child")) > 0 {
            rotate_right(right);
        }
        rotate_left(slot);
    }
}

fn rotate_right<V>(slot: &mut Slot<V>) {
    let mut node = slot.take().expect("rotate on empty slot");
    let mut pivot = {
        let (left, _) = node.link.tree_children_mut();
        left.take().expect("rotate_right requires a left child")
    };
    {
        let (_, pivot_right) = pivot.link.tree_children_mut();
        let moved = pivot_right.take();
        let (node_left, _) = node.link.tree_children_mut();
        *node_left = moved;
    }
    update_height(&mut node);
    {
        let (_, pivot_right) = pivot.link.tree_children_mut();
        *pivot_right = Some(node);
    }
    update_height(&mut pivot);
    *slot = Some(pivot);
}

fn rotate_left<V>(slot: &mut Slot<V>) {
    let mut node = slot.take().expect("rotate on empty slot");
    let mut pivot = {
        let (_, right) = node.link.tree_children_mut();
        right.take().expect("rotate_left requires a right child")
    };
    {
        let (pivot_left, _) = pivot.link.tree_children_mut();
        let moved = pivot_left.take();
        let (_, node_right) = node.link.tree_children_mut();
        *node_right = moved;
    }
    update_height(&mut node);
    {
        let (pivot_left, _) = pivot.link.tree_children_mut();
        *pivot_left = Some(node);
    }
    update_height(&mut pivot);
    *slot = Some(pivot);
}
