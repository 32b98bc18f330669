//! B+ Tree Index for ClutchDB
//!
//! This module implements an in-memory B+ tree mapping ordered keys to values.
//! The B+ tree is a self-balancing tree data structure that maintains sorted data
//! and allows searches, sequential access, insertions, and deletions in O(log n) time.
//!
//! Nodes live in an arena and refer to each other by index. Leaves are linked
//! in both directions so ordered scans never revisit internal nodes; the links
//! are plain indices and carry no ownership.

use std::ops::{Bound, RangeBounds};

use crate::error::{Error, Result};

/// Index of a node inside the tree's arena
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Internal<K> {
    /// Separators; `keys.len() == children.len() - 1`
    keys: Vec<K>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Leaf<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug, Clone)]
enum Node<K, V> {
    Internal(Internal<K>),
    Leaf(Leaf<K, V>),
}

impl<K, V> Node<K, V> {
    fn key_count(&self) -> usize {
        match self {
            Node::Internal(n) => n.keys.len(),
            Node::Leaf(n) => n.keys.len(),
        }
    }
}

enum InsertOutcome<K, V> {
    /// The key existed; its previous value is returned
    Replaced(V),
    /// A new entry was added, possibly splitting the node into (separator, right sibling)
    Inserted(Option<(K, NodeId)>),
}

/// B+ Tree Index
#[derive(Debug)]
pub struct BPlusTree<K, V> {
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
    root: NodeId,
    /// Maximum number of children of an internal node
    order: usize,
    len: usize,
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Create a new empty B+ tree; `order` must be at least 3
    pub fn new(order: usize) -> Result<Self> {
        if order < 3 {
            return Err(Error::InvalidConfig(format!(
                "B+ tree order must be at least 3, got {}",
                order
            )));
        }

        let root = Node::Leaf(Leaf {
            keys: Vec::new(),
            values: Vec::new(),
            prev: None,
            next: None,
        });

        Ok(Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            root: 0,
            order,
            len: 0,
        })
    }

    /// Number of entries in the tree
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of levels, a lone leaf root counts as 1
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut curr = self.root;
        while let Node::Internal(n) = self.node(curr) {
            curr = n.children[0];
            height += 1;
        }
        height
    }

    /// Search for a key in the tree
    pub fn find(&self, key: &K) -> Option<&V> {
        let leaf = self.leaf(self.find_leaf(key));
        leaf.keys.binary_search(key).ok().map(|pos| &leaf.values[pos])
    }

    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.find_leaf(key);
        let leaf = self.leaf_mut(id);
        match leaf.keys.binary_search(key) {
            Ok(pos) => Some(&mut leaf.values[pos]),
            Err(_) => None,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Insert a key-value pair, returning the previous value for the key
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.insert_into(self.root, key, value) {
            InsertOutcome::Replaced(old) => Some(old),
            InsertOutcome::Inserted(split) => {
                self.len += 1;
                if let Some((separator, right)) = split {
                    // Root split, create new root
                    let old_root = self.root;
                    self.root = self.alloc(Node::Internal(Internal {
                        keys: vec![separator],
                        children: vec![old_root, right],
                    }));
                }
                None
            }
        }
    }

    fn insert_into(&mut self, id: NodeId, key: K, value: V) -> InsertOutcome<K, V> {
        let order = self.order;

        let (pos, child) = match self.node_mut(id) {
            Node::Leaf(leaf) => {
                match leaf.keys.binary_search(&key) {
                    Ok(pos) => {
                        return InsertOutcome::Replaced(std::mem::replace(
                            &mut leaf.values[pos],
                            value,
                        ))
                    }
                    Err(pos) => {
                        leaf.keys.insert(pos, key);
                        leaf.values.insert(pos, value);
                    }
                }
                if leaf.keys.len() < order {
                    return InsertOutcome::Inserted(None);
                }
                return InsertOutcome::Inserted(Some(self.split_leaf(id)));
            }
            Node::Internal(n) => {
                let pos = child_index(&n.keys, &key);
                (pos, n.children[pos])
            }
        };

        match self.insert_into(child, key, value) {
            InsertOutcome::Inserted(Some((separator, right))) => {
                let n = self.internal_mut(id);
                n.keys.insert(pos, separator);
                n.children.insert(pos + 1, right);

                if n.keys.len() < order {
                    InsertOutcome::Inserted(None)
                } else {
                    InsertOutcome::Inserted(Some(self.split_internal(id)))
                }
            }
            outcome => outcome,
        }
    }

    /// Move the upper half of a full leaf into a new leaf linked right after it
    fn split_leaf(&mut self, id: NodeId) -> (K, NodeId) {
        let (keys, values, next) = {
            let leaf = self.leaf_mut(id);
            let mid = leaf.keys.len() / 2;
            (
                leaf.keys.split_off(mid),
                leaf.values.split_off(mid),
                leaf.next,
            )
        };

        let separator = keys[0].clone();
        let right = self.alloc(Node::Leaf(Leaf {
            keys,
            values,
            prev: Some(id),
            next,
        }));

        self.leaf_mut(id).next = Some(right);
        if let Some(next) = next {
            self.leaf_mut(next).prev = Some(right);
        }

        (separator, right)
    }

    /// Split a full internal node; the middle key moves up and is not kept below
    fn split_internal(&mut self, id: NodeId) -> (K, NodeId) {
        let (separator, keys, children) = {
            let n = self.internal_mut(id);
            let mid = n.keys.len() / 2;
            let keys = n.keys.split_off(mid + 1);
            let children = n.children.split_off(mid + 1);
            let separator = n.keys.remove(mid);
            (separator, keys, children)
        };

        let right = self.alloc(Node::Internal(Internal { keys, children }));
        (separator, right)
    }

    /// Delete a key, reporting whether it was present
    pub fn delete(&mut self, key: &K) -> bool {
        self.remove(key).is_some()
    }

    /// Delete a key and return its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.remove_from(self.root, key)?;
        self.len -= 1;

        // An internal root left with a single child hands the root role down
        if let Node::Internal(n) = self.node(self.root) {
            if n.keys.is_empty() {
                let child = n.children[0];
                let old_root = self.root;
                self.root = child;
                self.release(old_root);
            }
        }

        Some(removed)
    }

    fn remove_from(&mut self, id: NodeId, key: &K) -> Option<V> {
        let (pos, child) = match self.node_mut(id) {
            Node::Leaf(leaf) => {
                let pos = leaf.keys.binary_search(key).ok()?;
                leaf.keys.remove(pos);
                return Some(leaf.values.remove(pos));
            }
            Node::Internal(n) => {
                let pos = child_index(&n.keys, key);
                (pos, n.children[pos])
            }
        };

        let removed = self.remove_from(child, key)?;
        if self.node(child).key_count() < self.min_keys() {
            self.rebalance_child(id, pos);
        }
        Some(removed)
    }

    /// Restore minimum occupancy of `parent.children[pos]`: borrow from the
    /// left sibling, then the right one, else merge
    fn rebalance_child(&mut self, parent: NodeId, pos: usize) {
        let min = self.min_keys();
        let (left, child, right) = {
            let p = self.internal(parent);
            (
                pos.checked_sub(1).map(|i| p.children[i]),
                p.children[pos],
                p.children.get(pos + 1).copied(),
            )
        };

        if let Some(left) = left {
            if self.node(left).key_count() > min {
                self.borrow_from_left(parent, pos, left, child);
                return;
            }
        }
        if let Some(right) = right {
            if self.node(right).key_count() > min {
                self.borrow_from_right(parent, pos, child, right);
                return;
            }
        }

        if let Some(left) = left {
            self.merge(parent, pos - 1, left, child);
        } else if let Some(right) = right {
            self.merge(parent, pos, child, right);
        }
    }

    fn borrow_from_left(&mut self, parent: NodeId, pos: usize, left: NodeId, child: NodeId) {
        let separator_index = pos - 1;
        let mut left_node = self.take(left);

        match (&mut left_node, self.node_mut(child)) {
            (Node::Leaf(l), Node::Leaf(c)) => {
                let last = l.keys.len() - 1;
                c.keys.insert(0, l.keys.remove(last));
                c.values.insert(0, l.values.remove(last));
                let separator = c.keys[0].clone();
                self.internal_mut(parent).keys[separator_index] = separator;
            }
            (Node::Internal(l), Node::Internal(c)) => {
                let last = l.keys.len() - 1;
                let up = l.keys.remove(last);
                c.children.insert(0, l.children.remove(last + 1));
                let down =
                    std::mem::replace(&mut self.internal_mut(parent).keys[separator_index], up);
                self.internal_mut(child).keys.insert(0, down);
            }
            _ => unreachable!("siblings at different depths"),
        }

        self.put(left, left_node);
    }

    fn borrow_from_right(&mut self, parent: NodeId, pos: usize, child: NodeId, right: NodeId) {
        let mut right_node = self.take(right);

        match (&mut right_node, self.node_mut(child)) {
            (Node::Leaf(r), Node::Leaf(c)) => {
                c.keys.push(r.keys.remove(0));
                c.values.push(r.values.remove(0));
                let separator = r.keys[0].clone();
                self.internal_mut(parent).keys[pos] = separator;
            }
            (Node::Internal(r), Node::Internal(c)) => {
                let up = r.keys.remove(0);
                c.children.push(r.children.remove(0));
                let down = std::mem::replace(&mut self.internal_mut(parent).keys[pos], up);
                self.internal_mut(child).keys.push(down);
            }
            _ => unreachable!("siblings at different depths"),
        }

        self.put(right, right_node);
    }

    /// Fold `right` into `left` and drop their separator `parent.keys[separator_index]`
    fn merge(&mut self, parent: NodeId, separator_index: usize, left: NodeId, right: NodeId) {
        let separator = {
            let p = self.internal_mut(parent);
            p.children.remove(separator_index + 1);
            p.keys.remove(separator_index)
        };

        let right_node = self.release(right);
        let mut relink = None;

        match (self.node_mut(left), right_node) {
            (Node::Leaf(l), Node::Leaf(r)) => {
                l.keys.extend(r.keys);
                l.values.extend(r.values);
                l.next = r.next;
                relink = r.next;
            }
            (Node::Internal(l), Node::Internal(r)) => {
                l.keys.push(separator);
                l.keys.extend(r.keys);
                l.children.extend(r.children);
            }
            _ => unreachable!("siblings at different depths"),
        }

        if let Some(next) = relink {
            self.leaf_mut(next).prev = Some(left);
        }
    }

    /// Smallest key, if any
    pub fn first_key(&self) -> Option<&K> {
        self.leaf(self.leftmost_leaf()).keys.first()
    }

    /// Largest key, if any
    pub fn last_key(&self) -> Option<&K> {
        self.leaf(self.rightmost_leaf()).keys.last()
    }

    /// Ascending iteration over all entries through the leaf chain
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.range(..)
    }

    /// Ascending iteration over the entries whose keys fall within `bounds`
    pub fn range<R: RangeBounds<K>>(&self, bounds: R) -> Iter<'_, K, V> {
        let (leaf, index) = match bounds.start_bound() {
            Bound::Included(start) => {
                let id = self.find_leaf(start);
                (id, self.leaf(id).keys.partition_point(|k| k < start))
            }
            Bound::Excluded(start) => {
                let id = self.find_leaf(start);
                (id, self.leaf(id).keys.partition_point(|k| k <= start))
            }
            Bound::Unbounded => (self.leftmost_leaf(), 0),
        };

        Iter {
            tree: self,
            leaf: Some(leaf),
            index,
            end: bounds.end_bound().cloned(),
        }
    }

    /// Descending iteration over all entries through the backward leaf links
    pub fn iter_rev(&self) -> RevIter<'_, K, V> {
        let leaf = self.rightmost_leaf();
        RevIter {
            tree: self,
            leaf: Some(leaf),
            index: self.leaf(leaf).keys.len(),
        }
    }

    // ========== Helper functions ==========

    fn min_keys(&self) -> usize {
        (self.order + 1) / 2 - 1
    }

    fn find_leaf(&self, key: &K) -> NodeId {
        let mut curr = self.root;
        while let Node::Internal(n) = self.node(curr) {
            curr = n.children[child_index(&n.keys, key)];
        }
        curr
    }

    fn leftmost_leaf(&self) -> NodeId {
        let mut curr = self.root;
        while let Node::Internal(n) = self.node(curr) {
            curr = n.children[0];
        }
        curr
    }

    fn rightmost_leaf(&self) -> NodeId {
        let mut curr = self.root;
        while let Node::Internal(n) = self.node(curr) {
            curr = n.children[n.children.len() - 1];
        }
        curr
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node<K, V> {
        let node = self.take(id);
        self.free.push(id);
        node
    }

    /// Detach a node temporarily; must be followed by `put`
    fn take(&mut self, id: NodeId) -> Node<K, V> {
        match self.nodes[id].take() {
            Some(node) => node,
            None => unreachable!("node {} is not live", id),
        }
    }

    fn put(&mut self, id: NodeId, node: Node<K, V>) {
        self.nodes[id] = Some(node);
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        match &self.nodes[id] {
            Some(node) => node,
            None => unreachable!("node {} is not live", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match &mut self.nodes[id] {
            Some(node) => node,
            None => unreachable!("node {} is not live", id),
        }
    }

    fn leaf(&self, id: NodeId) -> &Leaf<K, V> {
        match self.node(id) {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => unreachable!("node {} is not a leaf", id),
        }
    }

    fn leaf_mut(&mut self, id: NodeId) -> &mut Leaf<K, V> {
        match self.node_mut(id) {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => unreachable!("node {} is not a leaf", id),
        }
    }

    fn internal(&self, id: NodeId) -> &Internal<K> {
        match self.node(id) {
            Node::Internal(n) => n,
            Node::Leaf(_) => unreachable!("node {} is not internal", id),
        }
    }

    fn internal_mut(&mut self, id: NodeId) -> &mut Internal<K> {
        match self.node_mut(id) {
            Node::Internal(n) => n,
            Node::Leaf(_) => unreachable!("node {} is not internal", id),
        }
    }
}

/// Child slot for `key`; keys equal to a separator go to the right
fn child_index<K: Ord>(keys: &[K], key: &K) -> usize {
    match keys.binary_search(key) {
        Ok(pos) => pos + 1,
        Err(pos) => pos,
    }
}

/// Ascending iterator following `next` leaf links
pub struct Iter<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    leaf: Option<NodeId>,
    index: usize,
    end: Bound<K>,
}

impl<'a, K: Ord + Clone, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tree = self.tree;
            let leaf = tree.leaf(self.leaf?);

            if self.index < leaf.keys.len() {
                let key = &leaf.keys[self.index];
                let past_end = match &self.end {
                    Bound::Included(end) => key > end,
                    Bound::Excluded(end) => key >= end,
                    Bound::Unbounded => false,
                };
                if past_end {
                    self.leaf = None;
                    return None;
                }

                let value = &leaf.values[self.index];
                self.index += 1;
                return Some((key, value));
            }

            self.leaf = leaf.next;
            self.index = 0;
        }
    }
}

/// Descending iterator following `prev` leaf links
pub struct RevIter<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    leaf: Option<NodeId>,
    /// One past the next entry to yield
    index: usize,
}

impl<'a, K: Ord + Clone, V> Iterator for RevIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tree = self.tree;
            let leaf = tree.leaf(self.leaf?);

            if self.index > 0 {
                self.index -= 1;
                return Some((&leaf.keys[self.index], &leaf.values[self.index]));
            }

            self.leaf = leaf.prev;
            self.index = self.leaf.map_or(0, |id| tree.leaf(id).keys.len());
        }
    }
}
