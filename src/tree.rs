//! Tree (C4): the owning structure that ties levels and the node arena
//! together and exposes `build`/`search`/`insert`/`delete`.
//!
//! `Tree` owns one [`Arena`] and a `Vec<Level>` ordered bottom-up (index 0
//! is level 0). Every public mutator ends by restoring the two invariants
//! the rest of the crate relies on: the top level holds at most one
//! non-tail node, and every interior node's `merkel_hash` is current.

use tracing::{debug, instrument, trace};

use crate::error::{Result, TreeError};
use crate::hash::{self, Encode};
use crate::key::NodeKey;
use crate::level::Level;
use crate::node::{Arena, Idx, Node};

/// One key/value pair to be inserted or bulk-loaded.
#[derive(Debug, Clone)]
pub struct Record<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Record<K, V> {
    #[must_use]
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// A content-addressed probabilistic search tree over `K -> V`.
#[derive(Debug)]
pub struct Tree<K, V> {
    arena: Arena<K, V>,
    levels: Vec<Level>,
}

/// A read-only handle onto one node of a [`Tree`], used by callers (and
/// [`crate::diff::diff`]) that need to walk a tree without owning it.
#[derive(Debug)]
pub struct NodeRef<'a, K, V> {
    tree: &'a Tree<K, V>,
    idx: Idx,
}

impl<'a, K, V> Clone for NodeRef<'a, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, K, V> Copy for NodeRef<'a, K, V> {}

impl<'a, K, V> NodeRef<'a, K, V> {
    fn node(&self) -> &'a Node<K, V> {
        self.tree.arena.get(self.idx)
    }

    /// This node's sort key.
    #[must_use]
    pub fn key(&self) -> &'a NodeKey<K> {
        &self.node().key
    }

    /// Height of this node; 0 is a leaf.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.node().level
    }

    /// The node's merkle hash. Panics if it was never filled, which would
    /// indicate a bug in tree maintenance rather than caller misuse.
    #[must_use]
    pub fn merkel_hash(&self) -> hash::Digest {
        self.node()
            .merkel_hash
            .expect("merkel_hash must be filled for every reachable node")
    }

    /// The value stored at a level-0 node, or `None` above level 0 or at
    /// a tail.
    #[must_use]
    pub fn value(&self) -> Option<&'a V> {
        self.node().value.as_ref()
    }

    /// `true` for the level's tail or any node whose hash classifies as a
    /// boundary. Assumes the flag has already been memoized, which holds
    /// for every node reachable from a tree that was built or maintained
    /// through this module (never read directly off a freshly-allocated,
    /// not-yet-linked node).
    #[must_use]
    pub fn is_boundary(&self) -> bool {
        let node = self.node();
        node.is_tail() || node.boundary.unwrap_or(false)
    }

    #[must_use]
    pub fn down(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().down.map(|idx| NodeRef { tree: self.tree, idx })
    }

    #[must_use]
    pub fn left(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().left.map(|idx| NodeRef { tree: self.tree, idx })
    }

    /// Step down `delta` levels. Panics if `delta` exceeds this node's
    /// height, which would mean the caller miscalculated an alignment.
    #[must_use]
    pub fn lower(mut self, delta: u32) -> Self {
        for _ in 0..delta {
            self = self.down().expect("lower: delta exceeds node height");
        }
        self
    }
}

fn key_gt<K: Ord>(nk: &NodeKey<K>, k: &K) -> bool {
    match nk {
        NodeKey::Tail => true,
        NodeKey::Finite(kk) => kk > k,
    }
}

impl<K: Ord + Clone, V> Tree<K, V> {
    /// Bulk-build a tree from an unsorted set of records. `spec.md` §4.5:
    /// construct level 0 sorted ascending, then repeatedly construct the
    /// next level until the current level holds only the tail plus at
    /// most one other node.
    #[instrument(skip(records), fields(n = records.len()))]
    pub fn build(mut records: Vec<Record<K, V>>) -> Self
    where
        K: Encode,
        V: Encode,
    {
        records.sort_by(|a, b| a.key.cmp(&b.key));
        let mut arena = Arena::new();
        let pairs = records.into_iter().map(|r| (r.key, r.value)).collect();
        let mut level = Level::base(&mut arena, pairs);
        let mut levels = vec![level];

        while level.non_tail_count(&arena) > 1 {
            level = level.next(&mut arena);
            levels.push(level);
        }

        debug!(height = levels.len(), "tree built");
        Self { arena, levels }
    }

    /// Index of the true root: the top tail's left neighbour, or the
    /// top tail itself if the top level has no surviving non-tail node
    /// (only possible for an empty tree or a vanishingly unlucky hash
    /// draw; the tail's own merkel hash still covers the whole tree in
    /// that case, since nothing above it was ever a boundary).
    fn root_idx(&self) -> Idx {
        let tail = self.levels.last().expect("tree always has a level").tail;
        self.arena.get(tail).left.unwrap_or(tail)
    }

    /// The top of the tree.
    #[must_use]
    pub fn root(&self) -> NodeRef<'_, K, V> {
        NodeRef { tree: self, idx: self.root_idx() }
    }

    /// The node `delta` levels below the root, following `down` links.
    #[must_use]
    pub fn root_at_height_below(&self, delta: u32) -> NodeRef<'_, K, V> {
        self.root().lower(delta)
    }

    /// Locate the node carrying `key` at `level`, descending from the
    /// root and stepping left before stepping down. Companion to
    /// [`Self::root_at_height_below`] for fetching a specific column
    /// without re-deriving it from `find_right`.
    #[must_use]
    pub fn node_at_level(&self, key: &K, level: u32) -> Option<NodeRef<'_, K, V>> {
        let mut idx = self.root_idx();
        while self.arena.get(idx).level > level {
            if let Some(left) = self.arena.get(idx).left {
                if key_gt(&self.arena.get(left).key, key) {
                    idx = left;
                }
            }
            idx = self.arena.get(idx).down?;
        }
        while !matches!(&self.arena.get(idx).key, NodeKey::Finite(k) if k == key) {
            idx = self.arena.get(idx).left?;
        }
        Some(NodeRef { tree: self, idx })
    }

    /// Return the level-0 node with the smallest key strictly greater
    /// than `key`, descending from the top tail.
    fn find_right(&self, key: &K) -> Idx {
        let mut node = self.levels.last().expect("tree always has a level").tail;
        while self.arena.get(node).down.is_some() {
            if let Some(left) = self.arena.get(node).left {
                if key_gt(&self.arena.get(left).key, key) {
                    node = left;
                    continue;
                }
            }
            node = self.arena.get(node).down.expect("checked above");
        }
        while let Some(left) = self.arena.get(node).left {
            if key_gt(&self.arena.get(left).key, key) {
                node = left;
            } else {
                break;
            }
        }
        node
    }

    /// Exact-match lookup.
    #[instrument(skip(self, key))]
    pub fn search(&self, key: &K) -> Option<NodeRef<'_, K, V>> {
        let r = self.find_right(key);
        let left = self.arena.get(r).left?;
        match &self.arena.get(left).key {
            NodeKey::Finite(k) if k == key => Some(NodeRef { tree: self, idx: left }),
            _ => None,
        }
    }

    /// Walk up from `node`, filling `merkel_hash` at each step; when the
    /// column runs out (`up` is `None` and the node isn't the tail), jump
    /// to `next_boundary_right(node).up` and continue. Terminates when a
    /// tail's column has been refreshed. `spec.md` §4.5/§4.6.
    fn propagate_merkel(&mut self, mut node: Idx) {
        loop {
            self.arena.fill_merkel(node);
            if let Some(up) = self.arena.get(node).up {
                node = up;
            } else if self.arena.get(node).is_tail() {
                break;
            } else {
                let b = self.arena.next_boundary_right(node);
                node = self.arena.get(b).up.expect("boundary node is always promoted");
            }
        }
    }

    fn add_empty_level(&mut self) {
        let top_tail = self.levels.last().expect("tree always has a level").tail;
        let new_tail = self.arena.promote(top_tail);
        self.levels.push(Level { tail: new_tail });
    }

    /// Splice `new_idx` immediately left of `right_of_new` at whichever
    /// level `right_of_new` lives on, then, if `new_idx` is a boundary,
    /// promote it and recurse one level up to splice the promoted copy
    /// next to the existing boundary column. `spec.md` §4.5 step 3-4.
    fn insert_at_level(&mut self, new_idx: Idx, level_index: usize, right_of_new: Idx) {
        let old_left = self.arena.get(right_of_new).left;
        self.arena.get_mut(right_of_new).left = Some(new_idx);
        self.arena.get_mut(new_idx).right = Some(right_of_new);
        self.arena.get_mut(new_idx).left = old_left;
        if let Some(ol) = old_left {
            self.arena.get_mut(ol).right = Some(new_idx);
        }

        if self.arena.is_boundary_node(new_idx) {
            let higher = self.arena.promote(new_idx);
            let b = self.arena.next_boundary_right(new_idx);
            if level_index == self.levels.len() - 1 {
                self.add_empty_level();
            }
            let b_up = self.arena.get(b).up.expect("boundary node is always promoted");
            self.insert_at_level(higher, level_index + 1, b_up);
        }

        if self
            .levels
            .last()
            .expect("tree always has a level")
            .non_tail_count(&self.arena)
            > 1
        {
            self.add_empty_level();
        }
    }

    /// Insert `record`. `spec.md` §7: rejects a key that already exists
    /// rather than admitting a second, duplicate-keyed node.
    #[instrument(skip(self, record))]
    pub fn insert(&mut self, record: Record<K, V>) -> Result<NodeRef<'_, K, V>>
    where
        K: Encode,
        V: Encode,
    {
        if self.search(&record.key).is_some() {
            return Err(TreeError::DuplicateKey);
        }
        let node_hash = hash::digest(&hash::encode_leaf(&record.key, &record.value));
        let x = self.arena.alloc(Node {
            key: NodeKey::Finite(record.key.clone()),
            value: Some(record.value),
            level: 0,
            node_hash,
            merkel_hash: Some(node_hash),
            boundary: None,
            up: None,
            down: None,
            left: None,
            right: None,
        });
        let r = self.find_right(&record.key);
        self.insert_at_level(x, 0, r);

        let b0 = self.arena.next_boundary_right(x);
        let start = self.arena.get(b0).up.expect("boundary node is always promoted");
        self.propagate_merkel(start);
        trace!(height = self.levels.len(), "inserted");

        debug_assert!(match self.validate_top_level() {
            Ok(()) => true,
            Err(err) => panic!("{err}"),
        });

        Ok(NodeRef { tree: self, idx: x })
    }

    /// Remove `key`, unlinking its whole up-column and collapsing any
    /// levels left holding only a tail. `spec.md` §4.6.
    #[instrument(skip(self, key))]
    pub fn delete(&mut self, key: &K) -> Result<Record<K, V>> {
        let x = self.search(key).map(|r| r.idx).ok_or(TreeError::KeyNotFound)?;
        let b0 = self.arena.next_boundary_right(x);

        let mut node = Some(x);
        let mut removed_value = None;
        while let Some(idx) = node {
            let left = self.arena.get(idx).left;
            let right = self
                .arena
                .get(idx)
                .right
                .expect("non-tail node always has a right neighbour");
            self.arena.get_mut(right).left = left;
            if let Some(l) = left {
                self.arena.get_mut(l).right = Some(right);
            }
            let up = self.arena.get(idx).up;
            let freed = self.arena.free(idx);
            if idx == x {
                removed_value = freed.value;
            }
            node = up;
        }

        // A level only earns its place above the one below it when that
        // lower level holds more than one non-tail node (mirrors `build`'s
        // own stop rule at `Tree::build`). Deletion can knock a lower
        // level down to <= 1 without touching the level above it, which
        // makes that upper level redundant; strip every such level from
        // the top down.
        let mut levels_to_remove = Vec::new();
        for i in (1..self.levels.len()).rev() {
            if self.levels[i - 1].non_tail_count(&self.arena) <= 1 {
                levels_to_remove.push(i);
            }
        }
        for i in levels_to_remove {
            self.levels.remove(i);
        }

        let b_up = self.arena.get(b0).up.expect("boundary node is always promoted");
        self.propagate_merkel(b_up);
        debug!(height = self.levels.len(), "deleted");

        debug_assert!(match self.validate_top_level() {
            Ok(()) => true,
            Err(err) => panic!("{err}"),
        });

        Ok(Record {
            key: key.clone(),
            value: removed_value.expect("level-0 node always carries a value"),
        })
    }

    /// Verify invariant 4 (`spec.md` §3): the top level holds the tail
    /// plus at most one other node. Only evaluated from `debug_assert!`
    /// sites in `insert`/`delete`; a violation here is a bug in level
    /// maintenance, never a caller error.
    fn validate_top_level(&self) -> Result<()> {
        let top = self.levels.last().expect("tree always has a level");
        let count = top.non_tail_count(&self.arena);
        if count > 1 {
            return Err(TreeError::InvariantViolated(format!(
                "top level holds {count} non-tail nodes, expected at most 1"
            )));
        }
        Ok(())
    }
}
