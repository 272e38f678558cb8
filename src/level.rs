//! Level (C3): one height of the tree, as a doubly-linked chain ordered
//! by key ascending and terminated by a tail sentinel.

use crate::key::NodeKey;
use crate::node::{Arena, Idx, Node};

/// One height of the tree. Only stores the tail; the rest of the chain
/// is reached by walking `left` from it.
#[derive(Debug, Clone, Copy)]
pub struct Level {
    pub tail: Idx,
}

impl Level {
    /// Materialize the level's keys left-to-right. `O(width)`; intended
    /// for tests and debug rendering, matching the original's
    /// `Level.to_list`/`__repr__`.
    pub fn keys<'a, K, V>(&self, arena: &'a Arena<K, V>) -> Vec<&'a NodeKey<K>> {
        let mut out = Vec::new();
        let mut node = Some(self.tail);
        while let Some(idx) = node {
            out.push(&arena.get(idx).key);
            node = arena.get(idx).left;
        }
        out.reverse();
        out
    }

    /// Count of non-tail nodes at this level (`width - 1`). Drives the
    /// "holds only the tail plus at most one other node" stopping rule
    /// for both bulk build and incremental insert.
    pub fn non_tail_count<K, V>(&self, arena: &Arena<K, V>) -> usize {
        self.keys(arena).len() - 1
    }

    /// Link a left-to-right slice of freshly allocated indices into a
    /// doubly-linked chain and return the tail.
    fn link<K, V>(arena: &mut Arena<K, V>, indices: &[Idx]) -> Idx {
        for pair in indices.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            arena.get_mut(left).right = Some(right);
            arena.get_mut(right).left = Some(left);
        }
        *indices.last().expect("level must have at least a tail")
    }

    /// Build level 0 from records already sorted ascending by key.
    pub fn base<K: Clone, V>(arena: &mut Arena<K, V>, records: Vec<(K, V)>) -> Self
    where
        K: crate::hash::Encode,
        V: crate::hash::Encode,
    {
        let mut indices: Vec<Idx> = records
            .into_iter()
            .map(|(key, value)| {
                let node_hash = crate::hash::digest(crate::hash::encode_leaf(&key, &value).as_slice());
                arena.alloc(Node {
                    key: NodeKey::Finite(key),
                    value: Some(value),
                    level: 0,
                    node_hash,
                    merkel_hash: Some(node_hash),
                    boundary: None,
                    up: None,
                    down: None,
                    left: None,
                    right: None,
                })
            })
            .collect();

        let tail_node_hash = crate::hash::digest(b"prolly:tail:0");
        let tail_idx = arena.alloc(Node {
            key: NodeKey::Tail,
            value: None,
            level: 0,
            node_hash: tail_node_hash,
            merkel_hash: Some(tail_node_hash),
            boundary: Some(true),
            up: None,
            down: None,
            left: None,
            right: None,
        });
        indices.push(tail_idx);

        let tail = Self::link(arena, &indices);
        // Ensure boundary status is memoized for every level-0 node so
        // that interior bucket walks (Arena::bucket_of) never need to
        // compute it lazily mid-walk.
        for &idx in &indices {
            arena.is_boundary_node(idx);
        }
        Level { tail }
    }

    /// Build the next level up by promoting every boundary node of
    /// `self` (always including the tail, which is always a boundary).
    pub fn next<K: Clone, V>(&self, arena: &mut Arena<K, V>) -> Self {
        let below: Vec<Idx> = {
            let mut nodes = Vec::new();
            let mut node = Some(self.tail);
            while let Some(idx) = node {
                nodes.push(idx);
                node = arena.get(idx).left;
            }
            nodes.reverse();
            nodes
        };

        let promoted: Vec<Idx> = below
            .into_iter()
            .filter(|&idx| arena.is_boundary_node(idx))
            .map(|idx| arena.promote(idx))
            .collect();

        let tail = Self::link(arena, &promoted);
        for &idx in &promoted {
            arena.fill_merkel(idx);
            arena.is_boundary_node(idx);
        }
        Level { tail }
    }
}
