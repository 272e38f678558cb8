//! The tagged sort key used by nodes and levels.
//!
//! The reference implementation gives every node a `timestamp` plus an
//! `is_tail` flag, then overrides every comparison operator to treat a
//! tail node as `+∞` regardless of its (unused) timestamp. That split
//! representation is the source of the asymmetry bugs the design notes
//! call out: nothing stops a comparison from reading `timestamp` on a
//! tail node by mistake.
//!
//! `NodeKey<K>` folds the flag into the value instead: a node either
//! carries a real key or is the level's tail sentinel, and `Tail` sorts
//! strictly above every `Finite(_)` by construction, not by convention.

use std::cmp::Ordering;

/// A node's sort key: either a real key, or the level's tail sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKey<K> {
    Finite(K),
    Tail,
}

impl<K> NodeKey<K> {
    /// True iff this is the tail sentinel.
    #[must_use]
    pub const fn is_tail(&self) -> bool {
        matches!(self, NodeKey::Tail)
    }

    /// The wrapped key, or `None` for the tail.
    #[must_use]
    pub const fn as_finite(&self) -> Option<&K> {
        match self {
            NodeKey::Finite(k) => Some(k),
            NodeKey::Tail => None,
        }
    }
}

impl<K: Ord> PartialOrd for NodeKey<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for NodeKey<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NodeKey::Tail, NodeKey::Tail) => Ordering::Equal,
            (NodeKey::Tail, NodeKey::Finite(_)) => Ordering::Greater,
            (NodeKey::Finite(_), NodeKey::Tail) => Ordering::Less,
            (NodeKey::Finite(a), NodeKey::Finite(b)) => a.cmp(b),
        }
    }
}
