//! Anti-entropy diff (C5): find every key the remote tree has that the
//! local tree doesn't, without transferring more than the differing
//! columns. `spec.md` §4.7.
//!
//! The comparison is asymmetric by design: a key present locally but
//! missing on the remote is never reported, since the caller's interest
//! is "what do I need to fetch."

use tracing::{instrument, trace};

use crate::key::NodeKey;
use crate::tree::NodeRef;

/// Bucket members of `node`, one level down, left-to-right. Empty if
/// `node` is already at level 0. Mirrors [`crate::node::Arena::bucket_of`]
/// but reads the already-memoized boundary flag instead of requiring
/// `&mut` access, since diff only ever walks trees it doesn't own.
fn bucket_children<'a, K, V>(node: NodeRef<'a, K, V>) -> Vec<NodeRef<'a, K, V>> {
    let Some(down) = node.down() else {
        return Vec::new();
    };
    let mut members = vec![down];
    let mut cur = down;
    while let Some(left) = cur.left() {
        if left.is_boundary() {
            break;
        }
        members.push(left);
        cur = left;
    }
    members.reverse();
    members
}

/// Descend `node` to level 0 along its leftmost bucket-expansion and
/// collect every key it heads. Used when the local side has nothing left
/// to compare against, so the whole remote subtree is missing.
fn collect_all_keys_below<K: Clone, V>(node: NodeRef<'_, K, V>, out: &mut Vec<K>) {
    if node.level() == 0 {
        if let NodeKey::Finite(k) = node.key() {
            out.push(k.clone());
        }
        return;
    }
    for child in bucket_children(node) {
        collect_all_keys_below(child, out);
    }
}

/// One level's rightmost-first sweep. Compares the two candidate lists
/// (each already left-to-right) pointer by pointer from the right,
/// marking nodes whose merkle hashes disagree (or whose key is
/// remote-only) for descent, and recording remote-only level-0 keys as
/// missing along the way.
fn sweep_level<'l, 'r, K: Ord + Clone, V>(
    local_list: &[NodeRef<'l, K, V>],
    remote_list: &[NodeRef<'r, K, V>],
    missing: &mut Vec<K>,
) -> (Vec<NodeRef<'l, K, V>>, Vec<NodeRef<'r, K, V>>) {
    let mut marked_local = Vec::new();
    let mut marked_remote = Vec::new();
    let mut li = local_list.len();
    let mut ri = remote_list.len();

    while li > 0 && ri > 0 {
        let l = local_list[li - 1];
        let r = remote_list[ri - 1];
        match l.key().cmp(r.key()) {
            std::cmp::Ordering::Equal => {
                if l.merkel_hash() != r.merkel_hash() {
                    marked_local.push(l);
                    marked_remote.push(r);
                }
                li -= 1;
                ri -= 1;
            }
            std::cmp::Ordering::Less => {
                if r.level() == 0 {
                    if let NodeKey::Finite(k) = r.key() {
                        missing.push(k.clone());
                    }
                }
                marked_remote.push(r);
                ri -= 1;
            }
            std::cmp::Ordering::Greater => {
                li -= 1;
            }
        }
    }

    marked_local.reverse();
    marked_remote.reverse();
    (marked_local, marked_remote)
}

/// Compute the keys present in `remote` but missing (or differently
/// valued) in `local`. Both roots are height-aligned first, then the
/// comparison descends level by level, only expanding columns whose
/// merkle hashes disagree — `O(differences * height)` node visits rather
/// than a full tree walk.
#[instrument(skip(local, remote))]
pub fn diff<'l, 'r, K, V>(local: NodeRef<'l, K, V>, remote: NodeRef<'r, K, V>) -> Vec<K>
where
    K: Ord + Clone,
{
    let (local, remote) = match local.level().cmp(&remote.level()) {
        std::cmp::Ordering::Greater => (local.lower(local.level() - remote.level()), remote),
        std::cmp::Ordering::Less => (local, remote.lower(remote.level() - local.level())),
        std::cmp::Ordering::Equal => (local, remote),
    };

    let mut missing = Vec::new();
    let mut local_list = vec![local];
    let mut remote_list = vec![remote];
    let mut level: i64 = local.level().into();

    loop {
        if level < 0 {
            break;
        }
        let (marked_local, marked_remote) = sweep_level(&local_list, &remote_list, &mut missing);

        if marked_local.is_empty() && marked_remote.is_empty() {
            break;
        }
        if marked_local.is_empty() {
            for node in marked_remote {
                collect_all_keys_below(node, &mut missing);
            }
            break;
        }

        local_list = marked_local.iter().flat_map(|&n| bucket_children(n)).collect();
        remote_list = marked_remote.iter().flat_map(|&n| bucket_children(n)).collect();
        trace!(level, local_width = local_list.len(), remote_width = remote_list.len());
        level -= 1;
    }

    missing
}
