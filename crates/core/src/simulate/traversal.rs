//! Push-down accumulation of node values over a tree arena.
//!
//! Given a tree's topology triple `(root, left_child, right_sib)` and a
//! per-node "local" value, every leaf ends up holding the sum of its own
//! local value and those of all its ancestors up to the root. The walk is an
//! iterative depth-first traversal over an explicit stack of node indices, so
//! deep or unbalanced trees never grow the call stack.
//!
//! Floating-point sums are accumulated root-to-leaf along each path. Results
//! may differ in the last bits from an evaluation that adds the same terms in
//! another order.

use crate::types::{NodeId, NULL_NODE};

/// Propagate node values from `root` down to every reachable leaf, in place.
///
/// After the call, `node_values[leaf]` is the sum of the local values on the
/// path from `root` to `leaf`, both ends included. Entries of internal nodes
/// are overwritten during the walk and must not be relied upon. Nodes not
/// reachable from `root` are left untouched.
///
/// # Panics
/// Panics if a reachable node (or a link followed from one) indexes outside
/// `left_child`, `right_sib` or `node_values`. Callers pass topologies that
/// passed [`TreeTopology::validate`](crate::ancestry::TreeTopology::validate).
pub fn propagate(
    root: NodeId,
    left_child: &[NodeId],
    right_sib: &[NodeId],
    node_values: &mut [f64],
) {
    if root == NULL_NODE {
        return;
    }
    let mut stack: Vec<NodeId> = vec![root];
    while let Some(node) = stack.pop() {
        let parent_value = node_values[node as usize];
        let mut child = left_child[node as usize];
        while child != NULL_NODE {
            node_values[child as usize] += parent_value;
            stack.push(child);
            child = right_sib[child as usize];
        }
    }
}

/// Sum over all nodes reachable from `root` of `local_values[node]` times
/// the number of leaves below `node` (a leaf counts itself once).
///
/// This equals the sum of the leaf totals produced by [`propagate`].
pub fn subtree_weighted_total(
    root: NodeId,
    left_child: &[NodeId],
    right_sib: &[NodeId],
    local_values: &[f64],
) -> f64 {
    if root == NULL_NODE {
        return 0.0;
    }
    // Post-order leaf counts without recursion: record a pre-order, then walk
    // it backwards so children are finished before their parents.
    let n = left_child.len();
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        order.push(node);
        let mut child = left_child[node as usize];
        while child != NULL_NODE {
            stack.push(child);
            child = right_sib[child as usize];
        }
    }

    let mut leaf_count = vec![0usize; n];
    let mut total = 0.0;
    for &node in order.iter().rev() {
        let u = node as usize;
        if left_child[u] == NULL_NODE {
            leaf_count[u] = 1;
        } else {
            let mut child = left_child[u];
            while child != NULL_NODE {
                leaf_count[u] += leaf_count[child as usize];
                child = right_sib[child as usize];
            }
        }
        total += local_values[u] * leaf_count[u] as f64;
    }
    total
}
