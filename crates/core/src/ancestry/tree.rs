use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::types::{NodeId, NULL_NODE};

/// One genealogical tree, valid over the genomic interval `[left, right)`.
///
/// The shape is stored as a "virtual tree" over flat arrays indexed by node
/// ID: `left_child[n]` is the first child of `n` and `right_sib[n]` the next
/// sibling of `n`, both [`NULL_NODE`] when absent. Nodes that do not take part
/// in this tree simply have no links and are never reached from `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeTopology {
    /// Left coordinate of the interval (inclusive).
    pub left: f64,
    /// Right coordinate of the interval (exclusive).
    pub right: f64,
    /// Root node ID.
    root: NodeId,
    /// First child of each node.
    left_child: Vec<NodeId>,
    /// Next sibling of each node.
    right_sib: Vec<NodeId>,
}

impl TreeTopology {
    /// Build a tree from raw link arrays.
    ///
    /// # Errors
    /// Returns [`SimError::Topology`] if the arrays have different lengths, a
    /// link points outside the arena, or the walk from `root` reaches a node
    /// twice.
    pub fn new(
        left: f64,
        right: f64,
        root: NodeId,
        left_child: Vec<NodeId>,
        right_sib: Vec<NodeId>,
    ) -> Result<Self> {
        let tree = Self {
            left,
            right,
            root,
            left_child,
            right_sib,
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Build a tree from a parent array (`parent[n]` is [`NULL_NODE`] for roots
    /// and for nodes absent from the tree).
    ///
    /// Children are linked in ascending node order. The root is the single
    /// parentless node that has children.
    ///
    /// # Errors
    /// Returns [`SimError::Topology`] if a parent index is out of range or the
    /// number of roots is not exactly one.
    pub fn from_parents(left: f64, right: f64, parent: &[NodeId]) -> Result<Self> {
        let n = parent.len();
        let mut left_child = vec![NULL_NODE; n];
        let mut right_sib = vec![NULL_NODE; n];
        let mut last_child = vec![NULL_NODE; n];

        for (child, &p) in parent.iter().enumerate() {
            if p == NULL_NODE {
                continue;
            }
            if p < 0 || p as usize >= n {
                return Err(SimError::Topology(format!(
                    "Parent {} of node {} is out of range (num_nodes = {})",
                    p, child, n
                )));
            }
            let pu = p as usize;
            let child = child as NodeId;
            if last_child[pu] == NULL_NODE {
                left_child[pu] = child;
            } else {
                right_sib[last_child[pu] as usize] = child;
            }
            last_child[pu] = child;
        }

        let roots: Vec<usize> = (0..n)
            .filter(|&u| parent[u] == NULL_NODE && left_child[u] != NULL_NODE)
            .collect();
        if roots.len() != 1 {
            return Err(SimError::Topology(format!(
                "Expected exactly one root, found {}",
                roots.len()
            )));
        }

        Self::new(left, right, roots[0] as NodeId, left_child, right_sib)
    }

    /// Caterpillar ("comb") tree over `n` leaves spanning `[0, span)`.
    ///
    /// Leaves are `0..n`. Internal node `n` joins leaves `n-2` and `n-1`, and
    /// each following internal node joins the next leaf to the previous
    /// internal node, ending at root `2n-2`.
    ///
    /// # Errors
    /// Returns [`SimError::Topology`] if `n < 2`.
    pub fn comb(n: usize, span: f64) -> Result<Self> {
        if n < 2 {
            return Err(SimError::Topology(
                "A comb tree needs at least two leaves".into(),
            ));
        }
        let num_nodes = 2 * n - 1;
        let mut parent = vec![NULL_NODE; num_nodes];
        parent[n - 2] = n as NodeId;
        parent[n - 1] = n as NodeId;
        for k in 1..(n - 1) {
            let internal = (n + k) as NodeId;
            parent[n - 2 - k] = internal;
            parent[n + k - 1] = internal;
        }
        Self::from_parents(0.0, span, &parent)
    }

    /// Root node ID.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Left-child link array.
    pub fn left_child(&self) -> &[NodeId] {
        &self.left_child
    }

    /// Right-sibling link array.
    pub fn right_sib(&self) -> &[NodeId] {
        &self.right_sib
    }

    /// Size of the node arena.
    pub fn num_nodes(&self) -> usize {
        self.left_child.len()
    }

    /// Length of the genomic interval covered by this tree.
    pub fn span(&self) -> f64 {
        self.right - self.left
    }

    /// Whether `position` falls in `[left, right)`.
    pub fn contains(&self, position: f64) -> bool {
        self.left <= position && position < self.right
    }

    /// Whether `node` has no children.
    ///
    /// # Panics
    /// Panics if `node` is not a valid arena index.
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.left_child[node as usize] == NULL_NODE
    }

    /// Iterate over the children of `node`, following the sibling chain.
    pub fn children(&self, node: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.left_child[node as usize],
        }
    }

    /// Leaves reachable from the root, in depth-first order.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if self.is_leaf(node) {
                leaves.push(node);
            } else {
                stack.extend(self.children(node));
            }
        }
        leaves
    }

    /// Check structural integrity of the arena.
    ///
    /// # Errors
    /// Returns [`SimError::Topology`] describing the first defect found.
    pub fn validate(&self) -> Result<()> {
        let n = self.left_child.len();
        if self.right_sib.len() != n {
            return Err(SimError::Topology(format!(
                "left_child has {} entries but right_sib has {}",
                n,
                self.right_sib.len()
            )));
        }
        if !(self.left < self.right) {
            return Err(SimError::Topology(format!(
                "Empty interval [{}, {})",
                self.left, self.right
            )));
        }

        let in_range = |id: NodeId| id >= 0 && (id as usize) < n;
        if !in_range(self.root) {
            return Err(SimError::Topology(format!(
                "Root {} is outside the node arena (num_nodes = {})",
                self.root, n
            )));
        }
        for (links, name) in [(&self.left_child, "left_child"), (&self.right_sib, "right_sib")] {
            if let Some((node, &bad)) = links
                .iter()
                .enumerate()
                .find(|&(_, &id)| id != NULL_NODE && !in_range(id))
            {
                return Err(SimError::Topology(format!(
                    "{}[{}] = {} is outside the node arena",
                    name, node, bad
                )));
            }
        }

        let mut visited = vec![false; n];
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            let u = node as usize;
            if visited[u] {
                return Err(SimError::Topology(format!(
                    "Node {} is reachable along more than one path",
                    node
                )));
            }
            visited[u] = true;
            // A sibling chain longer than the arena must loop.
            let mut n_children = 0;
            for child in self.children(node) {
                n_children += 1;
                if n_children > n {
                    return Err(SimError::Topology(format!(
                        "Sibling chain below node {} does not terminate",
                        node
                    )));
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    tree: &'a TreeTopology,
    next: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.next == NULL_NODE {
            return None;
        }
        let current = self.next;
        self.next = self.tree.right_sib[current as usize];
        Some(current)
    }
}
