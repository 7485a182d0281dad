//! Genealogical ancestry: tree arenas, the in-memory tree sequence, and the
//! [`Ancestry`] trait through which the simulators read them.

mod sequence;
mod tree;

pub use sequence::{Mutation, Site, TreeSequence};
pub use tree::{Children, TreeTopology};

use crate::types::NodeId;

/// Where a mutation sits: its site, genomic position, the tree covering that
/// position, and the node the mutation is above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationLocation {
    pub site: usize,
    pub position: f64,
    pub tree_index: usize,
    pub node: NodeId,
}

/// Read-only view of ancestry data supplied by an external simulator.
///
/// Implementors must guarantee that every tree shares the same node arena of
/// size [`Ancestry::num_nodes`] and that every individual owns two sample
/// nodes inside that arena.
pub trait Ancestry {
    /// Size of the node arena shared by all trees.
    fn num_nodes(&self) -> usize;

    /// Number of trees along the sequence.
    fn num_trees(&self) -> usize;

    /// Tree at `index`.
    ///
    /// # Panics
    /// May panic if `index >= num_trees()`.
    fn tree(&self, index: usize) -> &TreeTopology;

    /// Total number of mutations.
    fn num_mutations(&self) -> usize;

    /// Resolve a mutation to its tree and node, or `None` if the ID is out of
    /// range.
    fn mutation_location(&self, mutation_id: usize) -> Option<MutationLocation>;

    /// Number of diploid individuals.
    fn num_individuals(&self) -> usize;

    /// The two sample nodes owned by `individual`.
    fn individual_nodes(&self, individual: usize) -> [NodeId; 2];
}
