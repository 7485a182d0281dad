use std::collections::BTreeMap;

use crate::ancestry::{Ancestry, MutationLocation};
use crate::error::{Result, SimError};
use crate::types::NodeId;

use super::traversal::propagate;

/// A causal mutation resolved against the ancestry, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct CausalSite {
    pub mutation_id: usize,
    pub site: usize,
    /// Genomic position of the mutation's site.
    pub position: f64,
    /// Tree holding the mutation.
    pub tree_index: usize,
    /// Node the mutation sits above.
    pub node: NodeId,
    /// Effect size.
    pub beta: f64,
}

/// Output of [`genetic_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneticValues {
    /// Genetic value of each individual (sum over its two genome copies).
    pub values: Vec<f64>,
    /// Accumulated value of each sample node, two per individual in
    /// individual order.
    pub sample_values: Vec<f64>,
    /// The causal mutations in input order.
    pub sites: Vec<CausalSite>,
}

impl GeneticValues {
    /// Genomic position of each causal mutation.
    pub fn locations(&self) -> Vec<f64> {
        self.sites.iter().map(|s| s.position).collect()
    }

    /// Node carrying each causal mutation.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.sites.iter().map(|s| s.node).collect()
    }
}

/// Compute per-individual genetic values from causal mutations.
///
/// Mutations are grouped by the tree that holds them. For each such tree a
/// zero-initialised node array receives the effect sizes of its mutations
/// (effects on the same node add), values are pushed down to the leaves with
/// [`propagate`], and every sample node's total is credited to its owner.
/// No randomness is involved: identical inputs give identical outputs.
///
/// # Errors
/// Returns a validation error if the ancestry has no mutations, and a
/// dimension/data error if `mutation_ids` and `betas` differ in length or an
/// ID cannot be resolved.
pub fn genetic_value<A: Ancestry + ?Sized>(
    ancestry: &A,
    mutation_ids: &[usize],
    betas: &[f64],
) -> Result<GeneticValues> {
    if ancestry.num_mutations() == 0 {
        return Err(SimError::validation("No mutation in the provided data"));
    }
    if mutation_ids.len() != betas.len() {
        return Err(SimError::DimensionMismatch {
            expected: mutation_ids.len(),
            got: betas.len(),
            context: "effect sizes vs causal mutation IDs".into(),
        });
    }

    let mut sites = Vec::with_capacity(mutation_ids.len());
    let mut by_tree: BTreeMap<usize, Vec<(NodeId, f64)>> = BTreeMap::new();
    for (&mutation_id, &beta) in mutation_ids.iter().zip(betas) {
        let MutationLocation {
            site,
            position,
            tree_index,
            node,
        } = ancestry.mutation_location(mutation_id).ok_or_else(|| {
            SimError::Data(format!(
                "Mutation {} cannot be located (num_mutations = {})",
                mutation_id,
                ancestry.num_mutations()
            ))
        })?;
        by_tree.entry(tree_index).or_default().push((node, beta));
        sites.push(CausalSite {
            mutation_id,
            site,
            position,
            tree_index,
            node,
            beta,
        });
    }

    let num_individuals = ancestry.num_individuals();
    let samples: Vec<NodeId> = (0..num_individuals)
        .flat_map(|i| ancestry.individual_nodes(i))
        .collect();
    let mut sample_values = vec![0.0; samples.len()];

    let mut node_values = vec![0.0; ancestry.num_nodes()];
    for (&tree_index, effects) in &by_tree {
        let tree = ancestry.tree(tree_index);
        node_values.iter_mut().for_each(|v| *v = 0.0);
        for &(node, beta) in effects {
            node_values[node as usize] += beta;
        }
        propagate(
            tree.root(),
            tree.left_child(),
            tree.right_sib(),
            &mut node_values,
        );
        for (total, &sample) in sample_values.iter_mut().zip(&samples) {
            *total += node_values[sample as usize];
        }
        log::debug!(
            "Tree {}: propagated {} causal effects",
            tree_index,
            effects.len()
        );
    }

    let values: Vec<f64> = sample_values
        .chunks_exact(2)
        .map(|pair| pair[0] + pair[1])
        .collect();

    Ok(GeneticValues {
        values,
        sample_values,
        sites,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ancestry::{Mutation, Site, TreeSequence, TreeTopology};

    /// Comb tree over `n` leaves with one mutation above each of the first
    /// `num_mut` nodes (mutation `j` on node `j`).
    fn comb_with_mutations(n: usize, num_mut: usize) -> TreeSequence {
        let tree = TreeTopology::comb(n, 20.0).unwrap();
        let samples: Vec<NodeId> = (0..n as NodeId).collect();
        let sites = (0..num_mut).map(|j| Site { position: j as f64 }).collect();
        let mutations = (0..num_mut)
            .map(|j| Mutation {
                site: j,
                node: j as NodeId,
            })
            .collect();
        TreeSequence::single_tree(tree, &samples, sites, mutations).unwrap()
    }

    #[test]
    fn test_comb_weighted_mutations() {
        let ts = comb_with_mutations(6, 10);
        let ids: Vec<usize> = (0..10).collect();
        let betas: Vec<f64> = (0..10).map(|j| j as f64).collect();
        let gv = genetic_value(&ts, &ids, &betas).unwrap();

        assert_eq!(gv.sample_values, vec![0.0, 10.0, 19.0, 27.0, 34.0, 35.0]);
        assert_eq!(gv.values, vec![10.0, 46.0, 69.0]);
    }

    #[test]
    fn test_same_node_effects_add() {
        let tree = TreeTopology::comb(2, 10.0).unwrap();
        let ts = TreeSequence::single_tree(
            tree,
            &[0, 1],
            vec![Site { position: 1.0 }, Site { position: 2.0 }],
            vec![Mutation { site: 0, node: 0 }, Mutation { site: 1, node: 0 }],
        )
        .unwrap();
        let gv = genetic_value(&ts, &[0, 1], &[1.5, 2.0]).unwrap();
        assert_eq!(gv.sample_values, vec![3.5, 0.0]);
        assert_eq!(gv.values, vec![3.5]);
    }

    #[test]
    fn test_reports_locations_and_nodes() {
        let ts = comb_with_mutations(4, 6);
        let gv = genetic_value(&ts, &[5, 2], &[1.0, -1.0]).unwrap();
        assert_eq!(gv.locations(), vec![5.0, 2.0]);
        assert_eq!(gv.nodes(), vec![5, 2]);
        assert!(gv.sites.iter().all(|s| s.tree_index == 0));
    }

    #[test]
    fn test_no_causal_gives_zero_values() {
        let ts = comb_with_mutations(4, 3);
        let gv = genetic_value(&ts, &[], &[]).unwrap();
        assert_eq!(gv.values, vec![0.0, 0.0]);
        assert!(gv.sites.is_empty());
    }

    #[test]
    fn test_no_mutations_rejected() {
        let ts = comb_with_mutations(4, 0);
        let err = genetic_value(&ts, &[], &[]).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "No mutation in the provided data");
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let ts = comb_with_mutations(4, 3);
        let err = genetic_value(&ts, &[0, 1], &[1.0]).unwrap_err();
        assert!(matches!(err, SimError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_unknown_mutation_rejected() {
        let ts = comb_with_mutations(4, 3);
        let err = genetic_value(&ts, &[3], &[1.0]).unwrap_err();
        assert!(matches!(err, SimError::Data(_)));
    }
}
