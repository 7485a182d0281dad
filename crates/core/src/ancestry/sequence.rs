use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::tree::TreeTopology;
use super::{Ancestry, MutationLocation};
use crate::error::{Result, SimError};
use crate::types::NodeId;

/// A site: a genomic position that carries one or more mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub position: f64,
}

/// A mutation sitting above `node` at site `site`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub site: usize,
    pub node: NodeId,
}

/// In-memory tree sequence: an ordered run of trees over disjoint, adjacent
/// intervals that share one node arena and one sample set.
///
/// Each individual owns exactly two sample nodes (one per genome copy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSequence {
    sequence_length: f64,
    num_nodes: usize,
    trees: Vec<TreeTopology>,
    #[serde(default)]
    sites: Vec<Site>,
    #[serde(default)]
    mutations: Vec<Mutation>,
    individuals: Vec<[NodeId; 2]>,
}

impl TreeSequence {
    /// Assemble and validate a tree sequence.
    ///
    /// # Errors
    /// Returns [`SimError::Topology`] if any tree is malformed or the trees do
    /// not tile `[0, sequence_length)`, and [`SimError::Data`] if a site,
    /// mutation or individual refers to something that does not exist.
    pub fn new(
        trees: Vec<TreeTopology>,
        sites: Vec<Site>,
        mutations: Vec<Mutation>,
        individuals: Vec<[NodeId; 2]>,
    ) -> Result<Self> {
        let sequence_length = trees.last().map(|t| t.right).unwrap_or(0.0);
        let num_nodes = trees.first().map(|t| t.num_nodes()).unwrap_or(0);
        let ts = Self {
            sequence_length,
            num_nodes,
            trees,
            sites,
            mutations,
            individuals,
        };
        ts.validate()?;
        Ok(ts)
    }

    /// Tree sequence made of a single tree whose samples are paired into
    /// individuals in order: `(s0, s1)`, `(s2, s3)`, ...
    ///
    /// # Errors
    /// Returns an error if the number of samples is odd or validation fails.
    pub fn single_tree(
        tree: TreeTopology,
        samples: &[NodeId],
        sites: Vec<Site>,
        mutations: Vec<Mutation>,
    ) -> Result<Self> {
        let individuals = pair_samples(samples)?;
        Self::new(vec![tree], sites, mutations, individuals)
    }

    /// Load a tree sequence from a JSON file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// decoded structure fails [`TreeSequence::validate`].
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Decode a tree sequence from a JSON string and validate it.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let ts: TreeSequence = serde_json::from_str(text)?;
        ts.validate()?;
        Ok(ts)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn sequence_length(&self) -> f64 {
        self.sequence_length
    }

    pub fn trees(&self) -> &[TreeTopology] {
        &self.trees
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn individuals(&self) -> &[[NodeId; 2]] {
        &self.individuals
    }

    /// All sample nodes, two per individual, in individual order.
    pub fn samples(&self) -> Vec<NodeId> {
        self.individuals.iter().flatten().copied().collect()
    }

    /// Index of the tree whose interval contains `position`.
    pub fn tree_index_at(&self, position: f64) -> Option<usize> {
        if !(0.0..self.sequence_length).contains(&position) {
            return None;
        }
        // Trees tile the sequence, so the first tree ending after `position`
        // is the one containing it.
        let idx = self.trees.partition_point(|t| t.right <= position);
        (idx < self.trees.len()).then_some(idx)
    }

    /// Check that the trees tile the sequence and that every reference
    /// resolves.
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(SimError::Topology("Tree sequence has no trees".into()));
        }

        let mut expected_left = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()?;
            if tree.num_nodes() != self.num_nodes {
                return Err(SimError::DimensionMismatch {
                    expected: self.num_nodes,
                    got: tree.num_nodes(),
                    context: format!("node arena of tree {}", i),
                });
            }
            if tree.left != expected_left {
                return Err(SimError::Topology(format!(
                    "Tree {} starts at {} but the previous tree ends at {}",
                    i, tree.left, expected_left
                )));
            }
            expected_left = tree.right;
        }
        if expected_left != self.sequence_length {
            return Err(SimError::Topology(format!(
                "Trees end at {} but the sequence length is {}",
                expected_left, self.sequence_length
            )));
        }

        for (i, site) in self.sites.iter().enumerate() {
            if !(0.0..self.sequence_length).contains(&site.position) {
                return Err(SimError::Data(format!(
                    "Site {} at position {} is outside [0, {})",
                    i, site.position, self.sequence_length
                )));
            }
        }

        let node_ok = |node: NodeId| node >= 0 && (node as usize) < self.num_nodes;
        for (i, m) in self.mutations.iter().enumerate() {
            if m.site >= self.sites.len() {
                return Err(SimError::Data(format!(
                    "Mutation {} refers to missing site {}",
                    i, m.site
                )));
            }
            if !node_ok(m.node) {
                return Err(SimError::Data(format!(
                    "Mutation {} refers to missing node {}",
                    i, m.node
                )));
            }
        }

        for (i, nodes) in self.individuals.iter().enumerate() {
            if let Some(&bad) = nodes.iter().find(|&&n| !node_ok(n)) {
                return Err(SimError::Data(format!(
                    "Individual {} refers to missing node {}",
                    i, bad
                )));
            }
        }

        // Each sample node belongs to one individual and is a leaf of every tree.
        let mut owner: HashMap<NodeId, usize> = HashMap::new();
        for (i, nodes) in self.individuals.iter().enumerate() {
            for &node in nodes {
                if let Some(prev) = owner.insert(node, i) {
                    return Err(SimError::Data(format!(
                        "Sample node {} is claimed by individuals {} and {}",
                        node, prev, i
                    )));
                }
            }
        }
        let samples = self.samples();
        for (t, tree) in self.trees.iter().enumerate() {
            let leaves: HashSet<NodeId> = tree.leaves().into_iter().collect();
            if let Some(&node) = samples.iter().find(|n| !leaves.contains(n)) {
                return Err(SimError::Data(format!(
                    "Sample node {} of individual {} is not a leaf of tree {}",
                    node, owner[&node], t
                )));
            }
        }

        Ok(())
    }
}

impl Ancestry for TreeSequence {
    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn tree(&self, index: usize) -> &TreeTopology {
        &self.trees[index]
    }

    fn num_mutations(&self) -> usize {
        self.mutations.len()
    }

    fn mutation_location(&self, mutation_id: usize) -> Option<MutationLocation> {
        let mutation = self.mutations.get(mutation_id)?;
        let site = self.sites.get(mutation.site)?;
        let tree_index = self.tree_index_at(site.position)?;
        Some(MutationLocation {
            site: mutation.site,
            position: site.position,
            tree_index,
            node: mutation.node,
        })
    }

    fn num_individuals(&self) -> usize {
        self.individuals.len()
    }

    fn individual_nodes(&self, individual: usize) -> [NodeId; 2] {
        self.individuals[individual]
    }
}

/// Pair consecutive sample nodes into diploid individuals.
fn pair_samples(samples: &[NodeId]) -> Result<Vec<[NodeId; 2]>> {
    if samples.len() % 2 != 0 {
        return Err(SimError::Data(format!(
            "Cannot pair {} samples into diploid individuals",
            samples.len()
        )));
    }
    Ok(samples.chunks_exact(2).map(|c| [c[0], c[1]]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tree_sequence() -> TreeSequence {
        let t0 = TreeTopology::comb(4, 5.0).unwrap();
        let t1 = TreeTopology::from_parents(5.0, 10.0, &[4, 4, 5, 5, 6, 6, -1]).unwrap();
        TreeSequence::new(
            vec![t0, t1],
            vec![Site { position: 1.0 }, Site { position: 7.5 }],
            vec![Mutation { site: 0, node: 5 }, Mutation { site: 1, node: 4 }],
            vec![[0, 1], [2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_tree_index_at() {
        let ts = two_tree_sequence();
        assert_eq!(ts.tree_index_at(0.0), Some(0));
        assert_eq!(ts.tree_index_at(4.99), Some(0));
        assert_eq!(ts.tree_index_at(5.0), Some(1));
        assert_eq!(ts.tree_index_at(9.99), Some(1));
        assert_eq!(ts.tree_index_at(10.0), None);
        assert_eq!(ts.tree_index_at(-1.0), None);
    }

    #[test]
    fn test_mutation_location() {
        let ts = two_tree_sequence();
        let loc = ts.mutation_location(1).unwrap();
        assert_eq!(loc.tree_index, 1);
        assert_eq!(loc.node, 4);
        assert_eq!(loc.site, 1);
        assert_eq!(loc.position, 7.5);
        assert!(ts.mutation_location(2).is_none());
    }

    #[test]
    fn test_samples_follow_individual_order() {
        let ts = two_tree_sequence();
        assert_eq!(ts.samples(), vec![0, 1, 2, 3]);
        assert_eq!(ts.num_individuals(), 2);
    }

    #[test]
    fn test_gap_between_trees_rejected() {
        let t0 = TreeTopology::comb(2, 4.0).unwrap();
        let mut t1 = TreeTopology::comb(2, 10.0).unwrap();
        t1.left = 5.0;
        let err = TreeSequence::new(vec![t0, t1], vec![], vec![], vec![[0, 1]]).unwrap_err();
        assert!(matches!(err, SimError::Topology(_)));
    }

    #[test]
    fn test_mutation_with_missing_site_rejected() {
        let tree = TreeTopology::comb(2, 1.0).unwrap();
        let err = TreeSequence::single_tree(
            tree,
            &[0, 1],
            vec![],
            vec![Mutation { site: 0, node: 0 }],
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Data(_)));
    }

    #[test]
    fn test_odd_sample_count_rejected() {
        let tree = TreeTopology::comb(3, 1.0).unwrap();
        let err = TreeSequence::single_tree(tree, &[0, 1, 2], vec![], vec![]).unwrap_err();
        assert!(matches!(err, SimError::Data(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let ts = two_tree_sequence();
        let json = ts.to_json_string().unwrap();
        let back = TreeSequence::from_json_str(&json).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn test_json_rejects_invalid_structure() {
        let json = r#"{
            "sequence_length": 1.0,
            "num_nodes": 3,
            "trees": [{"left": 0.0, "right": 1.0, "root": 2,
                       "left_child": [-1, -1, 0], "right_sib": [1, -1, -1]}],
            "mutations": [{"site": 0, "node": 1}],
            "individuals": [[0, 1]]
        }"#;
        let err = TreeSequence::from_json_str(json).unwrap_err();
        assert!(matches!(err, SimError::Data(_)));
    }

    fn cherry_with_individuals(individuals: &str) -> String {
        format!(
            r#"{{
            "sequence_length": 1.0,
            "num_nodes": 3,
            "trees": [{{"left": 0.0, "right": 1.0, "root": 2,
                       "left_child": [-1, -1, 0], "right_sib": [1, -1, -1]}}],
            "sites": [{{"position": 0.5}}],
            "mutations": [{{"site": 0, "node": 2}}],
            "individuals": {}
        }}"#,
            individuals
        )
    }

    #[test]
    fn test_cherry_with_distinct_leaf_samples_accepted() {
        let ts = TreeSequence::from_json_str(&cherry_with_individuals("[[0, 1]]")).unwrap();
        assert_eq!(ts.samples(), vec![0, 1]);
    }

    #[test]
    fn test_repeated_sample_node_rejected() {
        for individuals in ["[[0, 0]]", "[[0, 1], [0, 1]]", "[[0, 1], [1, 0]]"] {
            let err = TreeSequence::from_json_str(&cherry_with_individuals(individuals))
                .unwrap_err();
            assert!(
                err.to_string().contains("is claimed by individuals"),
                "{}: {}",
                individuals,
                err
            );
        }
    }

    #[test]
    fn test_internal_node_as_sample_rejected() {
        let err = TreeSequence::from_json_str(&cherry_with_individuals("[[2, 0]]")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Data error: Sample node 2 of individual 0 is not a leaf of tree 0"
        );
    }

    #[test]
    fn test_sample_missing_from_later_tree_rejected() {
        // Tree 1 only reaches leaves 0 and 1; node 2 hangs off nothing.
        let t0 = TreeTopology::from_parents(0.0, 5.0, &[4, 4, 5, 5, 6, 6, -1]).unwrap();
        let t1 = TreeTopology::from_parents(5.0, 10.0, &[6, 6, -1, -1, -1, -1, -1]).unwrap();
        let err = TreeSequence::new(vec![t0, t1], vec![], vec![], vec![[0, 1], [2, 3]])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Data error: Sample node 2 of individual 1 is not a leaf of tree 1"
        );
    }
}
