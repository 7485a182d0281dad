//! Push-down accumulation on hand-built trees with known leaf totals.

use approx::assert_relative_eq;
use treepheno_core::ancestry::TreeTopology;
use treepheno_core::simulate::propagate;
use treepheno_core::simulate::traversal::subtree_weighted_total;
use treepheno_core::types::{NodeId, NULL_NODE};

const N: NodeId = NULL_NODE;

#[test]
fn test_tree_with_missing_nodes() {
    // Root 12 -> {11, 10}; 11 -> {6, 8}; 6 -> {0, 1}; 8 -> {2, 3}; 10 -> {4, 5}.
    // Nodes 7, 9 and 13 take no part in the tree.
    let root = 12;
    let left_child = [N, N, N, N, N, N, 0, N, 2, N, 4, 6, 11, 12];
    let right_sib = [1, N, 3, N, 5, N, 8, N, N, N, N, 10, N, N];
    let mut values = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0];

    propagate(root, &left_child, &right_sib, &mut values);

    assert_eq!(&values[..6], &[4.0, 4.0, 4.0, 4.0, 3.0, 3.0]);
    assert_eq!(values[7], 0.0);
    assert_eq!(values[9], 0.0);
}

#[test]
fn test_comb_one_mutation_per_edge() {
    // 6 -> {0, 5}, 5 -> {1, 4}, 4 -> {2, 3}
    let tree = TreeTopology::comb(4, 10.0).unwrap();
    let mut values = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0];

    propagate(tree.root(), tree.left_child(), tree.right_sib(), &mut values);

    assert_eq!(&values[..4], &[1.0, 2.0, 3.0, 3.0]);
}

#[test]
fn test_non_binary_one_mutation_per_edge() {
    // 7 -> {0, 1, 2, 6}, 6 -> {3, 4, 5}
    let parent = [7, 7, 7, 6, 6, 6, 7, N];
    let tree = TreeTopology::from_parents(0.0, 10.0, &parent).unwrap();
    let mut values = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0];

    propagate(tree.root(), tree.left_child(), tree.right_sib(), &mut values);

    assert_eq!(&values[..6], &[1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
}

#[test]
fn test_leaf_totals_conserve_weighted_mass() {
    let trees = [
        TreeTopology::comb(7, 1.0).unwrap(),
        TreeTopology::from_parents(0.0, 1.0, &[7, 7, 7, 6, 6, 6, 7, N]).unwrap(),
        TreeTopology::from_parents(0.0, 1.0, &[9, 9, 8, 8, 8, 10, 10, 10, 10, 10, N]).unwrap(),
    ];
    for tree in &trees {
        let local: Vec<f64> = (0..tree.num_nodes())
            .map(|i| ((i * 37 % 11) as f64 - 5.0) * 0.1)
            .collect();
        let expected =
            subtree_weighted_total(tree.root(), tree.left_child(), tree.right_sib(), &local);

        let mut values = local.clone();
        propagate(tree.root(), tree.left_child(), tree.right_sib(), &mut values);
        let leaf_sum: f64 = tree.leaves().iter().map(|&l| values[l as usize]).sum();

        assert_relative_eq!(leaf_sum, expected, epsilon = 1e-10);
    }
}

#[test]
fn test_leaf_equals_root_path_sum() {
    let tree = TreeTopology::comb(6, 1.0).unwrap();
    let local: Vec<f64> = (0..tree.num_nodes()).map(|i| i as f64).collect();
    let mut values = local.clone();
    propagate(tree.root(), tree.left_child(), tree.right_sib(), &mut values);

    // Walk up from each leaf using a parent map built from the links.
    let mut parent = vec![N; tree.num_nodes()];
    for node in 0..tree.num_nodes() as NodeId {
        if !tree.is_leaf(node) {
            for child in tree.children(node) {
                parent[child as usize] = node;
            }
        }
    }
    for leaf in tree.leaves() {
        let mut expected = 0.0;
        let mut u = leaf;
        while u != N {
            expected += local[u as usize];
            u = parent[u as usize];
        }
        assert_eq!(values[leaf as usize], expected, "leaf {}", leaf);
    }
}
