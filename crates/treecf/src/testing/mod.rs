//! Testing utilities for treecf.
//!
//! This module provides tree fixtures and assertion helpers shared by unit
//! tests, integration tests, doctests and benchmarks.
//!
//! - [`isolation_tree!`](crate::isolation_tree): literal tree construction
//! - [`random_tree`] / [`random_forest`]: seeded random fixtures
//! - assertion helpers for float slices and whitelist checks

use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::repr::{IsolationForest, IsolationTree, NodeId, TreeBuilder};

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for floating point comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

// =============================================================================
// Literal trees
// =============================================================================

/// Node description for [`build_tree`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeSpec {
    Split {
        feature: u32,
        threshold: f64,
        left: NodeId,
        right: NodeId,
    },
    Leaf {
        n_samples: u32,
    },
}

/// Build a tree from `(node_id, spec)` pairs.
///
/// Nodes may be listed in any order. Split nodes record the sample count of
/// their subtree.
///
/// # Panics
///
/// Panics if a node id is listed twice or an id in `0..=max_id` is missing.
pub fn build_tree(nodes: &[(usize, NodeSpec)]) -> IsolationTree {
    let n_nodes = nodes.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
    let mut specs: Vec<Option<NodeSpec>> = vec![None; n_nodes];
    for &(id, spec) in nodes {
        assert!(specs[id].is_none(), "node {id} is defined twice");
        specs[id] = Some(spec);
    }

    let mut builder = TreeBuilder::with_capacity(n_nodes);
    builder.init_root_with_n_nodes(n_nodes);
    for (id, spec) in specs.iter().enumerate() {
        match spec.unwrap_or_else(|| panic!("node {id} is missing")) {
            NodeSpec::Split {
                feature,
                threshold,
                left,
                right,
            } => builder.set_split(id as NodeId, feature, threshold, left, right),
            NodeSpec::Leaf { n_samples } => builder.make_leaf(id as NodeId, n_samples),
        }
    }
    for id in 0..n_nodes {
        if let Some(NodeSpec::Split { .. }) = specs[id] {
            let total = subtree_samples(&specs, id, n_nodes);
            builder.set_node_samples(id as NodeId, total);
        }
    }

    builder.freeze()
}

fn subtree_samples(specs: &[Option<NodeSpec>], node: usize, budget: usize) -> u32 {
    if budget == 0 {
        return 0;
    }
    match specs.get(node).copied().flatten() {
        Some(NodeSpec::Leaf { n_samples }) => n_samples,
        Some(NodeSpec::Split { left, right, .. }) => {
            subtree_samples(specs, left as usize, budget - 1)
                + subtree_samples(specs, right as usize, budget - 1)
        }
        None => 0,
    }
}

/// Build an [`IsolationTree`] from a node listing.
///
/// Each entry is `id => split(feature, threshold) -> left, right` or
/// `id => leaf(n_samples)`.
///
/// # Examples
///
/// ```
/// use treecf::TreeView;
///
/// let tree = treecf::isolation_tree! {
///     0 => split(0, 0.5) -> 1, 2,
///     1 => leaf(3),
///     2 => leaf(1),
/// };
/// assert_eq!(tree.n_nodes(), 3);
/// assert_eq!(tree.node_samples(0), 4);
/// assert_eq!(tree.traverse_to_leaf(&[0.1]), 1);
/// ```
#[macro_export]
macro_rules! isolation_tree {
    ($($body:tt)*) => {{
        let mut nodes: ::std::vec::Vec<(usize, $crate::testing::NodeSpec)> = ::std::vec::Vec::new();
        $crate::__isolation_tree_nodes!(nodes; $($body)*);
        $crate::testing::build_tree(&nodes)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __isolation_tree_nodes {
    ($nodes:ident;) => {};
    ($nodes:ident; $id:literal => split($feature:expr, $threshold:expr) -> $left:literal, $right:literal $(, $($rest:tt)*)?) => {
        $nodes.push((
            $id,
            $crate::testing::NodeSpec::Split {
                feature: $feature,
                threshold: $threshold,
                left: $left,
                right: $right,
            },
        ));
        $crate::__isolation_tree_nodes!($nodes; $($($rest)*)?);
    };
    ($nodes:ident; $id:literal => leaf($n_samples:expr) $(, $($rest:tt)*)?) => {
        $nodes.push(($id, $crate::testing::NodeSpec::Leaf { n_samples: $n_samples }));
        $crate::__isolation_tree_nodes!($nodes; $($($rest)*)?);
    };
}

// =============================================================================
// Random fixtures
// =============================================================================

/// Random tree over `n_features` features in `[-1, 1]`, at most `max_depth` deep.
///
/// Each threshold falls in the middle half of the interval that reaches its
/// node, so every leaf is reachable and nested thresholds on a feature stay
/// well separated. Leaves hold 1 to 8 samples.
pub fn random_tree(n_features: usize, max_depth: usize, seed: u64) -> IsolationTree {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = TreeBuilder::new();
    let root = builder.init_root();
    let bounds = vec![(-1.0, 1.0); n_features.max(1)];
    grow(&mut builder, &mut rng, root, 0, max_depth, &bounds);
    builder.freeze()
}

fn grow(
    builder: &mut TreeBuilder,
    rng: &mut StdRng,
    node: NodeId,
    depth: usize,
    max_depth: usize,
    bounds: &[(f64, f64)],
) -> u32 {
    let stop = depth >= max_depth || (depth > 0 && rng.gen_bool(0.25));
    if stop {
        let n_samples = rng.gen_range(1..=8);
        builder.make_leaf(node, n_samples);
        return n_samples;
    }

    let feature = rng.gen_range(0..bounds.len());
    let (lo, hi) = bounds[feature];
    let width = hi - lo;
    let threshold = rng.gen_range((lo + 0.25 * width)..=(lo + 0.75 * width));

    let (left, right) = builder.apply_split(node, feature as u32, threshold);

    let mut left_bounds = bounds.to_vec();
    left_bounds[feature].1 = threshold;
    let mut right_bounds = bounds.to_vec();
    right_bounds[feature].0 = threshold;

    let total = grow(builder, rng, left, depth + 1, max_depth, &left_bounds)
        + grow(builder, rng, right, depth + 1, max_depth, &right_bounds);
    builder.set_node_samples(node, total);
    total
}

/// Forest of `n_trees` [`random_tree`]s with consecutive seeds.
pub fn random_forest(
    n_trees: usize,
    n_features: usize,
    max_depth: usize,
    max_samples: usize,
    seed: u64,
) -> IsolationForest {
    let mut forest = IsolationForest::new(n_features, max_samples);
    for i in 0..n_trees {
        forest.push_tree(random_tree(n_features, max_depth, seed.wrapping_add(i as u64)));
    }
    forest
}

// =============================================================================
// Assertions
// =============================================================================

/// Assert that two slices are approximately equal element-wise.
///
/// # Panics
///
/// Panics if lengths differ or any element differs by more than tolerance.
pub fn assert_slice_approx_eq(actual: &[f64], expected: &[f64], tolerance: f64, context: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{context}: length mismatch - got {}, expected {}",
        actual.len(),
        expected.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let diff = (a - e).abs();
        assert!(
            diff <= tolerance,
            "{context}[{i}]: {a} != {e} (diff={diff}, tolerance={tolerance})"
        );
    }
}

/// Assert that `candidate` equals `x` everywhere outside `allowed`.
///
/// # Panics
///
/// Panics on the first differing feature that is not in `allowed`.
pub fn assert_differs_only_at(x: ArrayView1<'_, f64>, candidate: ArrayView1<'_, f64>, allowed: &[usize]) {
    assert_eq!(x.len(), candidate.len(), "length mismatch");
    for (i, (a, b)) in x.iter().zip(candidate.iter()).enumerate() {
        assert!(
            a == b || allowed.contains(&i),
            "feature {i} changed from {a} to {b} but only {allowed:?} may change"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::extract_leaf_paths;
    use crate::repr::TreeView;

    #[test]
    fn macro_accepts_any_node_order() {
        let tree = crate::isolation_tree! {
            2 => leaf(2),
            0 => split(1, -0.5) -> 1, 2,
            1 => leaf(6)
        };
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.split_index(0), 1);
        assert_eq!(tree.node_samples(0), 8);
    }

    #[test]
    fn random_tree_is_valid_and_deterministic() {
        for seed in 0..20 {
            let tree = random_tree(3, 5, seed);
            assert!(tree.validate().is_ok());
            assert_eq!(tree, random_tree(3, 5, seed));

            let paths = extract_leaf_paths(&tree).unwrap();
            assert_eq!(paths.len(), tree.n_leaves());
            assert!(paths.iter().all(|p| p.len() <= 5));
        }
    }

    #[test]
    fn random_forest_validates() {
        let forest = random_forest(5, 4, 6, 64, 7);
        assert_eq!(forest.n_trees(), 5);
        assert!(forest.validate().is_ok());
    }

    #[test]
    #[should_panic(expected = "feature 0 changed")]
    fn differs_only_at_detects_change() {
        let x = ndarray::array![1.0, 2.0];
        let y = ndarray::array![1.5, 2.0];
        assert_differs_only_at(x.view(), y.view(), &[1]);
    }
}
