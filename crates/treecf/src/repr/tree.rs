//! Canonical tree representation (SoA) and read-only tree interface.
//!
//! This module provides:
//! - [`IsolationTree`]: Immutable SoA tree storage for efficient traversal
//! - [`TreeView`]: Read-only trait for unified tree access
//! - [`TreeValidationError`]: Structural validation errors
//!
//! For node-by-node construction, see [`super::builder::TreeBuilder`].

use crate::data::SampleAccessor;

use super::NodeId;

// ============================================================================
// TreeView Trait
// ============================================================================

/// Read-only view of a tree for traversal.
///
/// Provides the minimal interface needed to walk a tree from root to leaf and
/// to enumerate its decision paths. Numeric splits send a sample left when
/// `value < threshold` and right otherwise.
///
/// # Example
///
/// ```
/// use treecf::repr::TreeView;
///
/// fn count_leaves<T: TreeView>(tree: &T) -> usize {
///     (0..tree.n_nodes())
///         .filter(|&n| tree.is_leaf(n as u32))
///         .count()
/// }
/// ```
pub trait TreeView {
    /// Number of nodes in the tree.
    fn n_nodes(&self) -> usize;

    /// Check if a node is a leaf.
    fn is_leaf(&self, node: NodeId) -> bool;

    /// Get the feature index for a split node.
    fn split_index(&self, node: NodeId) -> u32;

    /// Get the split threshold for a split node.
    fn split_threshold(&self, node: NodeId) -> f64;

    /// Get the left child node index.
    fn left_child(&self, node: NodeId) -> NodeId;

    /// Get the right child node index.
    fn right_child(&self, node: NodeId) -> NodeId;

    /// Number of training samples that reached the node.
    fn node_samples(&self, node: NodeId) -> u32;

    /// Whether `value` is sent to the left child of `node`.
    #[inline]
    fn goes_left(&self, node: NodeId, value: f64) -> bool {
        value < self.split_threshold(node)
    }

    /// Traverse the tree to find the leaf node for a sample.
    #[inline]
    fn traverse_to_leaf<S: SampleAccessor + ?Sized>(&self, sample: &S) -> NodeId {
        self.walk(sample).0
    }

    /// Number of edges between the root and the leaf reached by `sample`.
    #[inline]
    fn decision_path_length<S: SampleAccessor + ?Sized>(&self, sample: &S) -> usize {
        self.walk(sample).1
    }

    /// Traverse from the root, returning the reached leaf and its depth.
    fn walk<S: SampleAccessor + ?Sized>(&self, sample: &S) -> (NodeId, usize) {
        let mut node: NodeId = 0;
        let mut depth = 0usize;

        while !self.is_leaf(node) {
            let fvalue = sample.feature(self.split_index(node) as usize);
            node = if self.goes_left(node, fvalue) {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
            depth += 1;
        }

        (node, depth)
    }
}

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for [`IsolationTree`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeValidationError {
    /// Tree has no nodes.
    #[error("tree has no nodes")]
    EmptyTree,
    /// A child pointer references an out-of-bounds node.
    #[error("node {node} has {side} child {child} out of bounds ({n_nodes} nodes)")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    /// A node references itself as a child.
    #[error("node {node} references itself as a child")]
    SelfLoop { node: NodeId },
    /// A node was reached by more than one path.
    #[error("node {node} is reachable by more than one path")]
    DuplicateVisit { node: NodeId },
    /// A cycle was detected during traversal.
    #[error("cycle detected at node {node}")]
    CycleDetected { node: NodeId },
    /// A node exists in storage but is unreachable from the root.
    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: NodeId },
    /// A split threshold is NaN or infinite.
    #[error("node {node} has non-finite threshold {threshold}")]
    NonFiniteThreshold { node: NodeId, threshold: f64 },
}

// ============================================================================
// IsolationTree
// ============================================================================

/// Structure-of-Arrays isolation tree.
///
/// Stores tree nodes in flat arrays for cache-friendly traversal.
/// Child indices are local to this tree (0 = root). Leaves carry the number of
/// training samples that reached them, which feeds the path-length correction
/// of the anomaly score.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolationTree {
    split_indices: Box<[u32]>,
    split_thresholds: Box<[f64]>,
    left_children: Box<[u32]>,
    right_children: Box<[u32]>,
    is_leaf: Box<[bool]>,
    node_samples: Box<[u32]>,
}

impl IsolationTree {
    /// Create a new tree from parallel arrays.
    ///
    /// All arrays must have the same length (number of nodes). Entries of
    /// split arrays are ignored for leaves.
    pub fn new(
        split_indices: Vec<u32>,
        split_thresholds: Vec<f64>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        is_leaf: Vec<bool>,
        node_samples: Vec<u32>,
    ) -> Self {
        let n_nodes = split_indices.len();
        debug_assert_eq!(n_nodes, split_thresholds.len());
        debug_assert_eq!(n_nodes, left_children.len());
        debug_assert_eq!(n_nodes, right_children.len());
        debug_assert_eq!(n_nodes, is_leaf.len());
        debug_assert_eq!(n_nodes, node_samples.len());

        Self {
            split_indices: split_indices.into_boxed_slice(),
            split_thresholds: split_thresholds.into_boxed_slice(),
            left_children: left_children.into_boxed_slice(),
            right_children: right_children.into_boxed_slice(),
            is_leaf: is_leaf.into_boxed_slice(),
            node_samples: node_samples.into_boxed_slice(),
        }
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&l| l).count()
    }

    /// Largest feature index used by any split, if the tree has splits.
    pub fn max_split_index(&self) -> Option<u32> {
        self.split_indices
            .iter()
            .zip(self.is_leaf.iter())
            .filter(|(_, &leaf)| !leaf)
            .map(|(&f, _)| f)
            .max()
    }

    // Raw arrays, used by persistence.

    pub(crate) fn split_indices(&self) -> &[u32] {
        &self.split_indices
    }

    pub(crate) fn split_thresholds(&self) -> &[f64] {
        &self.split_thresholds
    }

    pub(crate) fn left_children(&self) -> &[u32] {
        &self.left_children
    }

    pub(crate) fn right_children(&self) -> &[u32] {
        &self.right_children
    }

    pub(crate) fn leaf_flags(&self) -> &[bool] {
        &self.is_leaf
    }

    pub(crate) fn samples(&self) -> &[u32] {
        &self.node_samples
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate basic structural invariants for this tree.
    ///
    /// Checks that every node is reachable from the root exactly once, that
    /// child pointers are in bounds and that split thresholds are finite.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }

        // Iterative DFS with color marking.
        // 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        let mut stack: Vec<(NodeId, u8)> = vec![(0, 0)];

        while let Some((node, phase)) = stack.pop() {
            let node_usize = node as usize;

            match phase {
                0 => {
                    match color[node_usize] {
                        0 => {}
                        1 => return Err(TreeValidationError::CycleDetected { node }),
                        _ => return Err(TreeValidationError::DuplicateVisit { node }),
                    }

                    color[node_usize] = 1;
                    stack.push((node, 1));

                    if !self.is_leaf(node) {
                        let threshold = self.split_threshold(node);
                        if !threshold.is_finite() {
                            return Err(TreeValidationError::NonFiniteThreshold { node, threshold });
                        }

                        let left = self.left_child(node);
                        let right = self.right_child(node);

                        if left == node || right == node {
                            return Err(TreeValidationError::SelfLoop { node });
                        }

                        for (side, child) in [("left", left), ("right", right)] {
                            if child as usize >= n_nodes {
                                return Err(TreeValidationError::ChildOutOfBounds {
                                    node,
                                    side,
                                    child,
                                    n_nodes,
                                });
                            }
                        }

                        // Visit children
                        stack.push((right, 0));
                        stack.push((left, 0));
                    }
                }
                _ => {
                    color[node_usize] = 2;
                }
            }
        }

        if let Some(node) = color.iter().position(|&c| c == 0) {
            return Err(TreeValidationError::UnreachableNode { node: node as u32 });
        }

        Ok(())
    }
}

// =============================================================================
// TreeView for IsolationTree
// =============================================================================

impl TreeView for IsolationTree {
    #[inline]
    fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    #[inline]
    fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    fn split_index(&self, node: NodeId) -> u32 {
        self.split_indices[node as usize]
    }

    #[inline]
    fn split_threshold(&self, node: NodeId) -> f64 {
        self.split_thresholds[node as usize]
    }

    #[inline]
    fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    #[inline]
    fn node_samples(&self, node: NodeId) -> u32 {
        self.node_samples[node as usize]
    }
}
