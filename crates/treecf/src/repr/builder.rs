//! Node-by-node tree construction.

use super::tree::IsolationTree;
use super::NodeId;

/// Mutable tree used to assemble an [`IsolationTree`].
///
/// Supports two patterns:
/// - growing: allocate the root, then split nodes, allocating children on demand
/// - loading: pre-allocate all nodes and fill them in with explicit child indices
///
/// Nodes start out as leaves with zero samples.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    split_indices: Vec<u32>,
    split_thresholds: Vec<f64>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    is_leaf: Vec<bool>,
    node_samples: Vec<u32>,
}

impl TreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            split_indices: Vec::with_capacity(capacity),
            split_thresholds: Vec::with_capacity(capacity),
            left_children: Vec::with_capacity(capacity),
            right_children: Vec::with_capacity(capacity),
            is_leaf: Vec::with_capacity(capacity),
            node_samples: Vec::with_capacity(capacity),
        }
    }

    /// Initialize the root node as a placeholder.
    ///
    /// Returns the root node ID (always 0).
    pub fn init_root(&mut self) -> NodeId {
        self.reset();
        self.allocate_node();
        0
    }

    /// Initialize the tree with a fixed number of placeholder nodes.
    ///
    /// Useful for loaders where node indices and child references are
    /// already known. Returns the root node ID (0).
    pub fn init_root_with_n_nodes(&mut self, n_nodes: usize) -> NodeId {
        self.reset();
        for _ in 0..n_nodes {
            self.allocate_node();
        }
        0
    }

    /// Number of nodes allocated so far.
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Split a node, allocating its two children.
    ///
    /// Returns `(left_id, right_id)`.
    pub fn apply_split(&mut self, node: NodeId, feature: u32, threshold: f64) -> (NodeId, NodeId) {
        let left_id = self.allocate_node();
        let right_id = self.allocate_node();
        self.set_split(node, feature, threshold, left_id, right_id);
        (left_id, right_id)
    }

    /// Set a split on an existing node, with explicit child indices.
    pub fn set_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f64,
        left_child: NodeId,
        right_child: NodeId,
    ) {
        let idx = node as usize;
        self.split_indices[idx] = feature;
        self.split_thresholds[idx] = threshold;
        self.left_children[idx] = left_child;
        self.right_children[idx] = right_child;
        self.is_leaf[idx] = false;
    }

    /// Turn a node into a leaf reached by `n_samples` training samples.
    pub fn make_leaf(&mut self, node: NodeId, n_samples: u32) {
        let idx = node as usize;
        self.is_leaf[idx] = true;
        self.node_samples[idx] = n_samples;
    }

    /// Record the number of training samples that reached a split node.
    pub fn set_node_samples(&mut self, node: NodeId, n_samples: u32) {
        self.node_samples[node as usize] = n_samples;
    }

    /// Freeze into an immutable [`IsolationTree`].
    pub fn freeze(self) -> IsolationTree {
        IsolationTree::new(
            self.split_indices,
            self.split_thresholds,
            self.left_children,
            self.right_children,
            self.is_leaf,
            self.node_samples,
        )
    }

    fn reset(&mut self) {
        self.split_indices.clear();
        self.split_thresholds.clear();
        self.left_children.clear();
        self.right_children.clear();
        self.is_leaf.clear();
        self.node_samples.clear();
    }

    fn allocate_node(&mut self) -> NodeId {
        let id = self.is_leaf.len() as NodeId;
        self.split_indices.push(0);
        self.split_thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.is_leaf.push(true);
        self.node_samples.push(0);
        id
    }
}
