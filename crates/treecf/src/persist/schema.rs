//! Schema types for forest serialization.
//!
//! These types provide a stable serialization format independent of the
//! runtime types, so the runtime representation can change without breaking
//! stored models. They are validated when converted back into runtime types.

use serde::{Deserialize, Serialize};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

fn default_threshold() -> f64 {
    crate::repr::forest::DEFAULT_SCORE_THRESHOLD
}

/// Isolation tree schema: parallel per-node arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTreeSchema {
    /// Number of nodes (internal + leaves).
    pub num_nodes: u32,
    /// Split feature index per node (ignored for leaves).
    pub split_indices: Vec<u32>,
    /// Split threshold per node (ignored for leaves).
    pub thresholds: Vec<f64>,
    /// Left child index per node.
    pub children_left: Vec<u32>,
    /// Right child index per node.
    pub children_right: Vec<u32>,
    /// Leaf flag per node.
    pub is_leaf: Vec<bool>,
    /// Training samples that reached each node.
    pub node_samples: Vec<u32>,
}

/// Isolation forest schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestSchema {
    /// Schema version.
    pub version: u32,
    /// Number of input features.
    pub num_features: usize,
    /// Sub-sample size each tree was grown on.
    pub max_samples: usize,
    /// Anomaly score threshold.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Member trees.
    pub trees: Vec<IsolationTreeSchema>,
}
