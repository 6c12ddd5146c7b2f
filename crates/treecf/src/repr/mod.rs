//! Canonical isolation forest representations.

/// Canonical node identifier.
///
/// Internally this is just an index into the tree's SoA arrays.
pub type NodeId = u32;

pub mod builder;
pub mod forest;
pub mod label;
pub mod tree;

pub use builder::TreeBuilder;
pub use forest::{average_path_length, ForestValidationError, IsolationForest};
pub use label::Label;
pub use tree::{IsolationTree, TreeValidationError, TreeView};
