//! treecf: counterfactual explanations for isolation forests.
//!
//! Given a fitted [`IsolationForest`], an input and a desired [`Label`], the
//! crate searches for a minimally modified input that the forest assigns the
//! desired label.
//!
//! # Key Types
//!
//! - [`IsolationForest`] / [`IsolationTree`] - Arena-backed ensemble and trees
//! - [`CounterfactualConfig`] - Search configuration builder
//! - [`CounterfactualSearch`] - The search engine
//! - [`Counterfactual`] - Search result (counterfactual, prediction, delta)
//!
//! # Search
//!
//! Starting points come from the tree structure itself: for every tree, the
//! input is adjusted so it follows leaf paths whose length matches the target
//! label (short paths for outliers, long paths for inliers). Each starting
//! point is refined by a derivative-free minimizer over
//! `regularization(x' - x) + C * loss(x')` until the prediction is accepted.
//!
//! ```
//! use ndarray::array;
//! use treecf::{generate_counterfactual, CounterfactualConfig, IsolationForest, Label};
//!
//! // Values in [-1, 1) are isolated late (inliers), large values early.
//! let tree = treecf::isolation_tree! {
//!     0 => split(0, 1.0) -> 1, 2,
//!     1 => split(0, -1.0) -> 3, 4,
//!     2 => leaf(1),
//!     3 => leaf(1),
//!     4 => leaf(4),
//! };
//! let mut forest = IsolationForest::new(1, 4);
//! forest.push_tree(tree);
//!
//! let x = array![3.0];
//! assert_eq!(forest.predict(&x), Label::Outlier);
//!
//! let config = CounterfactualConfig::builder().build().unwrap();
//! let cf = generate_counterfactual(&forest, x.view(), Label::Inlier, &config).unwrap();
//! assert_eq!(cf.prediction, Label::Inlier);
//! assert!(cf.counterfactual[0] < 1.0);
//! ```

// Re-export approx traits for users who want to compare counterfactuals
pub use approx;

pub mod cost;
pub mod counterfactual;
pub mod data;
pub mod optim;
pub mod paths;
pub mod persist;
pub mod repr;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Model types
pub use repr::{IsolationForest, IsolationTree, Label, NodeId, TreeBuilder, TreeView};

// Search types (most users want these)
pub use counterfactual::{
    generate_counterfactual, Acceptance, CValues, ConfigError, Counterfactual,
    CounterfactualConfig, CounterfactualError, CounterfactualSearch, SearchOrder,
};

// Collaborator seams
pub use cost::{CostFunction, IsolationForestLoss, Regularizer, RegularizationSpec};
pub use optim::{Minimizer, NelderMead, OptimizerSpec};

// Path analysis
pub use paths::{decision_path, extract_leaf_paths, DecisionPath, Direction, PathStep};

// Shared utilities
pub use utils::Parallelism;
