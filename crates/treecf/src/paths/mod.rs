//! Decision path enumeration.
//!
//! A decision path is the ordered sequence of splits a sample passes through
//! from the root of a tree to a leaf. [`extract_leaf_paths`] enumerates every
//! root-to-leaf path of a tree; [`decision_path`] records the single path a
//! sample follows.

pub mod adjust;

pub use adjust::{score_adjustments, Adjustment, ScoredAdjustment};

use crate::data::SampleAccessor;
use crate::repr::{NodeId, TreeView};

// =============================================================================
// Path steps
// =============================================================================

/// Branch taken at a split node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `value < threshold`.
    Left,
    /// `value >= threshold`.
    Right,
}

impl Direction {
    /// Direction a value takes at a split with the given threshold.
    #[inline]
    pub fn of(value: f64, threshold: f64) -> Self {
        if value < threshold {
            Direction::Left
        } else {
            Direction::Right
        }
    }
}

/// One split on a decision path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStep {
    /// Split node the step leaves from.
    pub node: NodeId,
    /// Feature tested by the split.
    pub feature: usize,
    /// Split threshold.
    pub threshold: f64,
    /// Branch taken.
    pub direction: Direction,
}

impl PathStep {
    /// Whether a feature value takes this step's branch.
    #[inline]
    pub fn is_satisfied_by(&self, value: f64) -> bool {
        match self.direction {
            Direction::Left => value < self.threshold,
            Direction::Right => value >= self.threshold,
        }
    }
}

/// Root-to-leaf path through a tree.
///
/// The length of a path is its number of steps, which equals the number of
/// edges between the root and the leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPath {
    steps: Vec<PathStep>,
    leaf: NodeId,
}

impl DecisionPath {
    /// Create a path from its steps and the leaf it ends in.
    pub fn new(steps: Vec<PathStep>, leaf: NodeId) -> Self {
        Self { steps, leaf }
    }

    /// Steps from the root, in order.
    #[inline]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Leaf the path ends in.
    #[inline]
    pub fn leaf(&self) -> NodeId {
        self.leaf
    }

    /// Number of edges.
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for the path of a single-leaf tree.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of leading steps shared with `other`.
    ///
    /// Both paths start at the same root, so two steps agree when they leave
    /// the same node in the same direction.
    pub fn common_prefix_len(&self, other: &DecisionPath) -> usize {
        self.steps
            .iter()
            .zip(other.steps.iter())
            .take_while(|(a, b)| a.node == b.node && a.direction == b.direction)
            .count()
    }

    /// Whether `sample` takes every step of this path.
    pub fn is_followed_by<S: SampleAccessor + ?Sized>(&self, sample: &S) -> bool {
        self.steps
            .iter()
            .all(|step| step.is_satisfied_by(sample.feature(step.feature)))
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Malformed tree structure found while enumerating paths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("tree has no nodes")]
    EmptyTree,
    #[error("node {node} points to child {child}, but the tree has {n_nodes} nodes")]
    ChildOutOfBounds {
        node: NodeId,
        child: NodeId,
        n_nodes: usize,
    },
    #[error("node {node} references itself as a child")]
    SelfLoop { node: NodeId },
    #[error("node {node} is reached more than once")]
    RevisitedNode { node: NodeId },
}

/// Enumerate every root-to-leaf path of `tree`.
///
/// Paths are produced depth-first, left child before right child, so the
/// result is ordered by leaf position from left to right.
///
/// # Errors
///
/// Returns [`PathError`] if the tree is empty, a child index is out of bounds,
/// or a node can be reached twice (cycles and shared children).
pub fn extract_leaf_paths<T: TreeView>(tree: &T) -> Result<Vec<DecisionPath>, PathError> {
    let n_nodes = tree.n_nodes();
    if n_nodes == 0 {
        return Err(PathError::EmptyTree);
    }

    let mut visited = vec![false; n_nodes];
    let mut paths = Vec::new();
    let mut stack: Vec<(NodeId, Vec<PathStep>)> = vec![(0, Vec::new())];

    while let Some((node, steps)) = stack.pop() {
        let idx = node as usize;
        if visited[idx] {
            return Err(PathError::RevisitedNode { node });
        }
        visited[idx] = true;

        if tree.is_leaf(node) {
            paths.push(DecisionPath::new(steps, node));
            continue;
        }

        let left = tree.left_child(node);
        let right = tree.right_child(node);
        for child in [left, right] {
            if child == node {
                return Err(PathError::SelfLoop { node });
            }
            if child as usize >= n_nodes {
                return Err(PathError::ChildOutOfBounds {
                    node,
                    child,
                    n_nodes,
                });
            }
        }

        let feature = tree.split_index(node) as usize;
        let threshold = tree.split_threshold(node);
        let step = |direction| PathStep {
            node,
            feature,
            threshold,
            direction,
        };

        let mut right_steps = steps.clone();
        right_steps.push(step(Direction::Right));
        let mut left_steps = steps;
        left_steps.push(step(Direction::Left));

        // Right is pushed first so the left subtree is popped first.
        stack.push((right, right_steps));
        stack.push((left, left_steps));
    }

    Ok(paths)
}

/// Path followed by `sample` through `tree`.
///
/// The tree must be well formed (see [`crate::repr::IsolationTree::validate`]).
pub fn decision_path<T, S>(tree: &T, sample: &S) -> DecisionPath
where
    T: TreeView,
    S: SampleAccessor + ?Sized,
{
    let mut steps = Vec::new();
    let mut node: NodeId = 0;

    while !tree.is_leaf(node) {
        let feature = tree.split_index(node) as usize;
        let threshold = tree.split_threshold(node);
        let direction = Direction::of(sample.feature(feature), threshold);
        steps.push(PathStep {
            node,
            feature,
            threshold,
            direction,
        });
        node = match direction {
            Direction::Left => tree.left_child(node),
            Direction::Right => tree.right_child(node),
        };
    }

    DecisionPath::new(steps, node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::IsolationTree;

    fn tree() -> IsolationTree {
        crate::isolation_tree! {
            0 => split(0, 1.0) -> 1, 2,
            1 => split(1, 0.0) -> 3, 4,
            2 => leaf(2),
            3 => leaf(1),
            4 => split(0, -1.0) -> 5, 6,
            5 => leaf(1),
            6 => leaf(3),
        }
    }

    #[test]
    fn leaf_paths_are_left_first() {
        let paths = extract_leaf_paths(&tree()).unwrap();

        let leaves: Vec<_> = paths.iter().map(DecisionPath::leaf).collect();
        assert_eq!(leaves, vec![3, 5, 6, 2]);

        let lengths: Vec<_> = paths.iter().map(DecisionPath::len).collect();
        assert_eq!(lengths, vec![2, 3, 3, 1]);

        let deepest = &paths[1];
        assert_eq!(deepest.steps()[0].direction, Direction::Left);
        assert_eq!(deepest.steps()[1].direction, Direction::Right);
        assert_eq!(deepest.steps()[2].direction, Direction::Left);
        assert_eq!(deepest.steps()[2].feature, 0);
        assert_eq!(deepest.steps()[2].threshold, -1.0);
    }

    #[test]
    fn single_leaf_tree_has_one_empty_path() {
        let tree = crate::isolation_tree! { 0 => leaf(5) };
        let paths = extract_leaf_paths(&tree).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_empty());
        assert_eq!(paths[0].leaf(), 0);
    }

    #[test]
    fn decision_path_matches_traversal() {
        let tree = tree();
        let x = [0.0, 2.0];
        let path = decision_path(&tree, &x);

        assert_eq!(path.leaf(), tree.traverse_to_leaf(&x));
        assert_eq!(path.len(), tree.decision_path_length(&x));
        assert!(path.is_followed_by(&x));
        assert!(!path.is_followed_by(&[5.0, 2.0]));
    }

    #[test]
    fn common_prefix() {
        let tree = tree();
        let a = decision_path(&tree, &[-2.0, 1.0]);
        let b = decision_path(&tree, &[0.0, 1.0]);
        let c = decision_path(&tree, &[3.0, 1.0]);

        assert_eq!(a.common_prefix_len(&b), 2);
        assert_eq!(a.common_prefix_len(&c), 0);
        assert_eq!(a.common_prefix_len(&a), 3);
    }

    #[test]
    fn malformed_trees_are_rejected() {
        let empty = IsolationTree::new(vec![], vec![], vec![], vec![], vec![], vec![]);
        assert_eq!(extract_leaf_paths(&empty), Err(PathError::EmptyTree));

        let out_of_bounds = IsolationTree::new(
            vec![0, 0],
            vec![0.0, 0.0],
            vec![1, 0],
            vec![9, 0],
            vec![false, true],
            vec![2, 1],
        );
        assert!(matches!(
            extract_leaf_paths(&out_of_bounds),
            Err(PathError::ChildOutOfBounds { node: 0, child: 9, .. })
        ));

        let self_loop = IsolationTree::new(
            vec![0, 0],
            vec![0.0, 0.0],
            vec![1, 0],
            vec![0, 0],
            vec![false, true],
            vec![2, 1],
        );
        assert_eq!(extract_leaf_paths(&self_loop), Err(PathError::SelfLoop { node: 0 }));

        let shared = IsolationTree::new(
            vec![0, 0],
            vec![0.0, 0.0],
            vec![1, 0],
            vec![1, 0],
            vec![false, true],
            vec![2, 1],
        );
        assert_eq!(
            extract_leaf_paths(&shared),
            Err(PathError::RevisitedNode { node: 1 })
        );
    }

    #[test]
    fn cycle_is_rejected() {
        // 0 -> (1, 2), 1 -> (0, 2)
        let cyclic = IsolationTree::new(
            vec![0, 0, 0],
            vec![0.0, 0.0, 0.0],
            vec![1, 0, 0],
            vec![2, 2, 0],
            vec![false, false, true],
            vec![2, 2, 1],
        );
        assert!(extract_leaf_paths(&cyclic).is_err());
    }
}
