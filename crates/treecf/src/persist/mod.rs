//! JSON persistence for fitted forests.
//!
//! Forests are written through the schema types in [`schema`] and validated
//! on load, so a successfully read forest is ready for scoring and search.
//!
//! # Example
//!
//! ```
//! use treecf::persist::{from_json, to_json};
//! use treecf::IsolationForest;
//!
//! let mut forest = IsolationForest::new(1, 4);
//! forest.push_tree(treecf::isolation_tree! {
//!     0 => split(0, 0.0) -> 1, 2,
//!     1 => leaf(2),
//!     2 => leaf(2),
//! });
//!
//! let json = to_json(&forest).unwrap();
//! let loaded = from_json(&json).unwrap();
//! assert_eq!(loaded, forest);
//! ```

pub mod schema;

use std::io::{Read, Write};

use schema::{IsolationForestSchema, IsolationTreeSchema, SCHEMA_VERSION};

use crate::repr::{ForestValidationError, IsolationForest, IsolationTree, TreeView};

/// Errors raised while reading or writing forests.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported schema version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("tree {tree_idx}: {field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        tree_idx: usize,
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid forest: {0}")]
    InvalidForest(#[from] ForestValidationError),
}

// =============================================================================
// Conversions
// =============================================================================

impl From<&IsolationTree> for IsolationTreeSchema {
    fn from(tree: &IsolationTree) -> Self {
        Self {
            num_nodes: tree.n_nodes() as u32,
            split_indices: tree.split_indices().to_vec(),
            thresholds: tree.split_thresholds().to_vec(),
            children_left: tree.left_children().to_vec(),
            children_right: tree.right_children().to_vec(),
            is_leaf: tree.leaf_flags().to_vec(),
            node_samples: tree.samples().to_vec(),
        }
    }
}

impl From<&IsolationForest> for IsolationForestSchema {
    fn from(forest: &IsolationForest) -> Self {
        Self {
            version: SCHEMA_VERSION,
            num_features: forest.n_features(),
            max_samples: forest.max_samples(),
            threshold: forest.threshold(),
            trees: forest.trees().iter().map(IsolationTreeSchema::from).collect(),
        }
    }
}

fn tree_from_schema(tree_idx: usize, schema: IsolationTreeSchema) -> Result<IsolationTree, PersistError> {
    let expected = schema.num_nodes as usize;
    let lengths = [
        ("split_indices", schema.split_indices.len()),
        ("thresholds", schema.thresholds.len()),
        ("children_left", schema.children_left.len()),
        ("children_right", schema.children_right.len()),
        ("is_leaf", schema.is_leaf.len()),
        ("node_samples", schema.node_samples.len()),
    ];
    for (field, actual) in lengths {
        if actual != expected {
            return Err(PersistError::LengthMismatch {
                tree_idx,
                field,
                expected,
                actual,
            });
        }
    }

    Ok(IsolationTree::new(
        schema.split_indices,
        schema.thresholds,
        schema.children_left,
        schema.children_right,
        schema.is_leaf,
        schema.node_samples,
    ))
}

impl TryFrom<IsolationForestSchema> for IsolationForest {
    type Error = PersistError;

    fn try_from(schema: IsolationForestSchema) -> Result<Self, Self::Error> {
        if schema.version != SCHEMA_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: schema.version,
                supported: SCHEMA_VERSION,
            });
        }

        let mut forest = IsolationForest::new(schema.num_features, schema.max_samples)
            .with_threshold(schema.threshold);
        for (tree_idx, tree) in schema.trees.into_iter().enumerate() {
            forest.push_tree(tree_from_schema(tree_idx, tree)?);
        }

        forest.validate()?;
        Ok(forest)
    }
}

// =============================================================================
// JSON
// =============================================================================

/// Serialize a forest to a JSON string.
pub fn to_json(forest: &IsolationForest) -> Result<String, PersistError> {
    Ok(serde_json::to_string(&IsolationForestSchema::from(forest))?)
}

/// Deserialize and validate a forest from a JSON string.
pub fn from_json(json: &str) -> Result<IsolationForest, PersistError> {
    let schema: IsolationForestSchema = serde_json::from_str(json)?;
    IsolationForest::try_from(schema)
}

/// Write a forest as pretty-printed JSON.
pub fn write_json<W: Write>(forest: &IsolationForest, mut writer: W) -> Result<(), PersistError> {
    serde_json::to_writer_pretty(&mut writer, &IsolationForestSchema::from(forest))?;
    writer.flush()?;
    Ok(())
}

/// Read and validate a forest from a JSON reader.
pub fn read_json<R: Read>(reader: R) -> Result<IsolationForest, PersistError> {
    let schema: IsolationForestSchema = serde_json::from_reader(reader)?;
    IsolationForest::try_from(schema)
}
