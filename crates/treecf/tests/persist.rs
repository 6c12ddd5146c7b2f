//! Integration tests for forest persistence.
//!
//! Saved forests must score and explain exactly like the originals.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use ndarray::Array2;
use tempfile::NamedTempFile;

use treecf::persist::{read_json, to_json, write_json, PersistError};
use treecf::testing::random_forest;
use treecf::{generate_counterfactual, CounterfactualConfig, Parallelism};

fn grid() -> Array2<f64> {
    Array2::from_shape_fn((64, 3), |(i, j)| ((i * 7 + j * 13) % 29) as f64 / 14.0 - 1.0)
}

#[test]
fn file_roundtrip_preserves_scores() {
    let forest = random_forest(12, 3, 6, 128, 5).with_threshold(0.55);
    let file = NamedTempFile::new().unwrap();

    write_json(&forest, BufWriter::new(file.reopen().unwrap())).unwrap();
    let loaded = read_json(BufReader::new(File::open(file.path()).unwrap())).unwrap();

    assert_eq!(loaded, forest);
    let data = grid();
    assert_eq!(
        loaded.score_batch(data.view(), Parallelism::Sequential),
        forest.score_batch(data.view(), Parallelism::Sequential)
    );
    assert_eq!(
        loaded.predict_batch(data.view(), Parallelism::Parallel),
        forest.predict_batch(data.view(), Parallelism::Sequential)
    );
}

#[test]
fn loaded_forest_gives_same_counterfactual() {
    let forest = random_forest(6, 3, 5, 64, 21);
    let loaded = treecf::persist::from_json(&to_json(&forest).unwrap()).unwrap();
    let config = CounterfactualConfig::builder().c_values([1.0, 0.1]).build().unwrap();

    for row in grid().rows().into_iter().take(8) {
        let target = forest.predict(&row).flipped();
        let original = generate_counterfactual(&forest, row, target, &config);
        let reloaded = generate_counterfactual(&loaded, row, target, &config);
        assert_eq!(original, reloaded);
    }
}

#[test]
fn truncated_file_is_a_json_error() {
    let forest = random_forest(2, 2, 3, 16, 9);
    let json = to_json(&forest).unwrap();
    let truncated = &json[..json.len() / 2];

    assert!(matches!(
        read_json(truncated.as_bytes()),
        Err(PersistError::Json(_))
    ));
}
