//! Log records emitted by the counterfactual search.
//!
//! Lives in its own test binary: the logger is process-global.

use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};
use ndarray::array;

use treecf::{generate_counterfactual, CounterfactualConfig, IsolationForest, Label};

struct CaptureLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl CaptureLogger {
    fn take(&self) -> Vec<(Level, String)> {
        std::mem::take(&mut *self.records.lock().unwrap())
    }
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};

fn forest() -> IsolationForest {
    let mut forest = IsolationForest::new(2, 8);
    forest.push_tree(treecf::isolation_tree! {
        0 => split(0, 1.0) -> 1, 2,
        1 => split(0, -1.0) -> 3, 4,
        2 => leaf(1),
        3 => leaf(1),
        4 => split(1, 0.0) -> 5, 6,
        5 => leaf(4),
        6 => leaf(4),
    });
    forest.push_tree(treecf::isolation_tree! {
        0 => split(1, 1.0) -> 1, 2,
        1 => split(1, -1.0) -> 3, 4,
        2 => leaf(1),
        3 => leaf(1),
        4 => split(0, 0.0) -> 5, 6,
        5 => leaf(4),
        6 => leaf(4),
    });
    forest
}

fn warnings(records: &[(Level, String)]) -> Vec<&str> {
    records
        .iter()
        .filter(|(level, _)| *level == Level::Warn)
        .map(|(_, msg)| msg.as_str())
        .collect()
}

#[test]
fn search_log_records() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let forest = forest();
    let config = CounterfactualConfig::builder().build().unwrap();

    // Already inlier: one advisory, then the search still runs.
    let x = array![0.0, 0.0];
    let cf = generate_counterfactual(&forest, x.view(), Label::Inlier, &config).unwrap();
    assert_eq!(cf.attempts, 1);
    let records = LOGGER.take();
    assert_eq!(
        warnings(&records),
        vec![
            "input is already predicted as inlier (+1), which satisfies the acceptance criterion for target inlier (+1)"
        ]
    );

    // Outlier input: no advisory, one debug record per attempt.
    let x = array![3.0, 0.0];
    let cf = generate_counterfactual(&forest, x.view(), Label::Inlier, &config).unwrap();
    let records = LOGGER.take();
    assert!(warnings(&records).is_empty());
    let attempts = records
        .iter()
        .filter(|(level, msg)| *level == Level::Debug && msg.starts_with("attempt "))
        .count();
    assert_eq!(attempts, cf.attempts);
}
