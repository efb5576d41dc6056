//! Custom assertions for scheduler runs

use super::toy::ToyState;
use parallel_bam::{BamStatus, DataManager};

/// Run finished soundly and every executor was finalized exactly once
pub fn assert_clean_run(status: &BamStatus) {
    assert!(status.sound, "expected sound run, got {:?}", status);
    assert!(!status.interrupted, "run was interrupted: {:?}", status);
    assert_eq!(
        status.statistics.executors_created, status.statistics.executors_finished,
        "every executor must finish exactly once: {}",
        status.statistics
    );
    assert_single_writer(status);
}

pub fn assert_single_writer(status: &BamStatus) {
    assert!(
        status.statistics.max_concurrent_applies <= 1,
        "reached set mutated concurrently: {}",
        status.statistics
    );
}

/// Every cache entry carries exit states
pub fn assert_all_entries_complete(data_manager: &DataManager<ToyState, ()>) {
    let incomplete: Vec<_> = data_manager
        .cache()
        .entries()
        .into_iter()
        .filter(|e| !e.is_complete())
        .map(|e| e.key().describe())
        .collect();
    assert!(incomplete.is_empty(), "incomplete cache entries: {:?}", incomplete);
}
