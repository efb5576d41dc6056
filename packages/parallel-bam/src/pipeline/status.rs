//! Run result types

use crate::features::cache::CacheCounts;
use std::fmt;
use std::time::Duration;

/// Outcome of one coordinator run
#[derive(Debug, Clone, PartialEq)]
pub struct BamStatus {
    /// False after a timeout or an interrupt: the result may miss states
    pub sound: bool,
    /// Main reached set contains a target state
    pub target_found: bool,
    /// Run was stopped through the shutdown handle
    pub interrupted: bool,
    pub statistics: RunStatistics,
}

impl BamStatus {
    pub fn is_complete(&self) -> bool {
        self.sound && !self.interrupted
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    pub workers: usize,
    pub executors_created: usize,
    pub executors_finished: usize,
    /// Highest number of overlapping continuations seen on one executor
    pub max_concurrent_applies: usize,
    pub rejected_tasks: usize,
    pub pool_jobs: u64,
    pub skipped_jobs: u64,
    /// Cache lookups made during this run
    pub cache: CacheCounts,
    /// Entries dropped by `prepare_for_run`
    pub dropped_entries: usize,
    pub cache_entries: usize,
    pub elapsed: Duration,
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Parallel BAM statistics")?;
        writeln!(f, "  workers:                {}", self.workers)?;
        writeln!(
            f,
            "  executors:              {} created, {} finished",
            self.executors_created, self.executors_finished
        )?;
        writeln!(f, "  max concurrent applies: {}", self.max_concurrent_applies)?;
        writeln!(
            f,
            "  pool jobs:              {} ({} skipped, {} rejected)",
            self.pool_jobs, self.skipped_jobs, self.rejected_tasks
        )?;
        writeln!(
            f,
            "  cache lookups:          {} full, {} partial, {} miss",
            self.cache.full_hits, self.cache.partial_hits, self.cache.misses
        )?;
        writeln!(
            f,
            "  cache entries:          {} ({} dropped before run)",
            self.cache_entries, self.dropped_entries
        )?;
        write!(f, "  elapsed:                {:?}", self.elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_display() {
        let stats = RunStatistics {
            workers: 4,
            executors_created: 3,
            executors_finished: 3,
            max_concurrent_applies: 1,
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("3 created, 3 finished"));
        assert!(text.contains("max concurrent applies: 1"));
    }

    #[test]
    fn test_status_completeness() {
        let status = BamStatus {
            sound: true,
            target_found: false,
            interrupted: false,
            statistics: RunStatistics::default(),
        };
        assert!(status.is_complete());
        assert!(!BamStatus {
            sound: false,
            ..status
        }
        .is_complete());
    }
}
