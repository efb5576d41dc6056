//! Prometheus metrics for the block cache

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

/// Block cache metrics
#[derive(Clone)]
pub struct CacheMetrics {
    pub misses: IntCounter,
    pub partial_hits: IntCounter,
    pub full_hits: IntCounter,
    pub inserts: IntCounter,
    pub inconsistencies: IntCounter,
    pub entries: IntGauge,
}

impl CacheMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            misses: register_int_counter_with_registry!(
                Opts::new("bam_cache_misses_total", "Block cache misses"),
                registry
            )?,
            partial_hits: register_int_counter_with_registry!(
                Opts::new(
                    "bam_cache_partial_hits_total",
                    "Block cache hits on entries without exit states"
                ),
                registry
            )?,
            full_hits: register_int_counter_with_registry!(
                Opts::new("bam_cache_full_hits_total", "Block cache hits with exit states"),
                registry
            )?,
            inserts: register_int_counter_with_registry!(
                Opts::new("bam_cache_inserts_total", "Block cache entries created"),
                registry
            )?,
            inconsistencies: register_int_counter_with_registry!(
                Opts::new(
                    "bam_cache_inconsistent_exit_states_total",
                    "Rejected attempts to overwrite exit states with a different set"
                ),
                registry
            )?,
            entries: register_int_gauge_with_registry!(
                Opts::new("bam_cache_entries", "Block cache entry count"),
                registry
            )?,
        })
    }

    /// Full hits over all lookups
    pub fn hit_rate(&self) -> f64 {
        let hits = self.full_hits.get() as f64;
        let total = hits + self.partial_hits.get() as f64 + self.misses.get() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> CacheCounts {
        CacheCounts {
            misses: self.misses.get(),
            partial_hits: self.partial_hits.get(),
            full_hits: self.full_hits.get(),
        }
    }
}

/// Point-in-time lookup counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounts {
    pub misses: u64,
    pub partial_hits: u64,
    pub full_hits: u64,
}

impl CacheCounts {
    /// Counts accumulated since `earlier`
    pub fn since(&self, earlier: &CacheCounts) -> CacheCounts {
        CacheCounts {
            misses: self.misses.saturating_sub(earlier.misses),
            partial_hits: self.partial_hits.saturating_sub(earlier.partial_hits),
            full_hits: self.full_hits.saturating_sub(earlier.full_hits),
        }
    }
}
