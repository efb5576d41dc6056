//! Prometheus metrics for block executors

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

#[derive(Clone)]
pub struct SchedulerMetrics {
    pub executors_created: IntCounter,
    pub executors_finished: IntCounter,
    pub active_executors: IntGauge,
    pub rejected_tasks: IntCounter,
    pub apply_duration: Histogram,
    pub executor_lifetime: Histogram,
}

impl SchedulerMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            executors_created: register_int_counter_with_registry!(
                Opts::new("bam_executors_created_total", "Block executors created"),
                registry
            )?,
            executors_finished: register_int_counter_with_registry!(
                Opts::new("bam_executors_finished_total", "Block executors finalized"),
                registry
            )?,
            active_executors: register_int_gauge_with_registry!(
                Opts::new("bam_active_executors", "Block executors in the live registry"),
                registry
            )?,
            rejected_tasks: register_int_counter_with_registry!(
                Opts::new(
                    "bam_rejected_tasks_total",
                    "Continuations rejected by a shut-down pool"
                ),
                registry
            )?,
            apply_duration: register_histogram_with_registry!(
                HistogramOpts::new(
                    "bam_apply_duration_seconds",
                    "Time spent in one executor continuation"
                )
                .buckets(vec![0.0001, 0.001, 0.01, 0.1, 1.0, 10.0]),
                registry
            )?,
            executor_lifetime: register_histogram_with_registry!(
                HistogramOpts::new(
                    "bam_executor_lifetime_seconds",
                    "Wall time from executor creation to finalization"
                )
                .buckets(vec![0.001, 0.01, 0.1, 1.0, 10.0, 100.0]),
                registry
            )?,
        })
    }
}
