//! Configuration I/O (YAML schema types)
//!
//! Loading and export live on [`super::BamConfig`].

use super::bam_config::BamConfig;
use crate::shared::models::Location;
use serde::{Deserialize, Serialize};

pub(crate) const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1); optional only so a missing field
    /// gets a dedicated error
    pub version: Option<u32>,

    /// Base preset
    pub preset: String,

    /// Fine-grained overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<BamConfigOverrides>,
}

/// Patch applied on top of a preset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BamConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_workers: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_grace_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_size_mb: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncached_block_entries: Option<Vec<Location>>,
}

impl BamConfigOverrides {
    /// Fields of `config` that differ from `base`
    pub fn diff(base: &BamConfig, config: &BamConfig) -> Self {
        fn changed<T: PartialEq + Clone>(base: &T, value: &T) -> Option<T> {
            (base != value).then(|| value.clone())
        }

        Self {
            num_workers: changed(&base.num_workers, &config.num_workers),
            timeout_ms: changed(&base.timeout_ms, &config.timeout_ms),
            settle_grace_ms: changed(&base.settle_grace_ms, &config.settle_grace_ms),
            stack_size_mb: changed(&base.stack_size_mb, &config.stack_size_mb),
            thread_name_prefix: changed(&base.thread_name_prefix, &config.thread_name_prefix),
            uncached_block_entries: changed(
                &base.uncached_block_entries,
                &config.uncached_block_entries,
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
