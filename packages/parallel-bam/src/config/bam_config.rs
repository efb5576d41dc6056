//! Scheduler configuration

use super::error::{ConfigError, ConfigResult};
use super::io::{BamConfigOverrides, ConfigExportV1, SUPPORTED_VERSIONS};
use super::preset::Preset;
use crate::shared::models::Location;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parallel scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BamConfig {
    /// Preset the values were derived from
    pub preset: Preset,

    /// Number of pool workers (0=auto, 0..=256)
    pub num_workers: usize,

    /// Wall-clock budget for one run in milliseconds (1..=86_400_000)
    pub timeout_ms: u64,

    /// Per-executor wait after pool termination in milliseconds (0..=60_000)
    pub settle_grace_ms: u64,

    /// Worker thread stack size in MB (1..=64)
    pub stack_size_mb: usize,

    /// Worker thread name prefix
    pub thread_name_prefix: String,

    /// Block entries the algorithm inlines instead of summarizing
    pub uncached_block_entries: Vec<Location>,
}

impl BamConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                preset,
                num_workers: 0, // Auto
                timeout_ms: 60_000,
                settle_grace_ms: 100,
                stack_size_mb: 8,
                thread_name_prefix: "bam-worker".to_string(),
                uncached_block_entries: Vec::new(),
            },
            Preset::Balanced => Self {
                preset,
                num_workers: 0, // Auto
                timeout_ms: 900_000,
                settle_grace_ms: 1_000,
                stack_size_mb: 8,
                thread_name_prefix: "bam-worker".to_string(),
                uncached_block_entries: Vec::new(),
            },
            Preset::Thorough => Self {
                preset,
                num_workers: 0, // Auto
                timeout_ms: 21_600_000,
                settle_grace_ms: 5_000,
                stack_size_mb: 16,
                thread_name_prefix: "bam-worker".to_string(),
                uncached_block_entries: Vec::new(),
            },
            Preset::Custom => Self {
                preset,
                ..Self::from_preset(Preset::Balanced)
            },
        }
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn settle_grace(mut self, grace: Duration) -> Self {
        self.settle_grace_ms = grace.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn stack_size_mb(mut self, mb: usize) -> Self {
        self.stack_size_mb = mb;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn uncached_block_entry(mut self, location: Location) -> Self {
        if !self.uncached_block_entries.contains(&location) {
            self.uncached_block_entries.push(location);
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_workers > 256 {
            return Err(ConfigError::range_with_hint(
                "num_workers",
                self.num_workers,
                0,
                256,
                "Number of workers must be reasonable (0=auto)",
            ));
        }

        if self.timeout_ms < 1 || self.timeout_ms > 86_400_000 {
            return Err(ConfigError::range_with_hint(
                "timeout_ms",
                self.timeout_ms,
                1,
                86_400_000,
                "Timeout must be positive and at most one day",
            ));
        }

        if self.settle_grace_ms > 60_000 {
            return Err(ConfigError::range_with_hint(
                "settle_grace_ms",
                self.settle_grace_ms,
                0,
                60_000,
                "Settle grace is a per-executor wait; keep it short",
            ));
        }

        if self.stack_size_mb < 1 || self.stack_size_mb > 64 {
            return Err(ConfigError::range_with_hint(
                "stack_size_mb",
                self.stack_size_mb,
                1,
                64,
                "Stack size must be reasonable",
            ));
        }

        Ok(())
    }

    /// Worker count with `0` resolved to the number of CPUs
    pub fn effective_workers(&self) -> usize {
        if self.num_workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.num_workers
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle_grace_duration(&self) -> Duration {
        Duration::from_millis(self.settle_grace_ms)
    }

    /// Load from versioned YAML (`version: 1`, preset + overrides)
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(yaml)?;

        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = Preset::from_str(&export.preset)?;
        let mut config = Self::from_preset(preset);
        if let Some(overrides) = export.overrides {
            config = config.apply_overrides(overrides);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml(path: impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Export as versioned YAML; only values that differ from the preset are written
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let base = Self::from_preset(self.preset);
        let overrides = BamConfigOverrides::diff(&base, self);

        let export = ConfigExportV1 {
            version: Some(1),
            preset: self.preset.as_str().to_string(),
            overrides: (!overrides.is_empty()).then_some(overrides),
        };

        Ok(serde_yaml::to_string(&export)?)
    }

    pub fn apply_overrides(mut self, overrides: BamConfigOverrides) -> Self {
        if let Some(v) = overrides.num_workers {
            self.num_workers = v;
        }
        if let Some(v) = overrides.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = overrides.settle_grace_ms {
            self.settle_grace_ms = v;
        }
        if let Some(v) = overrides.stack_size_mb {
            self.stack_size_mb = v;
        }
        if let Some(v) = overrides.thread_name_prefix {
            self.thread_name_prefix = v;
        }
        if let Some(v) = overrides.uncached_block_entries {
            self.uncached_block_entries = v;
        }
        self
    }
}

impl Default for BamConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}
