//! Scheduler configuration
//!
//! Two tiers, as elsewhere in the workspace:
//! - Preset: `BamConfig::from_preset(Preset::Fast)`
//! - Overrides: builder setters or versioned YAML
//!
//! ```rust,ignore
//! use parallel_bam::config::{BamConfig, Preset};
//!
//! let config = BamConfig::from_preset(Preset::Balanced).num_workers(8);
//! config.validate()?;
//!
//! let config = BamConfig::from_yaml_str("version: 1\npreset: fast\n")?;
//! ```

pub mod bam_config;
pub mod error;
pub mod io;
pub mod preset;

pub use bam_config::BamConfig;
pub use error::{ConfigError, ConfigResult};
pub use io::{BamConfigOverrides, ConfigExportV1};
pub use preset::Preset;
