//! Common test utilities for parallel-bam
//!
//! Toy domain, program fixtures, engine builders and assertions shared by
//! the integration tests.

#![allow(dead_code)]
#![allow(unused_imports)]

mod assertions;
mod builders;
mod fixtures;
mod toy;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use toy::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` overrides the default `warn`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
