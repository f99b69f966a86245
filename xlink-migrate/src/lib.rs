//! Versioned schema migrations for persisted chain-link records.
//!
//! [`pipeline`] holds the generic pass/step/driver machinery and [`steps`]
//! the concrete migrations from schema v1 to [`steps::LATEST_SCHEMA_VERSION`].

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod steps;

use xlink_storage::traits::BatchWriter;

use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::pipeline::{Migrator, StepReport};

/// A migrator carrying every known step.
pub fn standard_migrator<S: BatchWriter>(store: S) -> Migrator<S> {
    Migrator::new(store, steps::standard_steps())
}

/// Open the configured store and migrate it to the configured target.
pub fn run_from_config(config: &MigrationConfig) -> Result<Vec<StepReport>, MigrationError> {
    logging::init_logging(&config.logging);
    let migrator = standard_migrator(config.open_store()?);
    let target = config
        .target_version
        .unwrap_or_else(|| migrator.latest_version());
    migrator.run_to(target)
}
