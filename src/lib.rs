pub mod communication; // Finding buckets, message bodies, delivery seam
pub mod config;
pub mod detectors; // Studies, interconsultations, excluded/ambulatory practices, endoscopies
pub mod error;
pub mod models;
pub mod pipeline;

use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::models::{AuditInput, AuditResult};
use crate::pipeline::AuditEngine;

/// Install the global subscriber. Logs go to stderr so stdout can carry
/// machine-readable output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Audit one document with the built-in configuration.
pub fn audit(input: &AuditInput, today: NaiveDate) -> Result<AuditResult, AuditError> {
    AuditEngine::new(AuditConfig::default())?.audit(input, today)
}
