//! Database migration operation.

use std::io::{self, Write};

use hubcrawl::persistence::migrate_database;
use hubcrawl::{HubcrawlConfig, IntakeError};

use super::output::io_error;
use super::persistence_error;
use super::services::telemetry_sink;

/// Creates or upgrades the record tables and prints the schema version.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] if the database URL is missing or blank.
/// Returns [`IntakeError::Io`] for connection or migration failures.
pub fn run(config: &HubcrawlConfig) -> Result<(), IntakeError> {
    let mut stdout = io::stdout().lock();
    run_with_writer(config, &mut stdout)
}

/// Runs migrations, writing the resulting schema version to `writer`.
///
/// This function is exposed for testing against temporary databases.
pub fn run_with_writer<W: Write>(
    config: &HubcrawlConfig,
    writer: &mut W,
) -> Result<(), IntakeError> {
    let database_url = config.require_database_url()?;
    let telemetry = telemetry_sink(config);

    let schema_version = migrate_database(database_url, telemetry.as_ref())
        .map_err(|error| persistence_error(&error))?;
    writeln!(writer, "Database schema at version {}", schema_version.as_str())
        .map_err(|error| io_error(&error))
}
