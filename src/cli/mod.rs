//! CLI operation mode handlers.
//!
//! - [`crawl`]: background crawl job with status polling
//! - [`listing`]: print stored records
//! - [`migrations`]: database schema migrations
//! - [`parse`]: synchronous repository and user ingestion
//!
//! Stack wiring lives in [`services`] and output formatting in [`output`].

use hubcrawl::IntakeError;
use hubcrawl::persistence::PersistenceError;

pub mod crawl;
pub mod listing;
pub mod migrations;
pub mod output;
pub mod parse;
pub mod services;

#[cfg(test)]
pub(crate) mod test_utils;

/// Maps a persistence error to an intake error.
///
/// Configuration problems (missing or blank URL, unmigrated schema) become
/// [`IntakeError::Configuration`]; runtime failures become
/// [`IntakeError::Io`].
pub fn persistence_error(error: &PersistenceError) -> IntakeError {
    if is_configuration_error(error) {
        IntakeError::Configuration {
            message: error.to_string(),
        }
    } else {
        IntakeError::Io {
            message: error.to_string(),
        }
    }
}

const fn is_configuration_error(error: &PersistenceError) -> bool {
    matches!(
        error,
        PersistenceError::MissingDatabaseUrl
            | PersistenceError::BlankDatabaseUrl
            | PersistenceError::SchemaNotInitialised
    )
}
