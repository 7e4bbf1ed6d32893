//! Builds the ingestion stack from configuration.

use std::sync::Arc;

use hubcrawl::github::{
    OctocrabClient, PersonalAccessToken, QuotaLimiter, ThrottledGateway, parse_api_base,
};
use hubcrawl::persistence::{InMemoryRecordStore, RecordStores, SqliteRecordStore};
use hubcrawl::telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetrySink};
use hubcrawl::{HubcrawlConfig, IngestionService, IntakeError};
use tracing::warn;

use super::persistence_error;

/// Returns the telemetry sink selected by `--telemetry`.
pub fn telemetry_sink(config: &HubcrawlConfig) -> Arc<dyn TelemetrySink> {
    if config.telemetry {
        Arc::new(StderrJsonlTelemetrySink)
    } else {
        Arc::new(NoopTelemetrySink)
    }
}

/// Opens the configured record stores.
///
/// Without a database URL records are kept in memory and lost on exit.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] for a blank database URL.
pub fn record_stores(config: &HubcrawlConfig) -> Result<RecordStores, IntakeError> {
    match config.database_url.as_deref() {
        Some(database_url) => {
            let store = SqliteRecordStore::new(database_url)
                .map_err(|error| persistence_error(&error))?;
            Ok(RecordStores::shared(&Arc::new(store)))
        }
        None => {
            warn!("no database URL configured; ingested records will not be kept");
            Ok(RecordStores::shared(&Arc::new(InMemoryRecordStore::new())))
        }
    }
}

/// Builds an ingestion service talking to GitHub through one shared quota
/// limiter.
///
/// # Errors
///
/// Returns an error when the token is missing, the API base is invalid, the
/// Octocrab client cannot be built, or the page size is out of range.
pub fn ingestion_service(
    config: &HubcrawlConfig,
    telemetry: &Arc<dyn TelemetrySink>,
) -> Result<IngestionService, IntakeError> {
    let token = PersonalAccessToken::new(config.resolve_token()?)?;
    let api_base = parse_api_base(config.api_base.as_deref())?;
    let client = OctocrabClient::for_token(&token, &api_base)?;

    let limiter = Arc::new(QuotaLimiter::new(config.quota_settings()));
    let gateway = ThrottledGateway::new(
        client,
        limiter,
        config.retry_policy(),
        Arc::clone(telemetry),
    );

    Ok(IngestionService::new(
        Arc::new(gateway),
        record_stores(config)?,
        config.retry_policy(),
        Arc::clone(telemetry),
    )
    .with_settings(config.ingestion_settings()?))
}
