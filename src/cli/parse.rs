//! Synchronous ingestion of one repository or one user.

use std::io::{self, Write};

use hubcrawl::{HubcrawlConfig, IngestionService, IntakeError};
use tokio_util::sync::CancellationToken;

use super::output::{write_collection_count, write_repository_summary, write_user_summary};
use super::services::{ingestion_service, telemetry_sink};

/// Parses the configured repository and, when requested, its issues, pull
/// requests and owner profile.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] if required configuration is
/// missing, or the first ingestion failure.
pub async fn run_repository(config: &HubcrawlConfig) -> Result<(), IntakeError> {
    let telemetry = telemetry_sink(config);
    let service = ingestion_service(config, &telemetry)?;
    let mut stdout = io::stdout().lock();
    parse_repository_with(&service, config, &mut stdout).await
}

/// Parses the configured user.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] if no login is configured, or the
/// ingestion failure.
pub async fn run_user(config: &HubcrawlConfig) -> Result<(), IntakeError> {
    let telemetry = telemetry_sink(config);
    let service = ingestion_service(config, &telemetry)?;
    let mut stdout = io::stdout().lock();
    parse_user_with(&service, config, &mut stdout).await
}

/// Runs a repository parse through `service`, writing summaries to
/// `writer`.
///
/// This function is exposed for testing with fixture gateways.
pub async fn parse_repository_with<W: Write>(
    service: &IngestionService,
    config: &HubcrawlConfig,
    writer: &mut W,
) -> Result<(), IntakeError> {
    let (owner, repo) = config.require_repository_info()?;
    let cancel = CancellationToken::new();

    let repository = service.parse_repository(owner, repo, &cancel).await?;
    write_repository_summary(writer, &repository)?;

    if config.issues {
        let issues = service.parse_issues(owner, repo, &cancel).await?;
        write_collection_count(writer, "issues", issues.len())?;
    }

    if config.pull_requests {
        let pull_requests = service.parse_pull_requests(owner, repo, &cancel).await?;
        write_collection_count(writer, "pull requests", pull_requests.len())?;
    }

    if config.users {
        let user = service
            .parse_user(&repository.owner_login, &cancel)
            .await?;
        write_user_summary(writer, &user)?;
    }

    Ok(())
}

/// Runs a user parse through `service`, writing the summary to `writer`.
///
/// This function is exposed for testing with fixture gateways.
pub async fn parse_user_with<W: Write>(
    service: &IngestionService,
    config: &HubcrawlConfig,
    writer: &mut W,
) -> Result<(), IntakeError> {
    let login = config.require_login()?;
    let user = service
        .parse_user(login, &CancellationToken::new())
        .await?;
    write_user_summary(writer, &user)
}
