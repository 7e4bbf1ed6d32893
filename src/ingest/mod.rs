//! Synchronous ingestion of single GitHub entities.
//!
//! [`IngestionService`] fetches records through a [`GitHubGateway`], stamps
//! issues and pull requests with their repository id, and saves each record
//! through the configured stores. Collections are best-effort: a record that
//! cannot be saved is logged and skipped, and the whole fetched set is still
//! returned. Single entities are all-or-nothing.

use std::future::Future;
use std::sync::Arc;

use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::github::client::map_persistence_error;
use crate::github::error::IntakeError;
use crate::github::gateway::GitHubGateway;
use crate::github::locator::{RepositoryLocator, UserLogin};
use crate::github::models::{Issue, PullRequest, Repository, User};
use crate::github::pagination::{Listing, MAX_PER_PAGE, PageRequest};
use crate::github::retry::RetryPolicy;
use crate::persistence::{PersistenceError, RecordStores};
use crate::telemetry::{RecordKind, TelemetryEvent, TelemetrySink};

/// Pagination limits for collection ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionSettings {
    /// Records requested per page, between 1 and 100.
    pub page_size: u8,
    /// Maximum number of pages fetched per collection. Zero is treated as one.
    pub max_pages: u32,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            page_size: MAX_PER_PAGE,
            max_pages: 1,
        }
    }
}

/// Fetches GitHub records and persists them.
#[derive(Clone)]
pub struct IngestionService {
    gateway: Arc<dyn GitHubGateway>,
    stores: RecordStores,
    save_retry: RetryPolicy,
    telemetry: Arc<dyn TelemetrySink>,
    settings: IngestionSettings,
}

impl IngestionService {
    /// Creates a service. `save_retry` governs retries of storage writes.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn GitHubGateway>,
        stores: RecordStores,
        save_retry: RetryPolicy,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            gateway,
            stores,
            save_retry,
            telemetry,
            settings: IngestionSettings::default(),
        }
    }

    /// Replaces the pagination settings.
    #[must_use]
    pub const fn with_settings(mut self, settings: IngestionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Fetches a repository and saves it.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] for a blank owner or name, or the
    /// fetch or save failure.
    pub async fn parse_repository(
        &self,
        owner: &str,
        repository: &str,
        cancel: &CancellationToken,
    ) -> Result<Repository, IntakeError> {
        let locator = RepositoryLocator::new(owner, repository)?;
        let fetched = self.gateway.get_repository(&locator, cancel).await?;
        self.record_parsed(RecordKind::Repository, 1);

        let store = Arc::clone(&self.stores.repositories);
        let record = fetched.clone();
        self.save_with_retry("save repository", cancel, move || {
            store.save_repository(&record)
        })
        .await?;
        self.record_saved(RecordKind::Repository, 1);

        Ok(fetched)
    }

    /// Fetches a repository's issues, excluding pull requests, and saves
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] for a blank owner or name, or a
    /// fetch failure. Save failures are logged and skipped.
    pub async fn parse_issues(
        &self,
        owner: &str,
        repository: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Issue>, IntakeError> {
        let locator = RepositoryLocator::new(owner, repository)?;
        let parent = self.gateway.get_repository(&locator, cancel).await?;

        let gateway = &self.gateway;
        let locator_ref = &locator;
        let mut issues = self
            .collect_pages(|page| gateway.get_issues(locator_ref, page, cancel))
            .await?;
        for issue in &mut issues {
            issue.repository_id = parent.id;
        }
        self.record_parsed(RecordKind::Issue, issues.len());

        let mut saved = 0_usize;
        for issue in &issues {
            let store = Arc::clone(&self.stores.issues);
            let record = issue.clone();
            match self
                .save_with_retry("save issue", cancel, move || store.save_issue(&record))
                .await
            {
                Ok(()) => saved += 1,
                Err(error) => warn!(issue_id = issue.id, "skipping issue: {error}"),
            }
        }
        self.record_saved(RecordKind::Issue, saved);

        Ok(issues)
    }

    /// Fetches a repository's pull requests and saves them.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] for a blank owner or name, or a
    /// fetch failure. Save failures are logged and skipped.
    pub async fn parse_pull_requests(
        &self,
        owner: &str,
        repository: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<PullRequest>, IntakeError> {
        let locator = RepositoryLocator::new(owner, repository)?;
        let parent = self.gateway.get_repository(&locator, cancel).await?;

        let gateway = &self.gateway;
        let locator_ref = &locator;
        let mut pull_requests = self
            .collect_pages(|page| gateway.get_pull_requests(locator_ref, page, cancel))
            .await?;
        for pull_request in &mut pull_requests {
            pull_request.repository_id = parent.id;
        }
        self.record_parsed(RecordKind::PullRequest, pull_requests.len());

        let mut saved = 0_usize;
        for pull_request in &pull_requests {
            let store = Arc::clone(&self.stores.pull_requests);
            let record = pull_request.clone();
            match self
                .save_with_retry("save pull request", cancel, move || {
                    store.save_pull_request(&record)
                })
                .await
            {
                Ok(()) => saved += 1,
                Err(error) => {
                    warn!(pull_request_id = pull_request.id, "skipping pull request: {error}");
                }
            }
        }
        self.record_saved(RecordKind::PullRequest, saved);

        Ok(pull_requests)
    }

    /// Fetches a user profile and saves it.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] for a blank login, or the fetch
    /// or save failure.
    pub async fn parse_user(
        &self,
        login: &str,
        cancel: &CancellationToken,
    ) -> Result<User, IntakeError> {
        let user_login = UserLogin::new(login)?;
        let fetched = self.gateway.get_user(&user_login, cancel).await?;
        self.record_parsed(RecordKind::User, 1);

        let store = Arc::clone(&self.stores.users);
        let record = fetched.clone();
        self.save_with_retry("save user", cancel, move || store.save_user(&record))
            .await?;
        self.record_saved(RecordKind::User, 1);

        Ok(fetched)
    }

    async fn collect_pages<T, F, Fut>(&self, fetch: F) -> Result<Vec<T>, IntakeError>
    where
        F: Fn(PageRequest) -> Fut,
        Fut: Future<Output = Result<Listing<T>, IntakeError>>,
    {
        let mut page = PageRequest::new(1, self.settings.page_size)?;
        let mut collected = Vec::new();

        for _ in 0..self.settings.max_pages.max(1) {
            let listing = fetch(page).await?;
            collected.extend(listing.items);
            if !listing.has_next {
                break;
            }
            debug!(page = page.page(), "fetching next page");
            page = page.next();
        }

        Ok(collected)
    }

    /// Runs a synchronous store write on the blocking pool under the save
    /// retry policy, one blocking task per attempt.
    async fn save_with_retry<F>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        write: F,
    ) -> Result<(), IntakeError>
    where
        F: Fn() -> Result<(), PersistenceError> + Send + Sync + 'static,
    {
        let shared_write = Arc::new(write);
        self.save_retry
            .run(cancel, || {
                let attempt = Arc::clone(&shared_write);
                async move {
                    match spawn_blocking(move || attempt()).await {
                        Ok(result) => {
                            result.map_err(|error| map_persistence_error(operation, &error))
                        }
                        Err(error) => Err(IntakeError::Persistence {
                            message: format!("{operation}: storage task failed: {error}"),
                            transient: false,
                        }),
                    }
                }
            })
            .await
    }

    fn record_parsed(&self, kind: RecordKind, count: usize) {
        self.telemetry.record(TelemetryEvent::RecordsParsed {
            kind,
            count: u64::try_from(count).unwrap_or(u64::MAX),
        });
    }

    fn record_saved(&self, kind: RecordKind, count: usize) {
        self.telemetry.record(TelemetryEvent::RecordsSaved {
            kind,
            count: u64::try_from(count).unwrap_or(u64::MAX),
        });
    }
}
