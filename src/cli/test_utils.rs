//! Shared test utilities for CLI tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hubcrawl::github::models::test_support::{
    sample_issue, sample_pull_request, sample_repository, sample_user,
};
use hubcrawl::github::{
    GitHubGateway, Issue, Listing, PageRequest, PullRequest, Repository, RepositoryLocator, User,
    UserLogin,
};
use hubcrawl::persistence::{InMemoryRecordStore, RecordStores};
use hubcrawl::telemetry::NoopTelemetrySink;
use hubcrawl::{IngestionService, IntakeError, RetryPolicy};
use tokio_util::sync::CancellationToken;

/// A gateway serving fixed records for `octo/cat` and recording every
/// requested repository.
#[derive(Clone, Default)]
pub struct FixtureGateway {
    /// `owner/name` of each repository lookup, in call order.
    pub requested: Arc<Mutex<Vec<String>>>,
    /// Error returned by issue listings, when set.
    pub issues_error: Option<IntakeError>,
    /// Owner login reported for every repository, when set.
    pub canonical_owner: Option<String>,
}

#[async_trait]
impl GitHubGateway for FixtureGateway {
    async fn get_repository(
        &self,
        locator: &RepositoryLocator,
        _cancel: &CancellationToken,
    ) -> Result<Repository, IntakeError> {
        self.requested
            .lock()
            .expect("requested mutex should be available")
            .push(locator.full_name());
        let owner = self
            .canonical_owner
            .as_deref()
            .unwrap_or_else(|| locator.owner().as_str());
        let mut repository = sample_repository(7, owner, locator.repository().as_str());
        repository.stargazers_count = 42;
        Ok(repository)
    }

    async fn get_issues(
        &self,
        _locator: &RepositoryLocator,
        _page: PageRequest,
        _cancel: &CancellationToken,
    ) -> Result<Listing<Issue>, IntakeError> {
        match &self.issues_error {
            Some(error) => Err(error.clone()),
            None => Ok(Listing::new(
                vec![sample_issue(70, 1, 0), sample_issue(71, 2, 0)],
                false,
            )),
        }
    }

    async fn get_pull_requests(
        &self,
        _locator: &RepositoryLocator,
        _page: PageRequest,
        _cancel: &CancellationToken,
    ) -> Result<Listing<PullRequest>, IntakeError> {
        Ok(Listing::new(vec![sample_pull_request(90, 3, 0)], false))
    }

    async fn get_user(
        &self,
        login: &UserLogin,
        _cancel: &CancellationToken,
    ) -> Result<User, IntakeError> {
        Ok(sample_user(11, login.as_str()))
    }
}

/// Builds an ingestion service over `gateway` and a fresh in-memory store.
pub fn fixture_service(gateway: FixtureGateway) -> (IngestionService, Arc<InMemoryRecordStore>) {
    let store = Arc::new(InMemoryRecordStore::new());
    let service = IngestionService::new(
        Arc::new(gateway),
        RecordStores::shared(&store),
        RetryPolicy::default(),
        Arc::new(NoopTelemetrySink),
    );
    (service, store)
}

/// Decodes captured CLI output.
pub fn utf8(buffer: Vec<u8>) -> String {
    String::from_utf8(buffer).expect("output should be valid UTF-8")
}
