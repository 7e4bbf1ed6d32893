//! Quota-aware access to GitHub.
//!
//! [`ThrottledGateway`] composes the shared [`QuotaLimiter`], a
//! [`RetryPolicy`] and telemetry around a [`GitHubClient`]. Every attempt
//! claims a quota slot first, so retries are throttled like any other call.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::github::client::{GitHubClient, Quoted};
use crate::github::error::IntakeError;
use crate::github::locator::{RepositoryLocator, UserLogin};
use crate::github::models::{Issue, PullRequest, Repository, User};
use crate::github::pagination::{Listing, PageRequest};
use crate::github::quota::QuotaLimiter;
use crate::github::retry::RetryPolicy;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Rate-limited, retrying access to the GitHub records hubcrawl ingests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubGateway: Send + Sync {
    /// Fetch repository metadata.
    async fn get_repository(
        &self,
        locator: &RepositoryLocator,
        cancel: &CancellationToken,
    ) -> Result<Repository, IntakeError>;

    /// Fetch one page of issues, excluding pull requests.
    async fn get_issues(
        &self,
        locator: &RepositoryLocator,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Listing<Issue>, IntakeError>;

    /// Fetch one page of pull requests.
    async fn get_pull_requests(
        &self,
        locator: &RepositoryLocator,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Listing<PullRequest>, IntakeError>;

    /// Fetch a user profile.
    async fn get_user(
        &self,
        login: &UserLogin,
        cancel: &CancellationToken,
    ) -> Result<User, IntakeError>;
}

/// Gateway that throttles, retries and measures every client call.
pub struct ThrottledGateway<C> {
    client: C,
    limiter: Arc<QuotaLimiter>,
    retry: RetryPolicy,
    telemetry: Arc<dyn TelemetrySink>,
}

impl<C: GitHubClient> ThrottledGateway<C> {
    /// Wraps `client` with the shared limiter and a retry policy.
    #[must_use]
    pub fn new(
        client: C,
        limiter: Arc<QuotaLimiter>,
        retry: RetryPolicy,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            client,
            limiter,
            retry,
            telemetry,
        }
    }

    async fn throttled<T, F, Fut>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, IntakeError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Quoted<T>, IntakeError>>,
    {
        let call_ref = &call;
        self.retry
            .run(cancel, move || async move {
                self.limiter.acquire(cancel).await?;

                let started = Instant::now();
                let outcome = call_ref().await;
                self.telemetry.record(TelemetryEvent::ApiRequest {
                    operation: operation.to_owned(),
                    latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                });

                match outcome {
                    Ok(quoted) => {
                        if let Some(hint) = quoted.quota {
                            self.limiter.apply_quota_hint(&hint);
                        }
                        Ok(quoted.value)
                    }
                    Err(error) => {
                        debug!(operation, "GitHub call failed: {error}");
                        self.telemetry.record(TelemetryEvent::ApiError {
                            operation: operation.to_owned(),
                            message: error.to_string(),
                        });
                        Err(error)
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl<C: GitHubClient> GitHubGateway for ThrottledGateway<C> {
    async fn get_repository(
        &self,
        locator: &RepositoryLocator,
        cancel: &CancellationToken,
    ) -> Result<Repository, IntakeError> {
        self.throttled("get_repository", cancel, || {
            self.client.get_repository(locator)
        })
        .await
    }

    async fn get_issues(
        &self,
        locator: &RepositoryLocator,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Listing<Issue>, IntakeError> {
        self.throttled("get_issues", cancel, || {
            self.client.get_issues(locator, page)
        })
        .await
    }

    async fn get_pull_requests(
        &self,
        locator: &RepositoryLocator,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Listing<PullRequest>, IntakeError> {
        self.throttled("get_pull_requests", cancel, || {
            self.client.get_pull_requests(locator, page)
        })
        .await
    }

    async fn get_user(
        &self,
        login: &UserLogin,
        cancel: &CancellationToken,
    ) -> Result<User, IntakeError> {
        self.throttled("get_user", cancel, || self.client.get_user(login))
            .await
    }
}
