//! Remote GitHub REST client.
//!
//! [`GitHubClient`] issues exactly one HTTP call per method and returns the
//! translated domain value together with the quota hint carried by the
//! response. Throttling and retries are layered on top by
//! [`ThrottledGateway`](super::gateway::ThrottledGateway).

mod error_mapping;
mod http_utils;
mod octocrab_client;

pub use octocrab_client::OctocrabClient;
pub(crate) use error_mapping::map_persistence_error;

use async_trait::async_trait;

use crate::github::error::IntakeError;
use crate::github::locator::{RepositoryLocator, UserLogin};
use crate::github::models::{Issue, PullRequest, Repository, User};
use crate::github::pagination::{Listing, PageRequest};
use crate::github::rate_limit::RateLimitInfo;

/// A value returned by GitHub alongside the quota it reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quoted<T> {
    /// Translated response body.
    pub value: T,
    /// Quota hint from the `X-RateLimit-*` headers, when present.
    pub quota: Option<RateLimitInfo>,
}

impl<T> Quoted<T> {
    /// Wraps a value with its quota hint.
    #[must_use]
    pub const fn new(value: T, quota: Option<RateLimitInfo>) -> Self {
        Self { value, quota }
    }
}

/// Single-call access to the GitHub REST API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// Fetch repository metadata.
    async fn get_repository(
        &self,
        locator: &RepositoryLocator,
    ) -> Result<Quoted<Repository>, IntakeError>;

    /// Fetch one page of issues, newest first, excluding pull requests.
    async fn get_issues(
        &self,
        locator: &RepositoryLocator,
        page: PageRequest,
    ) -> Result<Quoted<Listing<Issue>>, IntakeError>;

    /// Fetch one page of pull requests, newest first.
    async fn get_pull_requests(
        &self,
        locator: &RepositoryLocator,
        page: PageRequest,
    ) -> Result<Quoted<Listing<PullRequest>>, IntakeError>;

    /// Fetch a user profile.
    async fn get_user(&self, login: &UserLogin) -> Result<Quoted<User>, IntakeError>;
}
