//! Octocrab implementation of [`GitHubClient`].

use async_trait::async_trait;
use http::Uri;
use http::header::LINK;
use octocrab::Octocrab;
use octocrab::service::middleware::retry::RetryConfig;
use serde::de::DeserializeOwned;
use url::Url;

use crate::github::error::IntakeError;
use crate::github::locator::{PersonalAccessToken, RepositoryLocator, UserLogin};
use crate::github::models::{
    ApiIssue, ApiPullRequest, ApiRepository, ApiUser, Issue, PullRequest, Repository, User,
    issues_only,
};
use crate::github::pagination::{Listing, PageRequest};
use crate::github::rate_limit::RateLimitInfo;

use super::error_mapping::{map_http_error, map_octocrab_error};
use super::http_utils::{extract_github_message, has_next_link};
use super::{GitHubClient, Quoted};

/// Decoded response body with the headers the gateway cares about.
struct Fetched<T> {
    body: T,
    quota: Option<RateLimitInfo>,
    has_next: bool,
}

/// Octocrab-backed GitHub client.
pub struct OctocrabClient {
    client: Octocrab,
}

impl OctocrabClient {
    /// Creates a new client from an Octocrab instance.
    #[must_use]
    pub const fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Builds an authenticated client for the given API base.
    ///
    /// Octocrab's own retry layer is disabled so that every retry goes through
    /// the quota limiter.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidUrl` when the base URI cannot be parsed or
    /// `IntakeError::Api` when Octocrab fails to construct a client.
    pub fn for_token(token: &PersonalAccessToken, api_base: &Url) -> Result<Self, IntakeError> {
        let base_uri: Uri = api_base
            .as_str()
            .parse::<Uri>()
            .map_err(|error| IntakeError::InvalidUrl(error.to_string()))?;

        let octocrab = Octocrab::builder()
            .add_retry_config(RetryConfig::None)
            .personal_token(token.as_ref())
            .base_uri(base_uri)
            .map_err(|error| IntakeError::Api {
                status: None,
                message: format!("build client failed: {error}"),
            })?
            .build()
            .map_err(|error| map_octocrab_error("build client", &error))?;

        Ok(Self::new(octocrab))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
    ) -> Result<Fetched<T>, IntakeError> {
        let uri: Uri = path
            .parse::<Uri>()
            .map_err(|error| IntakeError::InvalidUrl(error.to_string()))?;

        let response = self
            .client
            ._get_with_headers(uri, None)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))?;

        let status = response.status();
        let quota = RateLimitInfo::from_headers(response.headers());
        let has_next = has_next_link(response.headers().get(LINK));

        if !status.is_success() {
            let body = self
                .client
                .body_to_string(response)
                .await
                .unwrap_or_else(|_| String::new());
            return Err(map_http_error(
                operation,
                status,
                extract_github_message(&body),
                quota,
            ));
        }

        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(|error| IntakeError::Network {
                message: format!("{operation} response read failed: {error}"),
            })?;

        let decoded: T = serde_json::from_str(&body).map_err(|error| IntakeError::Api {
            status: Some(status.as_u16()),
            message: format!("{operation} response deserialisation failed: {error}"),
        })?;

        Ok(Fetched {
            body: decoded,
            quota,
            has_next,
        })
    }
}

#[async_trait]
impl GitHubClient for OctocrabClient {
    async fn get_repository(
        &self,
        locator: &RepositoryLocator,
    ) -> Result<Quoted<Repository>, IntakeError> {
        let fetched: Fetched<ApiRepository> = self
            .fetch("get repository", &locator.repository_path())
            .await?;
        Ok(Quoted::new(fetched.body.into(), fetched.quota))
    }

    async fn get_issues(
        &self,
        locator: &RepositoryLocator,
        page: PageRequest,
    ) -> Result<Quoted<Listing<Issue>>, IntakeError> {
        let fetched: Fetched<Vec<ApiIssue>> =
            self.fetch("get issues", &locator.issues_path(page)).await?;
        let listing = Listing::new(issues_only(fetched.body), fetched.has_next);
        Ok(Quoted::new(listing, fetched.quota))
    }

    async fn get_pull_requests(
        &self,
        locator: &RepositoryLocator,
        page: PageRequest,
    ) -> Result<Quoted<Listing<PullRequest>>, IntakeError> {
        let fetched: Fetched<Vec<ApiPullRequest>> = self
            .fetch("get pull requests", &locator.pulls_path(page))
            .await?;
        let items = fetched.body.into_iter().map(PullRequest::from).collect();
        Ok(Quoted::new(
            Listing::new(items, fetched.has_next),
            fetched.quota,
        ))
    }

    async fn get_user(&self, login: &UserLogin) -> Result<Quoted<User>, IntakeError> {
        let fetched: Fetched<ApiUser> = self.fetch("get user", &login.user_path()).await?;
        Ok(Quoted::new(fetched.body.into(), fetched.quota))
    }
}
