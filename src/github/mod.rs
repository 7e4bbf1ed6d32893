//! Rate-limited access to the GitHub REST API.
//!
//! The layers, from the wire up:
//!
//! - [`client`] issues one HTTP call through Octocrab and translates the
//!   response into a domain record plus the quota hint from its headers.
//! - [`quota`] holds the process-wide request budget.
//! - [`retry`] re-runs transient failures with exponential backoff.
//! - [`gateway`] composes the three and emits request telemetry.
//!
//! Errors are mapped into [`IntakeError`] variants so callers can tell
//! transient failures from permanent ones without seeing Octocrab internals.

pub mod client;
pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;
pub mod pagination;
pub mod quota;
pub mod rate_limit;
pub mod retry;

pub use client::{GitHubClient, OctocrabClient, Quoted};
pub use error::IntakeError;
pub use gateway::{GitHubGateway, ThrottledGateway};
pub use locator::{
    PersonalAccessToken, RepositoryLocator, RepositoryName, RepositoryOwner, UserLogin,
    parse_api_base,
};
pub use models::{Issue, PullRequest, Repository, User};
pub use pagination::{Listing, PageRequest};
pub use quota::{QuotaLimiter, QuotaSettings};
pub use rate_limit::RateLimitInfo;
pub use retry::{RetryPolicy, is_retryable};
