//! Domain records ingested from GitHub.
//!
//! Types prefixed with `Api` are internal deserialisation targets that mirror
//! the REST payloads and convert into the public domain types. Issues and
//! pull requests carry the identity of their owning repository, which the
//! ingestion layer stamps after fetching the repository itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    /// GitHub repository id.
    pub id: u64,
    /// Short repository name.
    pub name: String,
    /// `owner/name` form.
    pub full_name: String,
    /// Free-form description, when set.
    pub description: Option<String>,
    /// Whether the repository is private.
    pub private: bool,
    /// Login of the owning user or organisation.
    pub owner_login: String,
    /// Primary language detected by GitHub.
    pub language: Option<String>,
    /// Star count.
    pub stargazers_count: u32,
    /// Fork count.
    pub forks_count: u32,
    /// Open issue count (includes open pull requests).
    pub open_issues_count: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Issue metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// GitHub issue id.
    pub id: u64,
    /// Issue number within the repository.
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// Issue body, when set.
    pub body: Option<String>,
    /// `open` or `closed`.
    pub state: String,
    /// Author login, when the account still exists.
    pub author_login: Option<String>,
    /// Id of the owning repository.
    pub repository_id: u64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Close time, when closed.
    pub closed_at: Option<DateTime<Utc>>,
}

/// Pull request metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    /// GitHub pull request id.
    pub id: u64,
    /// Pull request number within the repository.
    pub number: u64,
    /// Pull request title.
    pub title: String,
    /// Pull request body, when set.
    pub body: Option<String>,
    /// `open` or `closed`.
    pub state: String,
    /// Author login, when the account still exists.
    pub author_login: Option<String>,
    /// Id of the owning repository.
    pub repository_id: u64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Close time, when closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Merge time, when merged.
    pub merged_at: Option<DateTime<Utc>>,
}

/// User profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// GitHub account id.
    pub id: u64,
    /// Account login.
    pub login: String,
    /// Display name.
    pub name: Option<String>,
    /// Public email address.
    pub email: Option<String>,
    /// Avatar image URL.
    pub avatar_url: String,
    /// Profile bio.
    pub bio: Option<String>,
    /// Company.
    pub company: Option<String>,
    /// Location.
    pub location: Option<String>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Last profile update time.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAccount {
    pub(crate) login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRepository {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) private: bool,
    pub(crate) owner: Option<ApiAccount>,
    pub(crate) language: Option<String>,
    #[serde(default)]
    pub(crate) stargazers_count: u32,
    #[serde(default)]
    pub(crate) forks_count: u32,
    #[serde(default)]
    pub(crate) open_issues_count: u32,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiIssue {
    pub(crate) id: u64,
    pub(crate) number: u64,
    pub(crate) title: String,
    pub(crate) body: Option<String>,
    pub(crate) state: String,
    pub(crate) user: Option<ApiAccount>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) closed_at: Option<DateTime<Utc>>,
    /// Present only on issues that are really pull requests.
    pub(crate) pull_request: Option<serde_json::Value>,
}

impl ApiIssue {
    pub(crate) const fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub(crate) id: u64,
    pub(crate) number: u64,
    pub(crate) title: String,
    pub(crate) body: Option<String>,
    pub(crate) state: String,
    pub(crate) user: Option<ApiAccount>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) closed_at: Option<DateTime<Utc>>,
    pub(crate) merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiUser {
    pub(crate) id: u64,
    pub(crate) login: String,
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) avatar_url: String,
    pub(crate) bio: Option<String>,
    pub(crate) company: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl From<ApiRepository> for Repository {
    fn from(value: ApiRepository) -> Self {
        Self {
            id: value.id,
            name: value.name,
            full_name: value.full_name,
            description: value.description,
            private: value.private,
            owner_login: value
                .owner
                .and_then(|owner| owner.login)
                .unwrap_or_default(),
            language: value.language,
            stargazers_count: value.stargazers_count,
            forks_count: value.forks_count,
            open_issues_count: value.open_issues_count,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<ApiIssue> for Issue {
    fn from(value: ApiIssue) -> Self {
        Self {
            id: value.id,
            number: value.number,
            title: value.title,
            body: value.body,
            state: value.state,
            author_login: value.user.and_then(|user| user.login),
            repository_id: 0,
            created_at: value.created_at,
            updated_at: value.updated_at,
            closed_at: value.closed_at,
        }
    }
}

impl From<ApiPullRequest> for PullRequest {
    fn from(value: ApiPullRequest) -> Self {
        Self {
            id: value.id,
            number: value.number,
            title: value.title,
            body: value.body,
            state: value.state,
            author_login: value.user.and_then(|user| user.login),
            repository_id: 0,
            created_at: value.created_at,
            updated_at: value.updated_at,
            closed_at: value.closed_at,
            merged_at: value.merged_at,
        }
    }
}

impl From<ApiUser> for User {
    fn from(value: ApiUser) -> Self {
        Self {
            id: value.id,
            login: value.login,
            name: value.name,
            email: value.email,
            avatar_url: value.avatar_url,
            bio: value.bio,
            company: value.company,
            location: value.location,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Keeps real issues and drops the pull requests GitHub interleaves with
/// them on the issues endpoint.
pub(crate) fn issues_only(records: Vec<ApiIssue>) -> Vec<Issue> {
    records
        .into_iter()
        .filter(|record| !record.is_pull_request())
        .map(Issue::from)
        .collect()
}
