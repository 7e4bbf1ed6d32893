//! Fixture builders for domain records.
//!
//! Timestamps are fixed so stored records compare equal after a round trip
//! through storage.
//!
//! # Examples
//!
//! ```
//! use hubcrawl::github::models::test_support::{sample_issue, sample_repository};
//!
//! let repository = sample_repository(7, "octo", "cat");
//! let issue = sample_issue(70, 1, repository.id);
//! assert_eq!(issue.repository_id, 7);
//! ```

use chrono::{DateTime, TimeZone, Utc};

use super::{Issue, PullRequest, Repository, User};

/// Fixed creation time shared by every fixture.
#[must_use]
pub fn fixed_time(offset_days: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
        + chrono::Duration::days(i64::from(offset_days))
}

/// Public repository with no stars.
#[must_use]
pub fn sample_repository(id: u64, owner: &str, name: &str) -> Repository {
    Repository {
        id,
        name: name.to_owned(),
        full_name: format!("{owner}/{name}"),
        description: None,
        private: false,
        owner_login: owner.to_owned(),
        language: Some("Rust".to_owned()),
        stargazers_count: 0,
        forks_count: 0,
        open_issues_count: 0,
        created_at: fixed_time(0),
        updated_at: fixed_time(1),
    }
}

/// Open issue created `number` days after the fixed epoch.
#[must_use]
pub fn sample_issue(id: u64, number: u32, repository_id: u64) -> Issue {
    Issue {
        id,
        number: u64::from(number),
        title: format!("Issue {number}"),
        body: None,
        state: "open".to_owned(),
        author_login: Some("octocat".to_owned()),
        repository_id,
        created_at: fixed_time(number),
        updated_at: fixed_time(number),
        closed_at: None,
    }
}

/// Open pull request created `number` days after the fixed epoch.
#[must_use]
pub fn sample_pull_request(id: u64, number: u32, repository_id: u64) -> PullRequest {
    PullRequest {
        id,
        number: u64::from(number),
        title: format!("Pull request {number}"),
        body: None,
        state: "open".to_owned(),
        author_login: Some("octocat".to_owned()),
        repository_id,
        created_at: fixed_time(number),
        updated_at: fixed_time(number),
        closed_at: None,
        merged_at: None,
    }
}

/// User profile with only the required fields set.
#[must_use]
pub fn sample_user(id: u64, login: &str) -> User {
    User {
        id,
        login: login.to_owned(),
        name: None,
        email: None,
        avatar_url: format!("https://avatars.example.com/{login}"),
        bio: None,
        company: None,
        location: None,
        created_at: fixed_time(0),
        updated_at: fixed_time(0),
    }
}
