//! Storage contracts for ingested records.
//!
//! Each record kind has its own store trait. `save` is an idempotent upsert
//! keyed by the GitHub id, so re-ingesting a record replaces the stored copy
//! with the latest values. Listing applies equality and range filters, a
//! fixed sort order per kind and limit/offset pagination.

use std::sync::Arc;

use crate::github::models::{Issue, PullRequest, Repository, User};

use super::PersistenceError;

/// Limit and offset applied to a listing. A limit of 0 means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListWindow {
    /// Maximum rows to return; 0 returns every matching row.
    pub limit: u32,
    /// Rows to skip before the first returned row.
    pub offset: u32,
}

impl ListWindow {
    /// Creates a window.
    #[must_use]
    pub const fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Applies the window to an already sorted list.
    #[must_use]
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skipped = items.into_iter().skip(to_usize(self.offset));
        if self.limit == 0 {
            skipped.collect()
        } else {
            skipped.take(to_usize(self.limit)).collect()
        }
    }

    /// `SQLite` `LIMIT` value, where -1 disables the limit.
    #[must_use]
    pub fn sql_limit(&self) -> i64 {
        if self.limit == 0 {
            -1
        } else {
            i64::from(self.limit)
        }
    }

    /// `SQLite` `OFFSET` value.
    #[must_use]
    pub fn sql_offset(&self) -> i64 {
        i64::from(self.offset)
    }
}

fn to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Repository listing filter. Results are ordered by star count, highest
/// first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryFilter {
    /// Only repositories owned by this login.
    pub owner_login: Option<String>,
    /// Only repositories with this primary language.
    pub language: Option<String>,
    /// Only repositories with at least this many stars.
    pub min_stars: Option<u32>,
    /// Pagination.
    pub window: ListWindow,
}

impl RepositoryFilter {
    /// Reports whether `repository` passes every predicate.
    #[must_use]
    pub fn matches(&self, repository: &Repository) -> bool {
        self.owner_login
            .as_deref()
            .is_none_or(|owner| repository.owner_login == owner)
            && self
                .language
                .as_deref()
                .is_none_or(|language| repository.language.as_deref() == Some(language))
            && self
                .min_stars
                .is_none_or(|stars| repository.stargazers_count >= stars)
    }
}

/// Issue and pull request listing filter. Results are ordered by creation
/// time, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Only records belonging to this repository.
    pub repository_id: Option<u64>,
    /// Only records in this state (`open` or `closed`).
    pub state: Option<String>,
    /// Pagination.
    pub window: ListWindow,
}

/// Pull requests are filtered exactly like issues.
pub type PullRequestFilter = IssueFilter;

impl IssueFilter {
    /// Reports whether a record with these attributes passes every predicate.
    #[must_use]
    pub fn matches(&self, repository_id: u64, state: &str) -> bool {
        self.repository_id.is_none_or(|id| id == repository_id)
            && self.state.as_deref().is_none_or(|wanted| wanted == state)
    }
}

/// User listing filter. Results are ordered by login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Only the user with this login.
    pub login: Option<String>,
    /// Pagination.
    pub window: ListWindow,
}

impl UserFilter {
    /// Reports whether `user` passes every predicate.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        self.login.as_deref().is_none_or(|login| user.login == login)
    }
}

/// Storage for repositories.
#[cfg_attr(test, mockall::automock)]
pub trait RepositoryStore: Send + Sync {
    /// Inserts or replaces the repository with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write fails.
    fn save_repository(&self, repository: &Repository) -> Result<(), PersistenceError>;

    /// Looks a repository up by GitHub id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn find_repository(&self, id: u64) -> Result<Option<Repository>, PersistenceError>;

    /// Looks a repository up by owner login and name.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn find_repository_by_name(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Repository>, PersistenceError>;

    /// Lists repositories matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn list_repositories(
        &self,
        filter: &RepositoryFilter,
    ) -> Result<Vec<Repository>, PersistenceError>;
}

/// Storage for issues.
#[cfg_attr(test, mockall::automock)]
pub trait IssueStore: Send + Sync {
    /// Inserts or replaces the issue with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write fails.
    fn save_issue(&self, issue: &Issue) -> Result<(), PersistenceError>;

    /// Looks an issue up by GitHub id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn find_issue(&self, id: u64) -> Result<Option<Issue>, PersistenceError>;

    /// Lists issues matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, PersistenceError>;
}

/// Storage for pull requests.
#[cfg_attr(test, mockall::automock)]
pub trait PullRequestStore: Send + Sync {
    /// Inserts or replaces the pull request with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write fails.
    fn save_pull_request(&self, pull_request: &PullRequest) -> Result<(), PersistenceError>;

    /// Looks a pull request up by GitHub id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn find_pull_request(&self, id: u64) -> Result<Option<PullRequest>, PersistenceError>;

    /// Lists pull requests matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn list_pull_requests(
        &self,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>, PersistenceError>;
}

/// Storage for users.
#[cfg_attr(test, mockall::automock)]
pub trait UserStore: Send + Sync {
    /// Inserts or replaces the user with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write fails.
    fn save_user(&self, user: &User) -> Result<(), PersistenceError>;

    /// Looks a user up by GitHub id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn find_user(&self, id: u64) -> Result<Option<User>, PersistenceError>;

    /// Lists users matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, PersistenceError>;
}

/// One store per record kind.
#[derive(Clone)]
pub struct RecordStores {
    /// Repository storage.
    pub repositories: Arc<dyn RepositoryStore>,
    /// Issue storage.
    pub issues: Arc<dyn IssueStore>,
    /// Pull request storage.
    pub pull_requests: Arc<dyn PullRequestStore>,
    /// User storage.
    pub users: Arc<dyn UserStore>,
}

impl RecordStores {
    /// Uses one backend for every record kind.
    #[must_use]
    pub fn shared<S>(store: &Arc<S>) -> Self
    where
        S: RepositoryStore + IssueStore + PullRequestStore + UserStore + 'static,
    {
        Self {
            repositories: Arc::clone(store) as Arc<dyn RepositoryStore>,
            issues: Arc::clone(store) as Arc<dyn IssueStore>,
            pull_requests: Arc::clone(store) as Arc<dyn PullRequestStore>,
            users: Arc::clone(store) as Arc<dyn UserStore>,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{IssueFilter, ListWindow, RepositoryFilter};
    use crate::github::models::test_support::sample_repository;

    #[rstest]
    #[case::unlimited(ListWindow::new(0, 0), vec![1, 2, 3, 4, 5])]
    #[case::first_two(ListWindow::new(2, 0), vec![1, 2])]
    #[case::offset_only(ListWindow::new(0, 3), vec![4, 5])]
    #[case::past_end(ListWindow::new(2, 10), vec![])]
    fn window_applies_limit_and_offset(#[case] window: ListWindow, #[case] expected: Vec<u32>) {
        assert_eq!(window.apply(vec![1, 2, 3, 4, 5]), expected);
    }

    #[test]
    fn zero_limit_disables_sql_limit() {
        assert_eq!(ListWindow::new(0, 5).sql_limit(), -1);
        assert_eq!(ListWindow::new(25, 5).sql_limit(), 25);
    }

    #[test]
    fn repository_filter_combines_predicates() {
        let mut repository = sample_repository(1, "octo", "cat");
        repository.stargazers_count = 50;

        let filter = RepositoryFilter {
            owner_login: Some("octo".to_owned()),
            language: Some("Rust".to_owned()),
            min_stars: Some(50),
            ..RepositoryFilter::default()
        };
        assert!(filter.matches(&repository));

        let stricter = RepositoryFilter {
            min_stars: Some(51),
            ..filter
        };
        assert!(!stricter.matches(&repository));
    }

    #[test]
    fn issue_filter_treats_absent_predicates_as_wildcards() {
        assert!(IssueFilter::default().matches(9, "closed"));
        let open_only = IssueFilter {
            state: Some("open".to_owned()),
            ..IssueFilter::default()
        };
        assert!(!open_only.matches(9, "closed"));
    }
}
