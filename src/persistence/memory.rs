//! In-process record store.
//!
//! Used by tests and by callers that want to ingest without a database. It
//! follows the same upsert, filter and ordering rules as the `SQLite` store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::github::models::{Issue, PullRequest, Repository, User};

use super::PersistenceError;
use super::store::{
    IssueFilter, IssueStore, PullRequestFilter, PullRequestStore, RepositoryFilter,
    RepositoryStore, UserFilter, UserStore,
};

/// Record store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    repositories: Mutex<BTreeMap<u64, Repository>>,
    issues: Mutex<BTreeMap<u64, Issue>>,
    pull_requests: Mutex<BTreeMap<u64, PullRequest>>,
    users: Mutex<BTreeMap<u64, User>>,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn upsert<T: Clone>(table: &Mutex<BTreeMap<u64, T>>, id: u64, record: &T) {
    lock(table).insert(id, record.clone());
}

fn find<T: Clone>(table: &Mutex<BTreeMap<u64, T>>, id: u64) -> Option<T> {
    lock(table).get(&id).cloned()
}

impl RepositoryStore for InMemoryRecordStore {
    fn save_repository(&self, repository: &Repository) -> Result<(), PersistenceError> {
        upsert(&self.repositories, repository.id, repository);
        Ok(())
    }

    fn find_repository(&self, id: u64) -> Result<Option<Repository>, PersistenceError> {
        Ok(find(&self.repositories, id))
    }

    fn find_repository_by_name(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Repository>, PersistenceError> {
        Ok(lock(&self.repositories)
            .values()
            .find(|repository| repository.owner_login == owner && repository.name == name)
            .cloned())
    }

    fn list_repositories(
        &self,
        filter: &RepositoryFilter,
    ) -> Result<Vec<Repository>, PersistenceError> {
        let mut matching: Vec<Repository> = lock(&self.repositories)
            .values()
            .filter(|repository| filter.matches(repository))
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            right
                .stargazers_count
                .cmp(&left.stargazers_count)
                .then(left.id.cmp(&right.id))
        });
        Ok(filter.window.apply(matching))
    }
}

impl IssueStore for InMemoryRecordStore {
    fn save_issue(&self, issue: &Issue) -> Result<(), PersistenceError> {
        upsert(&self.issues, issue.id, issue);
        Ok(())
    }

    fn find_issue(&self, id: u64) -> Result<Option<Issue>, PersistenceError> {
        Ok(find(&self.issues, id))
    }

    fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, PersistenceError> {
        let mut matching: Vec<Issue> = lock(&self.issues)
            .values()
            .filter(|issue| filter.matches(issue.repository_id, &issue.state))
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then(right.id.cmp(&left.id))
        });
        Ok(filter.window.apply(matching))
    }
}

impl PullRequestStore for InMemoryRecordStore {
    fn save_pull_request(&self, pull_request: &PullRequest) -> Result<(), PersistenceError> {
        upsert(&self.pull_requests, pull_request.id, pull_request);
        Ok(())
    }

    fn find_pull_request(&self, id: u64) -> Result<Option<PullRequest>, PersistenceError> {
        Ok(find(&self.pull_requests, id))
    }

    fn list_pull_requests(
        &self,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>, PersistenceError> {
        let mut matching: Vec<PullRequest> = lock(&self.pull_requests)
            .values()
            .filter(|pull_request| filter.matches(pull_request.repository_id, &pull_request.state))
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then(right.id.cmp(&left.id))
        });
        Ok(filter.window.apply(matching))
    }
}

impl UserStore for InMemoryRecordStore {
    fn save_user(&self, user: &User) -> Result<(), PersistenceError> {
        upsert(&self.users, user.id, user);
        Ok(())
    }

    fn find_user(&self, id: u64) -> Result<Option<User>, PersistenceError> {
        Ok(find(&self.users, id))
    }

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, PersistenceError> {
        let mut matching: Vec<User> = lock(&self.users)
            .values()
            .filter(|user| filter.matches(user))
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            left.login
                .cmp(&right.login)
                .then(left.id.cmp(&right.id))
        });
        Ok(filter.window.apply(matching))
    }
}
