//! Record storage and database migrations.
//!
//! Ingested records live in a local `SQLite` database whose schema is managed
//! with Diesel migrations, so the database can be created and upgraded
//! consistently across machines. An in-memory store with the same contract is
//! available for tests and dry runs.

mod error;
mod memory;
mod migrator;
mod sqlite;
mod store;

pub use error::PersistenceError;
pub use memory::InMemoryRecordStore;
pub use migrator::{INITIAL_SCHEMA_VERSION, SchemaVersion, migrate_database};
pub use sqlite::SqliteRecordStore;
pub use store::{
    IssueFilter, IssueStore, ListWindow, PullRequestFilter, PullRequestStore, RecordStores,
    RepositoryFilter, RepositoryStore, UserFilter, UserStore,
};

#[cfg(test)]
pub(crate) use store::{
    MockIssueStore, MockPullRequestStore, MockRepositoryStore, MockUserStore,
};
