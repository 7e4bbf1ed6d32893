//! Error types for record storage.

use thiserror::Error;

/// Errors returned while migrating, reading or writing the record store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// No database URL/path was provided.
    #[error("database URL is required (use --database-url or HUBCRAWL_DATABASE_URL)")]
    MissingDatabaseUrl,

    /// The database URL/path was present but blank.
    #[error("database URL must not be blank")]
    BlankDatabaseUrl,

    /// Establishing a `SQLite` connection failed.
    #[error("failed to connect to SQLite database: {message}")]
    ConnectionFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// Running pending migrations failed.
    #[error("failed to run database migrations: {message}")]
    MigrationFailed {
        /// Error detail from Diesel migrations.
        message: String,
    },

    /// Enabling foreign key enforcement failed.
    #[error("failed to enable foreign keys: {message}")]
    ForeignKeysEnableFailed {
        /// Error detail from the PRAGMA execution.
        message: String,
    },

    /// Reading the schema version from the migration table failed.
    #[error("failed to read schema version after migrations: {message}")]
    SchemaVersionQueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// The migrations completed but no schema version could be found.
    #[error("no schema version recorded after migrations ran")]
    MissingSchemaVersion,

    /// The record tables do not exist yet.
    #[error("record schema is missing; run with --migrate-db first")]
    SchemaNotInitialised,

    /// A read query failed.
    #[error("failed to query records: {message}")]
    QueryFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// An insert or update failed.
    #[error("failed to write record: {message}")]
    WriteFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// `SQLite` reported the database as busy or locked.
    #[error("database is busy: {message}")]
    Busy {
        /// Error detail from Diesel.
        message: String,
    },

    /// A stored value could not be converted back into a record.
    #[error("stored record is malformed: {message}")]
    MalformedRow {
        /// Column and value that failed to convert.
        message: String,
    },
}

impl PersistenceError {
    /// Reports whether retrying the same operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}
