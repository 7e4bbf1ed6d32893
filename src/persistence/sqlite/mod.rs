//! Record store backed by `SQLite`.
//!
//! Each operation opens its own connection, mirroring the short-lived
//! connections used by the migration runner. Writes are upserts keyed by the
//! GitHub id. A `database is locked` condition is reported as
//! [`PersistenceError::Busy`] so callers can retry it.

mod rows;

use diesel::Connection;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Bool, Nullable, Text};
use diesel::sqlite::SqliteConnection;

use crate::github::models::{Issue, PullRequest, Repository, User};

use self::rows::{
    ISSUE_COLUMNS, IssueRow, PULL_REQUEST_COLUMNS, PullRequestRow, REPOSITORY_COLUMNS,
    RepositoryRow, USER_COLUMNS, UserRow, convert_rows, format_optional_timestamp,
    format_timestamp, to_sql_integer,
};
use super::PersistenceError;
use super::store::{
    IssueFilter, IssueStore, PullRequestFilter, PullRequestStore, RepositoryFilter,
    RepositoryStore, UserFilter, UserStore,
};

const REPOSITORIES_TABLE: &str = "repositories";
const ISSUES_TABLE: &str = "issues";
const PULL_REQUESTS_TABLE: &str = "pull_requests";
const USERS_TABLE: &str = "users";

/// How long `SQLite` waits on a lock before reporting `SQLITE_BUSY`.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// SQLite-backed storage for every record kind.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    database_url: String,
}

impl SqliteRecordStore {
    /// Create a store targeting the configured `database_url`.
    ///
    /// The schema must already exist; see
    /// [`migrate_database`](super::migrate_database).
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BlankDatabaseUrl`] when the URL is blank.
    pub fn new(database_url: impl Into<String>) -> Result<Self, PersistenceError> {
        let database_url_string = database_url.into();
        if database_url_string.trim().is_empty() {
            return Err(PersistenceError::BlankDatabaseUrl);
        }
        Ok(Self {
            database_url: database_url_string,
        })
    }

    fn establish_connection(&self) -> Result<SqliteConnection, PersistenceError> {
        let mut connection = SqliteConnection::establish(&self.database_url).map_err(|error| {
            PersistenceError::ConnectionFailed {
                message: error.to_string(),
            }
        })?;

        sql_query(format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"))
            .execute(&mut connection)
            .map(drop)
            .map_err(|error| PersistenceError::ConnectionFailed {
                message: error.to_string(),
            })?;

        Ok(connection)
    }

    fn table_exists(
        connection: &mut SqliteConnection,
        table: &str,
    ) -> Result<bool, diesel::result::Error> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            count: i64,
        }

        let row: Row = sql_query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?;",
        )
        .bind::<Text, _>(table)
        .get_result(connection)?;

        Ok(row.count > 0)
    }

    fn map_error_with_schema_check<F>(
        connection: &mut SqliteConnection,
        table: &str,
        error: &diesel::result::Error,
        create_error: F,
    ) -> PersistenceError
    where
        F: Fn(String) -> PersistenceError,
    {
        if is_busy(error) {
            return PersistenceError::Busy {
                message: error.to_string(),
            };
        }

        match Self::table_exists(connection, table) {
            Ok(false) => PersistenceError::SchemaNotInitialised,
            Ok(true) => create_error(error.to_string()),
            Err(check_error) => create_error(format!(
                "schema presence check failed: {check_error}; original error: {error}"
            )),
        }
    }

    fn map_query_error(
        connection: &mut SqliteConnection,
        table: &str,
        error: &diesel::result::Error,
    ) -> PersistenceError {
        Self::map_error_with_schema_check(connection, table, error, |message| {
            PersistenceError::QueryFailed { message }
        })
    }

    fn map_write_error(
        connection: &mut SqliteConnection,
        table: &str,
        error: &diesel::result::Error,
    ) -> PersistenceError {
        Self::map_error_with_schema_check(connection, table, error, |message| {
            PersistenceError::WriteFailed { message }
        })
    }
}

fn is_busy(error: &diesel::result::Error) -> bool {
    let message = error.to_string().to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("database is busy")
}

impl RepositoryStore for SqliteRecordStore {
    fn save_repository(&self, repository: &Repository) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO repositories \
             (id, name, full_name, description, private, owner_login, language, \
              stargazers_count, forks_count, open_issues_count, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               name = excluded.name, \
               full_name = excluded.full_name, \
               description = excluded.description, \
               private = excluded.private, \
               owner_login = excluded.owner_login, \
               language = excluded.language, \
               stargazers_count = excluded.stargazers_count, \
               forks_count = excluded.forks_count, \
               open_issues_count = excluded.open_issues_count, \
               created_at = excluded.created_at, \
               updated_at = excluded.updated_at, \
               ingested_at = CURRENT_TIMESTAMP;",
        )
        .bind::<BigInt, _>(to_sql_integer("id", repository.id)?)
        .bind::<Text, _>(&repository.name)
        .bind::<Text, _>(&repository.full_name)
        .bind::<Nullable<Text>, _>(repository.description.as_deref())
        .bind::<Bool, _>(repository.private)
        .bind::<Text, _>(&repository.owner_login)
        .bind::<Nullable<Text>, _>(repository.language.as_deref())
        .bind::<BigInt, _>(i64::from(repository.stargazers_count))
        .bind::<BigInt, _>(i64::from(repository.forks_count))
        .bind::<BigInt, _>(i64::from(repository.open_issues_count))
        .bind::<Text, _>(format_timestamp(&repository.created_at))
        .bind::<Text, _>(format_timestamp(&repository.updated_at))
        .execute(&mut connection)
        .map(drop)
        .map_err(|error| Self::map_write_error(&mut connection, REPOSITORIES_TABLE, &error))
    }

    fn find_repository(&self, id: u64) -> Result<Option<Repository>, PersistenceError> {
        let mut connection = self.establish_connection()?;

        let row: Option<RepositoryRow> = sql_query(format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE id = ? LIMIT 1;"
        ))
        .bind::<BigInt, _>(to_sql_integer("id", id)?)
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, REPOSITORIES_TABLE, &error))?;

        row.map(Repository::try_from).transpose()
    }

    fn find_repository_by_name(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Repository>, PersistenceError> {
        let mut connection = self.establish_connection()?;

        let row: Option<RepositoryRow> = sql_query(format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories \
             WHERE owner_login = ? AND name = ? LIMIT 1;"
        ))
        .bind::<Text, _>(owner)
        .bind::<Text, _>(name)
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, REPOSITORIES_TABLE, &error))?;

        row.map(Repository::try_from).transpose()
    }

    fn list_repositories(
        &self,
        filter: &RepositoryFilter,
    ) -> Result<Vec<Repository>, PersistenceError> {
        let mut connection = self.establish_connection()?;
        let min_stars = filter.min_stars.map(i64::from);

        let rows: Vec<RepositoryRow> = sql_query(format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories \
             WHERE (? IS NULL OR owner_login = ?) \
               AND (? IS NULL OR language = ?) \
               AND (? IS NULL OR stargazers_count >= ?) \
             ORDER BY stargazers_count DESC, id ASC \
             LIMIT ? OFFSET ?;"
        ))
        .bind::<Nullable<Text>, _>(filter.owner_login.as_deref())
        .bind::<Nullable<Text>, _>(filter.owner_login.as_deref())
        .bind::<Nullable<Text>, _>(filter.language.as_deref())
        .bind::<Nullable<Text>, _>(filter.language.as_deref())
        .bind::<Nullable<BigInt>, _>(min_stars)
        .bind::<Nullable<BigInt>, _>(min_stars)
        .bind::<BigInt, _>(filter.window.sql_limit())
        .bind::<BigInt, _>(filter.window.sql_offset())
        .load(&mut connection)
        .map_err(|error| Self::map_query_error(&mut connection, REPOSITORIES_TABLE, &error))?;

        convert_rows(rows)
    }
}

impl IssueStore for SqliteRecordStore {
    fn save_issue(&self, issue: &Issue) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO issues \
             (id, number, title, body, state, author_login, repository_id, created_at, \
              updated_at, closed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               number = excluded.number, \
               title = excluded.title, \
               body = excluded.body, \
               state = excluded.state, \
               author_login = excluded.author_login, \
               repository_id = excluded.repository_id, \
               created_at = excluded.created_at, \
               updated_at = excluded.updated_at, \
               closed_at = excluded.closed_at, \
               ingested_at = CURRENT_TIMESTAMP;",
        )
        .bind::<BigInt, _>(to_sql_integer("id", issue.id)?)
        .bind::<BigInt, _>(to_sql_integer("number", issue.number)?)
        .bind::<Text, _>(&issue.title)
        .bind::<Nullable<Text>, _>(issue.body.as_deref())
        .bind::<Text, _>(&issue.state)
        .bind::<Nullable<Text>, _>(issue.author_login.as_deref())
        .bind::<BigInt, _>(to_sql_integer("repository_id", issue.repository_id)?)
        .bind::<Text, _>(format_timestamp(&issue.created_at))
        .bind::<Text, _>(format_timestamp(&issue.updated_at))
        .bind::<Nullable<Text>, _>(format_optional_timestamp(issue.closed_at.as_ref()))
        .execute(&mut connection)
        .map(drop)
        .map_err(|error| Self::map_write_error(&mut connection, ISSUES_TABLE, &error))
    }

    fn find_issue(&self, id: u64) -> Result<Option<Issue>, PersistenceError> {
        let mut connection = self.establish_connection()?;

        let row: Option<IssueRow> = sql_query(format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ? LIMIT 1;"
        ))
        .bind::<BigInt, _>(to_sql_integer("id", id)?)
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, ISSUES_TABLE, &error))?;

        row.map(Issue::try_from).transpose()
    }

    fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, PersistenceError> {
        let mut connection = self.establish_connection()?;
        let repository_id = filter
            .repository_id
            .map(|id| to_sql_integer("repository_id", id))
            .transpose()?;

        let rows: Vec<IssueRow> = sql_query(format!(
            "SELECT {ISSUE_COLUMNS} FROM issues \
             WHERE (? IS NULL OR repository_id = ?) \
               AND (? IS NULL OR state = ?) \
             ORDER BY created_at DESC, id DESC \
             LIMIT ? OFFSET ?;"
        ))
        .bind::<Nullable<BigInt>, _>(repository_id)
        .bind::<Nullable<BigInt>, _>(repository_id)
        .bind::<Nullable<Text>, _>(filter.state.as_deref())
        .bind::<Nullable<Text>, _>(filter.state.as_deref())
        .bind::<BigInt, _>(filter.window.sql_limit())
        .bind::<BigInt, _>(filter.window.sql_offset())
        .load(&mut connection)
        .map_err(|error| Self::map_query_error(&mut connection, ISSUES_TABLE, &error))?;

        convert_rows(rows)
    }
}

impl PullRequestStore for SqliteRecordStore {
    fn save_pull_request(&self, pull_request: &PullRequest) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO pull_requests \
             (id, number, title, body, state, author_login, repository_id, created_at, \
              updated_at, closed_at, merged_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               number = excluded.number, \
               title = excluded.title, \
               body = excluded.body, \
               state = excluded.state, \
               author_login = excluded.author_login, \
               repository_id = excluded.repository_id, \
               created_at = excluded.created_at, \
               updated_at = excluded.updated_at, \
               closed_at = excluded.closed_at, \
               merged_at = excluded.merged_at, \
               ingested_at = CURRENT_TIMESTAMP;",
        )
        .bind::<BigInt, _>(to_sql_integer("id", pull_request.id)?)
        .bind::<BigInt, _>(to_sql_integer("number", pull_request.number)?)
        .bind::<Text, _>(&pull_request.title)
        .bind::<Nullable<Text>, _>(pull_request.body.as_deref())
        .bind::<Text, _>(&pull_request.state)
        .bind::<Nullable<Text>, _>(pull_request.author_login.as_deref())
        .bind::<BigInt, _>(to_sql_integer(
            "repository_id",
            pull_request.repository_id,
        )?)
        .bind::<Text, _>(format_timestamp(&pull_request.created_at))
        .bind::<Text, _>(format_timestamp(&pull_request.updated_at))
        .bind::<Nullable<Text>, _>(format_optional_timestamp(pull_request.closed_at.as_ref()))
        .bind::<Nullable<Text>, _>(format_optional_timestamp(pull_request.merged_at.as_ref()))
        .execute(&mut connection)
        .map(drop)
        .map_err(|error| Self::map_write_error(&mut connection, PULL_REQUESTS_TABLE, &error))
    }

    fn find_pull_request(&self, id: u64) -> Result<Option<PullRequest>, PersistenceError> {
        let mut connection = self.establish_connection()?;

        let row: Option<PullRequestRow> = sql_query(format!(
            "SELECT {PULL_REQUEST_COLUMNS} FROM pull_requests WHERE id = ? LIMIT 1;"
        ))
        .bind::<BigInt, _>(to_sql_integer("id", id)?)
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, PULL_REQUESTS_TABLE, &error))?;

        row.map(PullRequest::try_from).transpose()
    }

    fn list_pull_requests(
        &self,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>, PersistenceError> {
        let mut connection = self.establish_connection()?;
        let repository_id = filter
            .repository_id
            .map(|id| to_sql_integer("repository_id", id))
            .transpose()?;

        let rows: Vec<PullRequestRow> = sql_query(format!(
            "SELECT {PULL_REQUEST_COLUMNS} FROM pull_requests \
             WHERE (? IS NULL OR repository_id = ?) \
               AND (? IS NULL OR state = ?) \
             ORDER BY created_at DESC, id DESC \
             LIMIT ? OFFSET ?;"
        ))
        .bind::<Nullable<BigInt>, _>(repository_id)
        .bind::<Nullable<BigInt>, _>(repository_id)
        .bind::<Nullable<Text>, _>(filter.state.as_deref())
        .bind::<Nullable<Text>, _>(filter.state.as_deref())
        .bind::<BigInt, _>(filter.window.sql_limit())
        .bind::<BigInt, _>(filter.window.sql_offset())
        .load(&mut connection)
        .map_err(|error| Self::map_query_error(&mut connection, PULL_REQUESTS_TABLE, &error))?;

        convert_rows(rows)
    }
}

impl UserStore for SqliteRecordStore {
    fn save_user(&self, user: &User) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO users \
             (id, login, name, email, avatar_url, bio, company, location, created_at, \
              updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               login = excluded.login, \
               name = excluded.name, \
               email = excluded.email, \
               avatar_url = excluded.avatar_url, \
               bio = excluded.bio, \
               company = excluded.company, \
               location = excluded.location, \
               created_at = excluded.created_at, \
               updated_at = excluded.updated_at, \
               ingested_at = CURRENT_TIMESTAMP;",
        )
        .bind::<BigInt, _>(to_sql_integer("id", user.id)?)
        .bind::<Text, _>(&user.login)
        .bind::<Nullable<Text>, _>(user.name.as_deref())
        .bind::<Nullable<Text>, _>(user.email.as_deref())
        .bind::<Text, _>(&user.avatar_url)
        .bind::<Nullable<Text>, _>(user.bio.as_deref())
        .bind::<Nullable<Text>, _>(user.company.as_deref())
        .bind::<Nullable<Text>, _>(user.location.as_deref())
        .bind::<Text, _>(format_timestamp(&user.created_at))
        .bind::<Text, _>(format_timestamp(&user.updated_at))
        .execute(&mut connection)
        .map(drop)
        .map_err(|error| Self::map_write_error(&mut connection, USERS_TABLE, &error))
    }

    fn find_user(&self, id: u64) -> Result<Option<User>, PersistenceError> {
        let mut connection = self.establish_connection()?;

        let row: Option<UserRow> = sql_query(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? LIMIT 1;"
        ))
        .bind::<BigInt, _>(to_sql_integer("id", id)?)
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, USERS_TABLE, &error))?;

        row.map(User::try_from).transpose()
    }

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, PersistenceError> {
        let mut connection = self.establish_connection()?;

        let rows: Vec<UserRow> = sql_query(format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE (? IS NULL OR login = ?) \
             ORDER BY login ASC, id ASC \
             LIMIT ? OFFSET ?;"
        ))
        .bind::<Nullable<Text>, _>(filter.login.as_deref())
        .bind::<Nullable<Text>, _>(filter.login.as_deref())
        .bind::<BigInt, _>(filter.window.sql_limit())
        .bind::<BigInt, _>(filter.window.sql_offset())
        .load(&mut connection)
        .map_err(|error| Self::map_query_error(&mut connection, USERS_TABLE, &error))?;

        convert_rows(rows)
    }
}
