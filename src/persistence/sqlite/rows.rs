//! Row types and column conversions for the `SQLite` record store.
//!
//! Timestamps are stored as RFC 3339 text with second precision and a `Z`
//! suffix, which keeps lexical and chronological order identical.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::QueryableByName;
use diesel::sql_types::{BigInt, Bool, Nullable, Text};

use crate::github::models::{Issue, PullRequest, Repository, User};
use crate::persistence::PersistenceError;

pub(super) const REPOSITORY_COLUMNS: &str = "id, name, full_name, description, private, \
     owner_login, language, stargazers_count, forks_count, open_issues_count, created_at, \
     updated_at";

pub(super) const ISSUE_COLUMNS: &str = "id, number, title, body, state, author_login, \
     repository_id, created_at, updated_at, closed_at";

pub(super) const PULL_REQUEST_COLUMNS: &str = "id, number, title, body, state, author_login, \
     repository_id, created_at, updated_at, closed_at, merged_at";

pub(super) const USER_COLUMNS: &str = "id, login, name, email, avatar_url, bio, company, \
     location, created_at, updated_at";

pub(super) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(super) fn format_optional_timestamp(value: Option<&DateTime<Utc>>) -> Option<String> {
    value.map(format_timestamp)
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| PersistenceError::MalformedRow {
            message: format!("{column} = {raw:?}: {error}"),
        })
}

fn parse_optional_timestamp(
    column: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, PersistenceError> {
    raw.map(|value| parse_timestamp(column, value)).transpose()
}

/// Converts a GitHub id or count into the signed integer `SQLite` stores.
pub(super) fn to_sql_integer(column: &str, value: u64) -> Result<i64, PersistenceError> {
    i64::try_from(value).map_err(|_| PersistenceError::WriteFailed {
        message: format!("{column} value {value} does not fit in a SQLite integer"),
    })
}

fn from_sql_integer<T: TryFrom<i64>>(column: &str, value: i64) -> Result<T, PersistenceError> {
    T::try_from(value).map_err(|_| PersistenceError::MalformedRow {
        message: format!("{column} = {value} is out of range"),
    })
}

#[derive(Debug, QueryableByName)]
pub(super) struct RepositoryRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Text)]
    full_name: String,
    #[diesel(sql_type = Nullable<Text>)]
    description: Option<String>,
    #[diesel(sql_type = Bool)]
    private: bool,
    #[diesel(sql_type = Text)]
    owner_login: String,
    #[diesel(sql_type = Nullable<Text>)]
    language: Option<String>,
    #[diesel(sql_type = BigInt)]
    stargazers_count: i64,
    #[diesel(sql_type = BigInt)]
    forks_count: i64,
    #[diesel(sql_type = BigInt)]
    open_issues_count: i64,
    #[diesel(sql_type = Text)]
    created_at: String,
    #[diesel(sql_type = Text)]
    updated_at: String,
}

impl TryFrom<RepositoryRow> for Repository {
    type Error = PersistenceError;

    fn try_from(row: RepositoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: from_sql_integer("repositories.id", row.id)?,
            name: row.name,
            full_name: row.full_name,
            description: row.description,
            private: row.private,
            owner_login: row.owner_login,
            language: row.language,
            stargazers_count: from_sql_integer("stargazers_count", row.stargazers_count)?,
            forks_count: from_sql_integer("forks_count", row.forks_count)?,
            open_issues_count: from_sql_integer("open_issues_count", row.open_issues_count)?,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
        })
    }
}

#[derive(Debug, QueryableByName)]
pub(super) struct IssueRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = BigInt)]
    number: i64,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = Nullable<Text>)]
    body: Option<String>,
    #[diesel(sql_type = Text)]
    state: String,
    #[diesel(sql_type = Nullable<Text>)]
    author_login: Option<String>,
    #[diesel(sql_type = BigInt)]
    repository_id: i64,
    #[diesel(sql_type = Text)]
    created_at: String,
    #[diesel(sql_type = Text)]
    updated_at: String,
    #[diesel(sql_type = Nullable<Text>)]
    closed_at: Option<String>,
}

impl TryFrom<IssueRow> for Issue {
    type Error = PersistenceError;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: from_sql_integer("issues.id", row.id)?,
            number: from_sql_integer("number", row.number)?,
            title: row.title,
            body: row.body,
            state: row.state,
            author_login: row.author_login,
            repository_id: from_sql_integer("repository_id", row.repository_id)?,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            closed_at: parse_optional_timestamp("closed_at", row.closed_at.as_deref())?,
        })
    }
}

#[derive(Debug, QueryableByName)]
pub(super) struct PullRequestRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = BigInt)]
    number: i64,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = Nullable<Text>)]
    body: Option<String>,
    #[diesel(sql_type = Text)]
    state: String,
    #[diesel(sql_type = Nullable<Text>)]
    author_login: Option<String>,
    #[diesel(sql_type = BigInt)]
    repository_id: i64,
    #[diesel(sql_type = Text)]
    created_at: String,
    #[diesel(sql_type = Text)]
    updated_at: String,
    #[diesel(sql_type = Nullable<Text>)]
    closed_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    merged_at: Option<String>,
}

impl TryFrom<PullRequestRow> for PullRequest {
    type Error = PersistenceError;

    fn try_from(row: PullRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: from_sql_integer("pull_requests.id", row.id)?,
            number: from_sql_integer("number", row.number)?,
            title: row.title,
            body: row.body,
            state: row.state,
            author_login: row.author_login,
            repository_id: from_sql_integer("repository_id", row.repository_id)?,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            closed_at: parse_optional_timestamp("closed_at", row.closed_at.as_deref())?,
            merged_at: parse_optional_timestamp("merged_at", row.merged_at.as_deref())?,
        })
    }
}

#[derive(Debug, QueryableByName)]
pub(super) struct UserRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Text)]
    login: String,
    #[diesel(sql_type = Nullable<Text>)]
    name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    email: Option<String>,
    #[diesel(sql_type = Text)]
    avatar_url: String,
    #[diesel(sql_type = Nullable<Text>)]
    bio: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    company: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    location: Option<String>,
    #[diesel(sql_type = Text)]
    created_at: String,
    #[diesel(sql_type = Text)]
    updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = PersistenceError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: from_sql_integer("users.id", row.id)?,
            login: row.login,
            name: row.name,
            email: row.email,
            avatar_url: row.avatar_url,
            bio: row.bio,
            company: row.company,
            location: row.location,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
        })
    }
}

/// Converts loaded rows, failing on the first malformed one.
pub(super) fn convert_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, PersistenceError>
where
    T: TryFrom<R, Error = PersistenceError>,
{
    rows.into_iter().map(T::try_from).collect()
}
