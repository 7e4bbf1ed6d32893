//! Listing of stored records.

use std::io::{self, Write};

use hubcrawl::persistence::{
    IssueFilter, IssueStore, PullRequestStore, RepositoryFilter, RepositoryStore,
    SqliteRecordStore, UserFilter, UserStore,
};
use hubcrawl::{HubcrawlConfig, IntakeError, ListTarget};

use super::output::{write_issues, write_pull_requests, write_repositories, write_users};
use super::persistence_error;

/// Prints the records selected by `--list` from the configured database.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] if the database URL or list target
/// is missing or invalid, or the database has not been migrated.
/// Returns [`IntakeError::Io`] for query failures.
pub fn run(config: &HubcrawlConfig) -> Result<(), IntakeError> {
    let database_url = config.require_database_url()?;
    let store =
        SqliteRecordStore::new(database_url).map_err(|error| persistence_error(&error))?;
    let mut stdout = io::stdout().lock();
    list_records(&store, config, &mut stdout)
}

/// Lists records from `store` using the filters in `config`.
///
/// This function is exposed for testing with in-memory stores.
pub fn list_records<S, W>(
    store: &S,
    config: &HubcrawlConfig,
    writer: &mut W,
) -> Result<(), IntakeError>
where
    S: RepositoryStore + IssueStore + PullRequestStore + UserStore,
    W: Write,
{
    let window = config.list_window();
    match config.list_target()? {
        ListTarget::Repositories => {
            let filter = RepositoryFilter {
                owner_login: config.owner.clone(),
                language: config.language.clone(),
                min_stars: config.min_stars,
                window,
            };
            let repositories = store
                .list_repositories(&filter)
                .map_err(|error| persistence_error(&error))?;
            write_repositories(writer, &repositories)
        }
        ListTarget::Issues => {
            let issues = store
                .list_issues(&issue_filter(config))
                .map_err(|error| persistence_error(&error))?;
            write_issues(writer, &issues)
        }
        ListTarget::PullRequests => {
            let pull_requests = store
                .list_pull_requests(&issue_filter(config))
                .map_err(|error| persistence_error(&error))?;
            write_pull_requests(writer, &pull_requests)
        }
        ListTarget::Users => {
            let filter = UserFilter {
                login: config.login.clone(),
                window,
            };
            let users = store
                .list_users(&filter)
                .map_err(|error| persistence_error(&error))?;
            write_users(writer, &users)
        }
    }
}

fn issue_filter(config: &HubcrawlConfig) -> IssueFilter {
    IssueFilter {
        repository_id: config.repository_id,
        state: config.state.clone(),
        window: config.list_window(),
    }
}

#[cfg(test)]
mod tests {
    use hubcrawl::github::models::test_support::{sample_issue, sample_repository, sample_user};
    use hubcrawl::persistence::{InMemoryRecordStore, IssueStore, RepositoryStore, UserStore};
    use hubcrawl::{HubcrawlConfig, IntakeError};
    use rstest::{fixture, rstest};

    use super::{list_records, run};
    use crate::cli::test_utils::utf8;

    #[fixture]
    fn store() -> InMemoryRecordStore {
        let store = InMemoryRecordStore::new();
        let repositories = [
            (1, "octo", "cat", 5),
            (2, "octo", "dog", 50),
            (3, "hubot", "bot", 20),
        ];
        for (id, owner, name, stars) in repositories {
            let mut repository = sample_repository(id, owner, name);
            repository.stargazers_count = stars;
            store
                .save_repository(&repository)
                .expect("save should succeed");
        }
        let mut closed = sample_issue(11, 2, 1);
        closed.state = "closed".to_owned();
        for issue in [sample_issue(10, 1, 1), closed, sample_issue(12, 3, 2)] {
            store.save_issue(&issue).expect("save should succeed");
        }
        store
            .save_user(&sample_user(100, "octo"))
            .expect("save should succeed");
        store
    }

    fn list_config(target: &str) -> HubcrawlConfig {
        HubcrawlConfig {
            list: Some(target.to_owned()),
            ..HubcrawlConfig::default()
        }
    }

    #[rstest]
    fn repositories_are_filtered_by_owner_and_sorted_by_stars(store: InMemoryRecordStore) {
        let config = HubcrawlConfig {
            owner: Some("octo".to_owned()),
            ..list_config("repositories")
        };
        let mut output = Vec::new();

        list_records(&store, &config, &mut output).expect("listing should succeed");

        assert_eq!(
            utf8(output),
            "  octo/dog [Rust] 50 stars (id 2)\n  octo/cat [Rust] 5 stars (id 1)\n2 repositories shown\n"
        );
    }

    #[rstest]
    fn issues_respect_repository_and_state(store: InMemoryRecordStore) {
        let config = HubcrawlConfig {
            repository_id: Some(1),
            state: Some("open".to_owned()),
            ..list_config("issues")
        };
        let mut output = Vec::new();

        list_records(&store, &config, &mut output).expect("listing should succeed");

        assert_eq!(
            utf8(output),
            "  #1 [open] Issue 1 (@octocat)\n1 issues shown\n"
        );
    }

    #[rstest]
    fn limit_trims_the_listing(store: InMemoryRecordStore) {
        let config = HubcrawlConfig {
            limit: 1,
            ..list_config("repositories")
        };
        let mut output = Vec::new();

        list_records(&store, &config, &mut output).expect("listing should succeed");

        assert!(utf8(output).ends_with("1 repositories shown\n"));
    }

    #[rstest]
    fn unknown_target_is_rejected(store: InMemoryRecordStore) {
        let result = list_records(&store, &list_config("gists"), &mut Vec::new());

        assert!(matches!(result, Err(IntakeError::Configuration { .. })));
    }

    #[test]
    fn listing_without_database_url_is_a_configuration_error() {
        let result = run(&list_config("users"));

        assert!(matches!(
            result,
            Err(IntakeError::Configuration { message }) if message.contains("database URL")
        ));
    }
}
