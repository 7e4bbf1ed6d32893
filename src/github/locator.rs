//! Validated identity wrappers for the GitHub resources being ingested.

use url::Url;

use super::error::IntakeError;
use super::pagination::PageRequest;

/// Public GitHub REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    /// Validates that the owner is present and fits in one path segment.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] for `owner` when blank, or
    /// [`IntakeError::InvalidName`] when it contains path delimiters.
    pub fn new(value: &str) -> Result<Self, IntakeError> {
        IntakeError::require_segment("owner", value).map(|owner| Self(owner.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validates that the repository name is present and fits in one path
    /// segment.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] for `repository` when blank, or
    /// [`IntakeError::InvalidName`] when it contains path delimiters.
    pub fn new(value: &str) -> Result<Self, IntakeError> {
        IntakeError::require_segment("repository", value).map(|name| Self(name.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Owner and name of a repository.
///
/// # Example
///
/// ```
/// use hubcrawl::github::locator::RepositoryLocator;
///
/// let locator = RepositoryLocator::new("octo", "hello-world")
///     .expect("owner and name are present");
/// assert_eq!(locator.full_name(), "octo/hello-world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Creates a locator from owner and repository name strings.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] when either part is blank.
    pub fn new(owner: &str, repository: &str) -> Result<Self, IntakeError> {
        Ok(Self {
            owner: RepositoryOwner::new(owner)?,
            repository: RepositoryName::new(repository)?,
        })
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// `owner/name` form used in logs and summaries.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.as_str(), self.repository.as_str())
    }

    pub(crate) fn repository_path(&self) -> String {
        format!(
            "/repos/{}/{}",
            self.owner.as_str(),
            self.repository.as_str()
        )
    }

    pub(crate) fn issues_path(&self, request: PageRequest) -> String {
        self.listing_path("issues", request)
    }

    pub(crate) fn pulls_path(&self, request: PageRequest) -> String {
        self.listing_path("pulls", request)
    }

    fn listing_path(&self, collection: &str, request: PageRequest) -> String {
        format!(
            "{}/{collection}?state=all&sort=created&direction=desc&page={}&per_page={}",
            self.repository_path(),
            request.page(),
            request.per_page()
        )
    }
}

/// GitHub user login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLogin(String);

impl UserLogin {
    /// Validates that the login is present and fits in one path segment.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] for `login` when blank, or
    /// [`IntakeError::InvalidName`] when it contains path delimiters.
    pub fn new(value: &str) -> Result<Self, IntakeError> {
        IntakeError::require_segment("login", value).map(|login| Self(login.to_owned()))
    }

    /// Borrow the login.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub(crate) fn user_path(&self) -> String {
        format!("/users/{}", self.0)
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, IntakeError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IntakeError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("PersonalAccessToken(***)")
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

/// Parses the REST API base, falling back to the public GitHub API.
///
/// # Errors
///
/// Returns [`IntakeError::InvalidUrl`] when `value` is not an absolute URL.
pub fn parse_api_base(value: Option<&str>) -> Result<Url, IntakeError> {
    let raw = value
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .unwrap_or(DEFAULT_API_BASE);
    Url::parse(raw).map_err(|error| IntakeError::InvalidUrl(format!("{raw}: {error}")))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        DEFAULT_API_BASE, PersonalAccessToken, RepositoryLocator, UserLogin, parse_api_base,
    };
    use crate::github::error::IntakeError;
    use crate::github::pagination::PageRequest;

    #[rstest]
    #[case::blank_owner("", "repo", "owner")]
    #[case::whitespace_owner("  ", "repo", "owner")]
    #[case::blank_repository("octo", "", "repository")]
    fn locator_rejects_blank_parts(
        #[case] owner: &str,
        #[case] repository: &str,
        #[case] field: &'static str,
    ) {
        assert_eq!(
            RepositoryLocator::new(owner, repository),
            Err(IntakeError::MissingField { field })
        );
    }

    #[rstest]
    #[case::nested_path("octocat/repos", "cat", "owner")]
    #[case::query("octo", "cat?per_page=1", "repository")]
    #[case::fragment("octo", "cat#readme", "repository")]
    #[case::encoded_slash("octo%2Fcat", "cat", "owner")]
    #[case::inner_space("octo cat", "cat", "owner")]
    fn locator_rejects_path_delimiters(
        #[case] owner: &str,
        #[case] repository: &str,
        #[case] field: &'static str,
    ) {
        let Err(IntakeError::InvalidName { field: rejected, .. }) =
            RepositoryLocator::new(owner, repository)
        else {
            panic!("expected {owner}/{repository} to be rejected");
        };

        assert_eq!(rejected, field);
    }

    #[test]
    fn login_rejects_path_delimiters() {
        assert_eq!(
            UserLogin::new("octocat/repos"),
            Err(IntakeError::InvalidName {
                field: "login",
                value: "octocat/repos".to_owned(),
            })
        );
    }

    #[test]
    fn locator_builds_listing_paths() {
        let locator = RepositoryLocator::new("octo", "cat").expect("valid locator");

        assert_eq!(locator.repository_path(), "/repos/octo/cat");
        assert_eq!(
            locator.issues_path(PageRequest::new(2, 50).expect("valid page")),
            "/repos/octo/cat/issues?state=all&sort=created&direction=desc&page=2&per_page=50"
        );
        assert_eq!(
            locator.pulls_path(PageRequest::new(1, 100).expect("valid page")),
            "/repos/octo/cat/pulls?state=all&sort=created&direction=desc&page=1&per_page=100"
        );
    }

    #[test]
    fn login_is_trimmed_and_required() {
        assert_eq!(
            UserLogin::new(" "),
            Err(IntakeError::MissingField { field: "login" })
        );
        let login = UserLogin::new(" octocat ").expect("valid login");
        assert_eq!(login.user_path(), "/users/octocat");
    }

    #[test]
    fn token_debug_output_is_redacted() {
        let token = PersonalAccessToken::new("ghp_secret").expect("valid token");
        assert!(!format!("{token:?}").contains("ghp_secret"));
    }

    #[rstest]
    #[case::absent(None)]
    #[case::blank(Some("  "))]
    fn api_base_defaults_to_public_github(#[case] value: Option<&str>) {
        let url = parse_api_base(value).expect("default should parse");
        assert_eq!(url.as_str().trim_end_matches('/'), DEFAULT_API_BASE);
    }

    #[test]
    fn api_base_rejects_relative_urls() {
        assert!(matches!(
            parse_api_base(Some("not a url")),
            Err(IntakeError::InvalidUrl(_))
        ));
    }
}
