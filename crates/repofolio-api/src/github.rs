use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::pagination::{collect_pages, Page, Termination, MAX_PER_PAGE};
use crate::transport::{RawResponse, Transport};
use crate::types::{
    error_message, parse_json, LanguageBytes, PinnedResponse, RawAccount, RawCommit,
    RawPullRequest, RawRepository, RawUser, SearchPage,
};

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
const GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// GitHub reports quota exhaustion in the body, sometimes with a 200
const RATE_LIMIT_MARKER: &str = "API rate limit exceeded";
const NOT_FOUND_MESSAGE: &str = "Not Found";

/// Pinned items are capped at 6 on a GitHub profile
const PINNED_QUERY: &str = r#"query($login: String!) {
  user(login: $login) {
    pinnedItems(first: 6, types: REPOSITORY) {
      nodes { ... on Repository { name } }
    }
  }
}"#;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API rate limit exceeded")]
    RateLimitExceeded,

    #[error("GitHub returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Pagination returned {actual} items but {expected} were declared")]
    Consistency { expected: u64, actual: u64 },

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Where the three GitHub surfaces live. Overridable for GitHub Enterprise and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_url: String,
    pub graphql_url: String,
    pub raw_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_BASE.to_string(),
            graphql_url: GITHUB_GRAPHQL_URL.to_string(),
            raw_url: GITHUB_RAW_BASE.to_string(),
        }
    }
}

/// Sort a response into success or one of the typed failures.
///
/// Order matters: the rate-limit marker wins over everything, then "Not Found"
/// (by status or by message), then any other non-success status or stray
/// error message.
pub fn classify(resource: &str, response: RawResponse) -> Result<String> {
    let message = error_message(&response.body);

    if let Some(msg) = &message {
        if msg.contains(RATE_LIMIT_MARKER) {
            warn!("Rate limit hit while fetching {}", resource);
            return Err(GitHubError::RateLimitExceeded);
        }
    }

    if response.status == 404 || message.as_deref() == Some(NOT_FOUND_MESSAGE) {
        return Err(GitHubError::NotFound(resource.to_string()));
    }

    if !response.is_success() {
        return Err(GitHubError::Upstream {
            status: response.status,
            message: message.unwrap_or(response.body),
        });
    }

    if let Some(msg) = message {
        return Err(GitHubError::Upstream {
            status: response.status,
            message: msg,
        });
    }

    Ok(response.body)
}

/// Percent-encode each `/`-separated segment, keeping the separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read-only GitHub client covering exactly what the portfolio needs
pub struct GitHubClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
}

impl GitHubClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_endpoints(transport, Endpoints::default())
    }

    pub fn with_endpoints(transport: Arc<dyn Transport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, resource: &str, url: &str) -> Result<T> {
        let response = self.transport.get(url).await?;
        let body = classify(resource, response)?;
        parse_json(resource, &body)
    }

    fn repo_url(&self, owner: &str, name: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.endpoints.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(name)
        )
    }

    /// Get one repository record
    pub async fn get_repository(&self, owner: &str, name: &str) -> Result<RawRepository> {
        let resource = format!("{}/{}", owner, name);
        self.get_json(&resource, &self.repo_url(owner, name)).await
    }

    /// One page of the owner's repositories from the search API, forks included
    pub async fn search_page(&self, owner: &str, page: u32, per_page: u32) -> Result<SearchPage> {
        let query = format!("user:{} fork:true", owner);
        let url = format!(
            "{}/search/repositories?q={}&page={}&per_page={}",
            self.endpoints.api_url,
            urlencoding::encode(&query),
            page,
            per_page
        );
        let page: SearchPage = self.get_json(&format!("repositories of {}", owner), &url).await?;
        if page.incomplete_results {
            warn!("Search results for {} are flagged incomplete", owner);
        }
        Ok(page)
    }

    /// Every repository the owner has, accumulated to the declared `total_count`
    pub async fn search_owner_repositories(&self, owner: &str) -> Result<Vec<RawRepository>> {
        self.search_owner_repositories_paged(owner, MAX_PER_PAGE).await
    }

    pub async fn search_owner_repositories_paged(
        &self,
        owner: &str,
        per_page: u32,
    ) -> Result<Vec<RawRepository>> {
        let repos = collect_pages(Termination::DeclaredTotal, |page| async move {
            let result = self.search_page(owner, page, per_page).await?;
            Ok(Page::with_total(result.items, result.total_count))
        })
        .await?;
        debug!("Collected {} repositories for {}", repos.len(), owner);
        Ok(repos)
    }

    /// Full commit history, 100 per page until GitHub hands back an empty page
    pub async fn list_commits(&self, owner: &str, name: &str) -> Result<Vec<RawCommit>> {
        let base = self.repo_url(owner, name);
        let resource = format!("commits of {}/{}", owner, name);
        let base = base.as_str();
        let resource = resource.as_str();

        collect_pages(Termination::EmptyPage, |page| async move {
            let url = format!("{}/commits?page={}&per_page={}", base, page, MAX_PER_PAGE);
            let commits: Vec<RawCommit> = self.get_json(resource, &url).await?;
            Ok(Page::unbounded(commits))
        })
        .await
    }

    pub async fn get_collaborators(&self, owner: &str, name: &str) -> Result<Vec<RawAccount>> {
        let url = format!("{}/collaborators", self.repo_url(owner, name));
        self.get_json(&format!("collaborators of {}/{}", owner, name), &url)
            .await
    }

    pub async fn get_languages(&self, owner: &str, name: &str) -> Result<LanguageBytes> {
        let url = format!("{}/languages", self.repo_url(owner, name));
        self.get_json(&format!("languages of {}/{}", owner, name), &url)
            .await
    }

    pub async fn get_pull_requests(&self, owner: &str, name: &str) -> Result<Vec<RawPullRequest>> {
        let url = format!("{}/pulls", self.repo_url(owner, name));
        self.get_json(&format!("pull requests of {}/{}", owner, name), &url)
            .await
    }

    /// Raw README.md from the given branch. The branch is not verified first.
    pub async fn get_readme(&self, owner: &str, name: &str, branch: &str) -> Result<String> {
        let url = format!(
            "{}/{}/{}/{}/README.md",
            self.endpoints.raw_url,
            urlencoding::encode(owner),
            urlencoding::encode(name),
            encode_path(branch)
        );
        let response = self.transport.get(&url).await?;
        let resource = format!("README of {}/{}", owner, name);

        // Markdown body on success, so a 2xx is taken as-is
        match response.status {
            200..=299 => Ok(response.body),
            404 => Err(GitHubError::NotFound(resource)),
            _ => classify(&resource, response),
        }
    }

    /// Names of the repositories pinned on the owner's profile, via GraphQL
    pub async fn get_pinned_names(&self, owner: &str) -> Result<Vec<String>> {
        let body = json!({
            "query": PINNED_QUERY,
            "variables": { "login": owner },
        });
        let response = self
            .transport
            .post_json(&self.endpoints.graphql_url, body)
            .await?;
        let resource = format!("pinned items of {}", owner);
        let body = classify(&resource, response)?;
        let parsed: PinnedResponse = parse_json(&resource, &body)?;

        if let Some(first) = parsed.errors.first() {
            if first.message.contains(RATE_LIMIT_MARKER) {
                return Err(GitHubError::RateLimitExceeded);
            }
            return Err(GitHubError::Upstream {
                status: 200,
                message: first.message.clone(),
            });
        }

        let user = parsed
            .data
            .and_then(|data| data.user)
            .ok_or_else(|| GitHubError::NotFound(owner.to_string()))?;

        Ok(user
            .pinned_items
            .nodes
            .into_iter()
            .filter_map(|node| node.name)
            .collect())
    }

    /// Public profile of an account
    pub async fn get_user(&self, login: &str) -> Result<RawUser> {
        let url = format!("{}/users/{}", self.endpoints.api_url, urlencoding::encode(login));
        self.get_json(&format!("user {}", login), &url).await
    }
}
