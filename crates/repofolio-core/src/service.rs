// Status-coded responses for the portfolio's HTTP handlers
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::aggregator::PortfolioAggregator;
use crate::Error;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;

/// What a route handler sends back: a status and a JSON body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status: STATUS_OK, body },
            Err(e) => Self::message(STATUS_BAD_REQUEST, &e.to_string()),
        }
    }

    pub fn message(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "message": message }),
        }
    }

    fn from_error(what: &str, err: Error) -> Self {
        error!("Error fetching {}: {}", what, err);
        match err {
            Error::RepoNotFound(_) => Self::message(STATUS_NOT_FOUND, "Repo not found"),
            other => Self::message(STATUS_BAD_REQUEST, &other.to_string()),
        }
    }
}

/// No caching here; every call goes to GitHub
pub struct RepositoriesService {
    aggregator: PortfolioAggregator,
}

impl RepositoriesService {
    pub fn new(aggregator: PortfolioAggregator) -> Self {
        Self { aggregator }
    }

    /// One repository when `name` is given, otherwise the full sorted list
    pub async fn get_repositories(&self, name: Option<&str>) -> ApiResponse {
        match name {
            Some(name) => match self.aggregator.get_repo(name).await {
                Ok(Some(repo)) => ApiResponse::ok(&repo),
                Ok(None) => ApiResponse::message(STATUS_NOT_FOUND, "Repo not found"),
                Err(e) => ApiResponse::from_error(name, e),
            },
            None => match self.aggregator.get_repos().await {
                Ok(repos) if repos.is_empty() => ApiResponse {
                    status: STATUS_NOT_FOUND,
                    body: json!([]),
                },
                Ok(repos) => ApiResponse::ok(&repos),
                Err(e) => ApiResponse::from_error("repositories", e),
            },
        }
    }

    pub async fn get_commits(&self, name: &str) -> ApiResponse {
        match self.aggregator.get_commits(name).await {
            Ok(Some(commits)) => ApiResponse::ok(&commits),
            Ok(None) => ApiResponse::message(STATUS_NOT_FOUND, "Repo not found"),
            Err(e) => ApiResponse::from_error(name, e),
        }
    }

    pub async fn get_user(&self) -> ApiResponse {
        match self.aggregator.get_user().await {
            Ok(user) => ApiResponse::ok(&user),
            Err(e) => ApiResponse::from_error("user", e),
        }
    }
}
