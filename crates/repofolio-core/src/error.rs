use repofolio_api::GitHubError;
use repofolio_cache::CacheError;
use thiserror::Error;

/// All the ways an aggregation call can fail
///
/// Callers get distinct kinds so they can pick a UI state or back off:
/// not-found, rate-limited, and everything else upstream are never merged.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("API rate limit exceeded")]
    RateLimitExceeded,

    #[error("GitHub API error: {0}")]
    UpstreamError(String),

    #[error("Pagination mismatch: expected {expected} items, got {actual}")]
    ConsistencyError { expected: u64, actual: u64 },

    #[error("Storage error: {0}")]
    StorageError(#[from] CacheError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<GitHubError> for Error {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::NotFound(what) => Error::RepoNotFound(what),
            GitHubError::RateLimitExceeded => Error::RateLimitExceeded,
            GitHubError::Consistency { expected, actual } => {
                Error::ConsistencyError { expected, actual }
            }
            GitHubError::InvalidConfig(msg) => Error::ConfigError(msg),
            other => Error::UpstreamError(other.to_string()),
        }
    }
}
