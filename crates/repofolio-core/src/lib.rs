// Portfolio logic: aggregation, normalization, ordering and the cache-first facade
pub mod aggregator;
pub mod best_effort;
pub mod cached;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod service;
pub mod sort;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::PortfolioAggregator;
pub use best_effort::best_effort;
pub use cached::{CachedPortfolio, REPOS_KEY, USER_KEY};
pub use config::Config;
pub use error::Error;
pub use models::{Collaborator, Commit, Language, PullRequest, Repository, User};
pub use service::{ApiResponse, RepositoriesService};
pub use sort::sort_repositories;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
