// GitHub gateway: transport, pagination and typed payloads
pub mod github;
pub mod pagination;
pub mod transport;
pub mod types;

// Re-export common types
pub use github::{classify, Endpoints, GitHubClient, GitHubError};
pub use pagination::{collect_pages, Page, Termination, MAX_PER_PAGE};
pub use transport::{HttpTransport, RawResponse, Transport, TransportSettings};
pub use types::{
    LanguageBytes, RawAccount, RawCommit, RawPullRequest, RawRepository, RawUser, SearchPage,
};
