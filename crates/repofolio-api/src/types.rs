// Typed shapes of the GitHub payloads we consume.
// Anything that does not fit these fails closed with UnexpectedShape.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::github::{GitHubError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    /// API url of the repository
    pub url: String,
    #[serde(default)]
    pub git_url: String,
    #[serde(default)]
    pub ssh_url: String,
    #[serde(default)]
    pub clone_url: String,
    #[serde(default)]
    pub svn_url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub open_issues_count: u32,
    /// Only present on the single-repository endpoint
    #[serde(default)]
    pub subscribers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub watchers_count: u32,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    pub language: Option<String>,
    #[serde(default)]
    pub license: Option<RawLicense>,
    #[serde(default)]
    pub default_branch: Option<String>,
    pub owner: RawAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLicense {
    pub name: String,
}

/// Owner, collaborator and pull request author all share this shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAccount {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
}

/// One page of `/search/repositories`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<RawRepository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommit {
    pub sha: String,
    pub html_url: String,
    pub commit: RawCommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommitDetail {
    pub message: String,
    pub author: Option<RawCommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommitAuthor {
    pub name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user: Option<RawAccount>,
    pub html_url: String,
    pub url: String,
    #[serde(default)]
    pub diff_url: String,
    #[serde(default)]
    pub patch_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub login: String,
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
}

/// Byte counts from `/languages`, kept in the order GitHub declared them.
///
/// A plain map would lose that order, and the order is the tie-break when two
/// languages round to the same percentage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageBytes(pub Vec<(String, u64)>);

impl LanguageBytes {
    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, bytes)| bytes).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for LanguageBytes {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LanguageBytesVisitor;

        impl<'de> Visitor<'de> for LanguageBytesVisitor {
            type Value = LanguageBytes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of language name to byte count")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, bytes)) = map.next_entry::<String, u64>()? {
                    entries.push((name, bytes));
                }
                Ok(LanguageBytes(entries))
            }
        }

        deserializer.deserialize_map(LanguageBytesVisitor)
    }
}

/// GraphQL reply for the pinned items query
#[derive(Debug, Deserialize)]
pub(crate) struct PinnedResponse {
    pub data: Option<PinnedData>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PinnedData {
    pub user: Option<PinnedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PinnedUser {
    pub pinned_items: PinnedItems,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PinnedItems {
    pub nodes: Vec<PinnedNode>,
}

/// Non-repository pinned items (gists) come back as empty objects
#[derive(Debug, Deserialize)]
pub(crate) struct PinnedNode {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

/// GitHub's error envelope, e.g. `{"message": "Not Found", "documentation_url": ...}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

/// Pull the `message` field out of a body, if the body is a JSON object carrying one
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message)
}

/// Parse a body into `T`, naming the resource in the error when it does not fit
pub fn parse_json<T: DeserializeOwned>(resource: &str, body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| GitHubError::UnexpectedShape(format!("{}: {}", resource, e)))
}
