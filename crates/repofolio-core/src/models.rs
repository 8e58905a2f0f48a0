use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository model - the star of the show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// GitHub's id; immutable and the join key for description overrides
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub api_url: String,
    pub git_url: String,
    pub ssh_url: String,
    pub clone_url: String,
    pub svn_url: String,
    pub homepage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub stargazers_count: u32,
    pub open_issues_count: u32,
    pub subscribers_count: u32,
    pub forks_count: u32,
    pub watchers_count: u32,
    pub archived: bool,
    pub private: bool,
    pub fork: bool,
    pub pinned: bool,
    pub language: Option<String>,
    pub license: Option<String>,
    pub default_branch: Option<String>,
    pub owner: String,
    pub languages: Vec<Language>,
    pub collaborators: Vec<Collaborator>,
    pub commits: Vec<Commit>,
    pub pull_requests: Vec<PullRequest>,
    /// Raw markdown, empty when there is none
    pub readme: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
    /// Rounded share of the repository's bytes
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub login: String,
    pub avatar_url: String,
    pub profile_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub author_name: String,
    pub author_date: Option<DateTime<Utc>>,
    /// Full message; shortening it is up to whoever displays it
    pub message: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub author: Option<Collaborator>,
    pub html_url: String,
    pub url: String,
    pub diff_url: String,
    pub patch_url: String,
}

/// The portfolio owner's public profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: String,
    pub html_url: String,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,
}
