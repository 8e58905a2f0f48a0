// The aggregation facade: everything the portfolio pages ask GitHub for
use std::collections::HashSet;
use std::sync::Arc;

use repofolio_api::{GitHubClient, GitHubError, HttpTransport, RawRepository};
use repofolio_cache::{DescriptionOverride, DescriptionStore};
use tracing::{debug, info};

use crate::best_effort::best_effort;
use crate::config::Config;
use crate::models::{Commit, Repository, User};
use crate::normalize::{normalize, to_commit, to_user, Auxiliary};
use crate::sort::sort_repositories;
use crate::Result;

/// Branch assumed for README lookups when the record does not name one
const FALLBACK_BRANCH: &str = "main";

pub struct PortfolioAggregator {
    client: GitHubClient,
    owner: String,
    descriptions: Arc<dyn DescriptionStore>,
}

impl PortfolioAggregator {
    pub fn new(
        client: GitHubClient,
        owner: impl Into<String>,
        descriptions: Arc<dyn DescriptionStore>,
    ) -> Self {
        Self {
            client,
            owner: owner.into(),
            descriptions,
        }
    }

    /// Build the real HTTP-backed aggregator from configuration
    pub fn from_config(config: &Config, descriptions: Arc<dyn DescriptionStore>) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.github.transport_settings())?;
        let client = GitHubClient::with_endpoints(Arc::new(transport), config.github.endpoints());
        Ok(Self::new(client, config.github.owner.clone(), descriptions))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// All portfolio repositories in display order.
    ///
    /// Forks are listed only when pinned. A failed pinned lookup just means
    /// nothing is pinned.
    pub async fn get_repos(&self) -> Result<Vec<Repository>> {
        let raw_repos = self.client.search_owner_repositories(&self.owner).await?;
        let pinned = self.pinned_names().await;

        let mut seen = HashSet::new();
        let mut repos = Vec::with_capacity(raw_repos.len());

        for raw in raw_repos {
            if !seen.insert(raw.id) {
                debug!("Skipping duplicate repository id {}", raw.id);
                continue;
            }

            let is_pinned = pinned.contains(&raw.name);
            if raw.fork && !is_pinned {
                continue;
            }

            let description_override = self.ensure_description(&raw)?;
            repos.push(normalize(
                raw,
                Auxiliary {
                    pinned: is_pinned,
                    description_override,
                    ..Auxiliary::default()
                },
            ));
        }

        let repos = sort_repositories(repos);
        info!("Aggregated {} repositories for {}", repos.len(), self.owner);
        Ok(repos)
    }

    /// One repository with every sub-resource we can get.
    ///
    /// `Ok(None)` means GitHub does not know the repository. Rate limiting and
    /// other upstream failures come back as errors, never as a partial object.
    pub async fn get_repo(&self, name: &str) -> Result<Option<Repository>> {
        let raw = match self.client.get_repository(&self.owner, name).await {
            Ok(raw) => raw,
            Err(GitHubError::NotFound(_)) => {
                info!("Repository {} not found", name);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let owner = self.owner.as_str();
        let repo_name = raw.name.clone();
        let branch = raw
            .default_branch
            .clone()
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string());

        // No ordering between these, so they go out together
        let (collaborators, languages, pull_requests, readme, commits, pinned) = tokio::join!(
            best_effort("collaborators", self.client.get_collaborators(owner, &repo_name)),
            best_effort("languages", self.client.get_languages(owner, &repo_name)),
            best_effort("pull requests", self.client.get_pull_requests(owner, &repo_name)),
            best_effort("README", self.client.get_readme(owner, &repo_name, &branch)),
            best_effort("commits", self.client.list_commits(owner, &repo_name)),
            best_effort("pinned repositories", self.client.get_pinned_names(owner)),
        );

        let description_override = self.ensure_description(&raw)?;
        let is_pinned = pinned.iter().any(|p| p == &repo_name);

        Ok(Some(normalize(
            raw,
            Auxiliary {
                collaborators,
                languages,
                pull_requests,
                commits,
                readme,
                pinned: is_pinned,
                description_override,
            },
        )))
    }

    /// Full commit history of one repository, `Ok(None)` if it does not exist
    pub async fn get_commits(&self, name: &str) -> Result<Option<Vec<Commit>>> {
        match self.client.list_commits(&self.owner, name).await {
            Ok(commits) => Ok(Some(commits.into_iter().map(to_commit).collect())),
            Err(GitHubError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The owner's public profile
    pub async fn get_user(&self) -> Result<User> {
        let raw = self.client.get_user(&self.owner).await?;
        Ok(to_user(raw))
    }

    /// Store the given descriptions as the overrides for their repositories
    pub fn save_descriptions(&self, repos: &[Repository]) -> Result<()> {
        for repo in repos {
            self.descriptions.upsert(&DescriptionOverride {
                repo_id: repo.id,
                name: repo.name.clone(),
                url: repo.html_url.clone(),
                description: repo.description.clone(),
            })?;
        }
        info!("Saved {} repository descriptions", repos.len());
        Ok(())
    }

    async fn pinned_names(&self) -> HashSet<String> {
        best_effort("pinned repositories", self.client.get_pinned_names(&self.owner))
            .await
            .into_iter()
            .collect()
    }

    /// First sighting creates the record from GitHub's description; then read it back
    fn ensure_description(&self, raw: &RawRepository) -> Result<Option<DescriptionOverride>> {
        let created = self.descriptions.create_if_absent(&DescriptionOverride {
            repo_id: raw.id,
            name: raw.name.clone(),
            url: raw.html_url.clone(),
            description: raw.description.clone(),
        })?;
        if created {
            debug!("Created description record for {}", raw.name);
        }
        Ok(self.descriptions.get(raw.id)?)
    }
}
