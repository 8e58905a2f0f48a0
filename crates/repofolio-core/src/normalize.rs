// Raw GitHub payloads in, canonical Repository out
use repofolio_api::{LanguageBytes, RawAccount, RawCommit, RawPullRequest, RawRepository, RawUser};
use repofolio_cache::DescriptionOverride;

use crate::models::{Collaborator, Commit, Language, PullRequest, Repository, User};

/// Sub-resources fetched alongside a repository record.
///
/// Every field is optional in practice: whatever could not be fetched stays at
/// its default (empty list, empty string, not pinned, no override).
#[derive(Debug, Clone, Default)]
pub struct Auxiliary {
    pub collaborators: Vec<RawAccount>,
    pub languages: LanguageBytes,
    pub pull_requests: Vec<RawPullRequest>,
    pub commits: Vec<RawCommit>,
    pub readme: String,
    pub pinned: bool,
    pub description_override: Option<DescriptionOverride>,
}

pub fn normalize(raw: RawRepository, aux: Auxiliary) -> Repository {
    let owner = raw.owner.login;
    let collaborators = owner_first(
        &owner,
        aux.collaborators.into_iter().map(to_collaborator).collect(),
    );

    let mut repo = Repository {
        id: raw.id,
        name: raw.name,
        full_name: raw.full_name,
        description: raw.description,
        html_url: raw.html_url,
        api_url: raw.url,
        git_url: raw.git_url,
        ssh_url: raw.ssh_url,
        clone_url: raw.clone_url,
        svn_url: raw.svn_url,
        homepage: raw.homepage.filter(|h| !h.is_empty()),
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        stargazers_count: raw.stargazers_count,
        open_issues_count: raw.open_issues_count,
        subscribers_count: raw.subscribers_count,
        forks_count: raw.forks_count,
        watchers_count: raw.watchers_count,
        archived: raw.archived,
        private: raw.private,
        fork: raw.fork,
        pinned: aux.pinned,
        language: raw.language,
        license: raw.license.map(|l| l.name),
        default_branch: raw.default_branch,
        owner,
        languages: language_percentages(&aux.languages),
        collaborators,
        commits: aux.commits.into_iter().map(to_commit).collect(),
        pull_requests: aux.pull_requests.into_iter().map(to_pull_request).collect(),
        readme: aux.readme,
    };

    if let Some(record) = aux.description_override {
        apply_override(&mut repo, &record);
    }

    repo
}

/// A stored description replaces GitHub's; a stored null leaves GitHub's alone
pub fn apply_override(repo: &mut Repository, record: &DescriptionOverride) {
    if let Some(description) = &record.description {
        repo.description = Some(description.clone());
    }
}

/// round(bytes / total * 100) per language, highest share first.
///
/// The sort is stable, so equal percentages keep GitHub's declaration order.
pub fn language_percentages(bytes: &LanguageBytes) -> Vec<Language> {
    let total = bytes.total();

    let mut languages: Vec<Language> = bytes
        .0
        .iter()
        .map(|(name, count)| Language {
            name: name.clone(),
            percentage: if total == 0 {
                0
            } else {
                ((*count as f64 / total as f64) * 100.0).round() as u32
            },
        })
        .collect();

    languages.sort_by(|a, b| b.percentage.cmp(&a.percentage));
    languages
}

/// Move the owner's entry to the front; everyone else keeps API order
pub fn owner_first(owner: &str, mut collaborators: Vec<Collaborator>) -> Vec<Collaborator> {
    if let Some(pos) = collaborators
        .iter()
        .position(|c| c.login.eq_ignore_ascii_case(owner))
    {
        let owner_entry = collaborators.remove(pos);
        collaborators.insert(0, owner_entry);
    }
    collaborators
}

fn to_collaborator(account: RawAccount) -> Collaborator {
    Collaborator {
        login: account.login,
        avatar_url: account.avatar_url,
        profile_url: account.html_url,
    }
}

pub fn to_commit(raw: RawCommit) -> Commit {
    let (author_name, author_date) = match raw.commit.author {
        Some(author) => (author.name, Some(author.date)),
        None => (String::new(), None),
    };

    Commit {
        author_name,
        author_date,
        message: raw.commit.message,
        url: raw.html_url,
    }
}

fn to_pull_request(raw: RawPullRequest) -> PullRequest {
    PullRequest {
        id: raw.id,
        number: raw.number,
        title: raw.title,
        body: raw.body,
        author: raw.user.map(to_collaborator),
        html_url: raw.html_url,
        url: raw.url,
        diff_url: raw.diff_url,
        patch_url: raw.patch_url,
    }
}

pub fn to_user(raw: RawUser) -> User {
    User {
        login: raw.login,
        name: raw.name,
        avatar_url: raw.avatar_url,
        html_url: raw.html_url,
        bio: raw.bio,
        company: raw.company,
        location: raw.location,
        blog: raw.blog.filter(|b| !b.is_empty()),
        public_repos: raw.public_repos,
        followers: raw.followers,
        following: raw.following,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_repo() -> RawRepository {
        serde_json::from_value(serde_json::json!({
            "id": 99,
            "name": "NETVOD",
            "full_name": "Flotss/NETVOD",
            "description": "Streaming platform",
            "html_url": "https://github.com/Flotss/NETVOD",
            "url": "https://api.github.com/repos/Flotss/NETVOD",
            "clone_url": "https://github.com/Flotss/NETVOD.git",
            "homepage": "",
            "created_at": "2022-10-01T08:00:00Z",
            "updated_at": "2024-02-01T08:00:00Z",
            "stargazers_count": 3,
            "subscribers_count": 2,
            "language": "PHP",
            "license": {"name": "MIT License"},
            "default_branch": "master",
            "owner": {"login": "Flotss"}
        }))
        .unwrap()
    }

    fn account(login: &str) -> RawAccount {
        RawAccount {
            login: login.to_string(),
            avatar_url: format!("https://avatars/{}", login),
            html_url: format!("https://github.com/{}", login),
        }
    }

    fn langs(entries: &[(&str, u64)]) -> LanguageBytes {
        LanguageBytes(entries.iter().map(|(n, b)| (n.to_string(), *b)).collect())
    }

    #[test]
    fn test_percentages_rounded_and_sorted() {
        let result = language_percentages(&langs(&[("CSS", 100), ("PHP", 700), ("JavaScript", 200)]));
        assert_eq!(
            result,
            vec![
                Language { name: "PHP".into(), percentage: 70 },
                Language { name: "JavaScript".into(), percentage: 20 },
                Language { name: "CSS".into(), percentage: 10 },
            ]
        );
    }

    #[test]
    fn test_percentage_ties_keep_declaration_order() {
        let result = language_percentages(&langs(&[("Shell", 1), ("Rust", 1), ("C", 1)]));
        let names: Vec<_> = result.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Shell", "Rust", "C"]);
        // 33 * 3, rounding means the sum need not be 100
        assert!(result.iter().all(|l| l.percentage == 33));
    }

    #[test]
    fn test_half_rounds_up() {
        let result = language_percentages(&langs(&[("A", 1), ("B", 7)]));
        assert_eq!(result[0].percentage, 88); // 87.5
        assert_eq!(result[1].percentage, 13); // 12.5
    }

    #[test]
    fn test_no_languages() {
        assert!(language_percentages(&LanguageBytes::default()).is_empty());
        let zero = language_percentages(&langs(&[("Markdown", 0)]));
        assert_eq!(zero[0].percentage, 0);
    }

    #[test]
    fn test_owner_sorted_first() {
        let collaborators = vec![
            to_collaborator(account("alice")),
            to_collaborator(account("bob")),
            to_collaborator(account("flotss")),
        ];
        let ordered = owner_first("Flotss", collaborators);
        let logins: Vec<_> = ordered.iter().map(|c| c.login.as_str()).collect();
        assert_eq!(logins, vec!["flotss", "alice", "bob"]);
    }

    #[test]
    fn test_owner_absent_keeps_order() {
        let collaborators = vec![to_collaborator(account("bob")), to_collaborator(account("alice"))];
        let ordered = owner_first("Flotss", collaborators.clone());
        assert_eq!(ordered, collaborators);
    }

    #[test]
    fn test_normalize_with_missing_sub_resources() {
        let repo = normalize(raw_repo(), Auxiliary::default());

        assert_eq!(repo.id, 99);
        assert_eq!(repo.api_url, "https://api.github.com/repos/Flotss/NETVOD");
        assert_eq!(repo.license.as_deref(), Some("MIT License"));
        assert_eq!(repo.subscribers_count, 2);
        assert_eq!(repo.homepage, None);
        assert!(repo.languages.is_empty());
        assert!(repo.collaborators.is_empty());
        assert!(repo.pull_requests.is_empty());
        assert!(repo.commits.is_empty());
        assert_eq!(repo.readme, "");
        assert!(!repo.pinned);
    }

    #[test]
    fn test_normalize_full() {
        let commit: RawCommit = serde_json::from_value(serde_json::json!({
            "sha": "abc",
            "html_url": "https://github.com/Flotss/NETVOD/commit/abc",
            "commit": {
                "message": "A very long commit message that nobody should truncate here",
                "author": {"name": "Florian", "date": "2024-01-01T00:00:00Z"}
            }
        }))
        .unwrap();

        let aux = Auxiliary {
            collaborators: vec![account("alice"), account("Flotss")],
            languages: langs(&[("PHP", 3), ("CSS", 1)]),
            commits: vec![commit],
            readme: "# NETVOD".to_string(),
            pinned: true,
            description_override: Some(DescriptionOverride {
                repo_id: 99,
                name: "NETVOD".into(),
                url: "https://github.com/Flotss/NETVOD".into(),
                description: Some("Hand written".into()),
            }),
            ..Auxiliary::default()
        };

        let repo = normalize(raw_repo(), aux);
        assert_eq!(repo.collaborators[0].login, "Flotss");
        assert_eq!(repo.languages[0].name, "PHP");
        assert_eq!(repo.languages[0].percentage, 75);
        assert_eq!(repo.commits[0].author_name, "Florian");
        assert!(repo.commits[0].message.ends_with("truncate here"));
        assert_eq!(repo.readme, "# NETVOD");
        assert!(repo.pinned);
        assert_eq!(repo.description.as_deref(), Some("Hand written"));
    }

    #[test]
    fn test_null_override_keeps_github_description() {
        let mut repo = normalize(raw_repo(), Auxiliary::default());
        apply_override(
            &mut repo,
            &DescriptionOverride {
                repo_id: 99,
                name: "NETVOD".into(),
                url: String::new(),
                description: None,
            },
        );
        assert_eq!(repo.description.as_deref(), Some("Streaming platform"));
    }
}
