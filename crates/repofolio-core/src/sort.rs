// Display order for the portfolio grid
use std::cmp::Ordering;

use crate::models::Repository;

/// One row of the priority table. `None` means "don't care".
struct Rule {
    pinned: Option<bool>,
    private: Option<bool>,
    archived: Option<bool>,
}

impl Rule {
    fn matches(&self, repo: &Repository) -> bool {
        self.pinned.map_or(true, |p| p == repo.pinned)
            && self.private.map_or(true, |p| p == repo.private)
            && self.archived.map_or(true, |a| a == repo.archived)
    }
}

/// Evaluated top to bottom, first match wins
const PRIORITY: [Rule; 6] = [
    // pinned and public
    Rule { pinned: Some(true), private: Some(false), archived: Some(false) },
    // public
    Rule { pinned: Some(false), private: Some(false), archived: Some(false) },
    // pinned and archived
    Rule { pinned: Some(true), private: None, archived: Some(true) },
    // archived
    Rule { pinned: Some(false), private: None, archived: Some(true) },
    // private
    Rule { pinned: None, private: Some(true), archived: Some(false) },
    // private and archived
    Rule { pinned: None, private: Some(true), archived: Some(true) },
];

/// 1-based bucket of a repository, `None` if no rule matches
pub fn priority_bucket(repo: &Repository) -> Option<usize> {
    PRIORITY
        .iter()
        .position(|rule| rule.matches(repo))
        .map(|index| index + 1)
}

/// Bucket first (unbucketed last), then name, then id so equal names still order
pub fn compare(a: &Repository, b: &Repository) -> Ordering {
    let rank = |repo: &Repository| priority_bucket(repo).unwrap_or(usize::MAX);

    rank(a)
        .cmp(&rank(b))
        .then_with(|| compare_names(&a.name, &b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Alphabetical the way a reader expects: letters compared without case first,
/// then lowercase before uppercase at the first case difference, then raw bytes.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| swap_case(a).cmp(&swap_case(b)))
        .then_with(|| a.cmp(b))
}

fn swap_case(name: &str) -> String {
    name.chars()
        .flat_map(|c| {
            if c.is_uppercase() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                c.to_uppercase().collect::<Vec<_>>()
            }
        })
        .collect()
}

/// Sort into display order. Sorting an already sorted list changes nothing.
pub fn sort_repositories(mut repos: Vec<Repository>) -> Vec<Repository> {
    repos.sort_by(compare);
    repos
}
