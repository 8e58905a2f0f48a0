// Cache-first access to the aggregator
use std::future::Future;

use repofolio_cache::ResponseCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregator::PortfolioAggregator;
use crate::models::{Repository, User};
use crate::{Error, Result};

pub const REPOS_KEY: &str = "repos";
pub const USER_KEY: &str = "user";

/// Serves fresh cache entries, refetches stale or missing ones and writes
/// successful results through. Misses and failures leave the cache untouched.
pub struct CachedPortfolio {
    aggregator: PortfolioAggregator,
    cache: ResponseCache,
}

impl CachedPortfolio {
    pub fn new(aggregator: PortfolioAggregator, cache: ResponseCache) -> Self {
        Self { aggregator, cache }
    }

    pub fn aggregator(&self) -> &PortfolioAggregator {
        &self.aggregator
    }

    /// All repositories; `refresh` skips the cache read
    pub async fn get_repos(&self, refresh: bool) -> Result<Vec<Repository>> {
        self.cached_value(REPOS_KEY, refresh, || self.aggregator.get_repos())
            .await
    }

    /// One repository, cached under its name
    pub async fn get_repo(&self, name: &str, refresh: bool) -> Result<Option<Repository>> {
        self.cached(name, refresh, || self.aggregator.get_repo(name))
            .await
    }

    pub async fn get_user(&self, refresh: bool) -> Result<User> {
        self.cached_value(USER_KEY, refresh, || self.aggregator.get_user())
            .await
    }

    /// Persist descriptions and drop the listing so the next read shows them
    pub fn save_descriptions(&self, repos: &[Repository]) -> Result<()> {
        self.aggregator.save_descriptions(repos)?;
        self.cache.clear(REPOS_KEY)?;
        for repo in repos {
            self.cache.clear(&repo.name)?;
        }
        Ok(())
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        self.cache.clear(key)?;
        Ok(())
    }

    /// `cached` for resources that always exist when the fetch succeeds
    async fn cached_value<T, F, Fut>(&self, key: &str, refresh: bool, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cached(key, refresh, move || async move { fetch().await.map(Some) })
            .await?
            .ok_or_else(|| Error::UpstreamError(format!("{} came back empty", key)))
    }

    /// A stale entry stays in place until a successful fetch replaces it and
    /// is served when GitHub rate-limits the refetch.
    async fn cached<T, F, Fut>(&self, key: &str, refresh: bool, fetch: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let mut stale = None;

        if !refresh {
            match self.cache.read::<T>(key) {
                Ok(Some(hit)) if hit.is_fresh => {
                    debug!("Serving {} from cache", key);
                    return Ok(Some(hit.value));
                }
                Ok(Some(hit)) => {
                    debug!("Cache entry {} is stale", key);
                    stale = Some(hit.value);
                }
                Ok(None) => {}
                Err(e) => {
                    // Unreadable entry, e.g. written by an older build
                    warn!("Discarding unreadable cache entry {}: {}", key, e);
                    self.cache.clear(key)?;
                }
            }
        }

        let fetched = match fetch().await {
            Ok(fetched) => fetched,
            Err(Error::RateLimitExceeded) if stale.is_some() => {
                warn!("Rate limited while refreshing {}, serving the stale entry", key);
                return Ok(stale);
            }
            Err(e) => return Err(e),
        };

        match &fetched {
            Some(value) => {
                self.cache.write(key, value)?;
                info!("Cached fresh {}", key);
            }
            None => debug!("Nothing to cache for {}", key),
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{repo_json, FakeGitHub, SEARCH_URL};
    use repofolio_api::GitHubClient;
    use repofolio_cache::{
        CacheStore, Clock, MemoryDescriptionStore, MemoryStore, StoredEntry, DEFAULT_TTL_MS,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn advance(&self, millis: i64) {
            self.0.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct Harness {
        fake: Arc<FakeGitHub>,
        clock: Arc<ManualClock>,
        store: Arc<MemoryStore>,
        portfolio: CachedPortfolio,
    }

    fn harness() -> Harness {
        let fake = Arc::new(FakeGitHub::new());
        let clock = Arc::new(ManualClock(AtomicI64::new(1_700_000_000_000)));
        let store = Arc::new(MemoryStore::new());
        let aggregator = PortfolioAggregator::new(
            GitHubClient::new(fake.clone()),
            "Flotss",
            Arc::new(MemoryDescriptionStore::new()),
        );
        let cache = ResponseCache::with_clock(store.clone(), clock.clone(), DEFAULT_TTL_MS);
        Harness {
            fake,
            clock,
            store,
            portfolio: CachedPortfolio::new(aggregator, cache),
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_without_fetching() {
        let h = harness();
        h.fake.on_search(vec![repo_json(1, "A")]);
        h.fake.on_pinned(&[]);

        let first = h.portfolio.get_repos(false).await.unwrap();
        let calls = h.fake.requests().len();
        h.clock.advance(DEFAULT_TTL_MS - 1);
        let second = h.portfolio.get_repos(false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.fake.requests().len(), calls);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let h = harness();
        h.fake.on_search(vec![repo_json(1, "A")]);
        h.fake.on_pinned(&[]);

        h.portfolio.get_repos(false).await.unwrap();
        h.fake.on_search(vec![repo_json(1, "A"), repo_json(2, "B")]);
        h.clock.advance(DEFAULT_TTL_MS + 1);

        let repos = h.portfolio.get_repos(false).await.unwrap();
        assert_eq!(repos.len(), 2);
        let stored = h.store.load(REPOS_KEY).unwrap().unwrap();
        assert_eq!(stored.last_request_date, 1_700_000_000_000 + DEFAULT_TTL_MS + 1);
    }

    #[tokio::test]
    async fn test_stale_entry_served_when_rate_limited() {
        let h = harness();
        h.fake.on_search(vec![repo_json(1, "A")]);
        h.fake.on_pinned(&[]);

        h.portfolio.get_repos(false).await.unwrap();
        h.fake.on_get(
            &format!("{}&page=1&per_page=100", SEARCH_URL),
            200,
            json!({"message": "API rate limit exceeded for 10.0.0.1."}),
        );
        h.clock.advance(DEFAULT_TTL_MS + 1);

        let repos = h.portfolio.get_repos(false).await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "A");
        let stored = h.store.load(REPOS_KEY).unwrap().unwrap();
        assert_eq!(stored.last_request_date, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_stale_entry_survives_failed_refetch() {
        let h = harness();
        h.fake.on_get("https://api.github.com/users/Flotss", 200, json!({"login": "Flotss"}));

        h.portfolio.get_user(false).await.unwrap();
        h.fake.on_get(
            "https://api.github.com/users/Flotss",
            500,
            json!({"message": "Server Error"}),
        );
        h.clock.advance(DEFAULT_TTL_MS + 1);

        let result = h.portfolio.get_user(false).await;
        assert!(matches!(result, Err(Error::UpstreamError(_))));
        assert!(h.store.load(USER_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_bypasses_fresh_entry() {
        let h = harness();
        h.fake.on_search(vec![repo_json(1, "A")]);
        h.fake.on_pinned(&[]);

        h.portfolio.get_repos(false).await.unwrap();
        h.fake.on_search(vec![repo_json(1, "A"), repo_json(2, "B")]);

        let repos = h.portfolio.get_repos(true).await.unwrap();
        assert_eq!(repos.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_repo_is_not_cached() {
        let h = harness();

        let repo = h.portfolio.get_repo("missing", false).await.unwrap();
        assert!(repo.is_none());
        assert!(h.store.load("missing").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let h = harness();
        h.fake.on_get(
            "https://api.github.com/users/Flotss",
            403,
            json!({"message": "API rate limit exceeded for 10.0.0.1."}),
        );

        let result = h.portfolio.get_user(false).await;
        assert!(matches!(result, Err(Error::RateLimitExceeded)));
        assert!(h.store.load(USER_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repo_cached_under_its_name() {
        let h = harness();
        h.fake.on_get("https://api.github.com/repos/Flotss/A", 200, repo_json(1, "A"));

        h.portfolio.get_repo("A", false).await.unwrap().unwrap();
        assert!(h.store.load("A").unwrap().is_some());

        h.portfolio.clear("A").unwrap();
        assert!(h.store.load("A").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_replaced() {
        let h = harness();
        h.store
            .save(
                USER_KEY,
                &StoredEntry {
                    payload: "not json".into(),
                    last_request_date: h.clock.now_millis(),
                },
            )
            .unwrap();
        h.fake.on_get(
            "https://api.github.com/users/Flotss",
            200,
            json!({"login": "Flotss"}),
        );

        let user = h.portfolio.get_user(false).await.unwrap();
        assert_eq!(user.login, "Flotss");
        assert!(h.store.load(USER_KEY).unwrap().unwrap().payload.contains("Flotss"));
    }

    #[tokio::test]
    async fn test_save_descriptions_drops_listing() {
        let h = harness();
        h.fake.on_search(vec![repo_json(1, "A")]);
        h.fake.on_pinned(&[]);

        let mut repos = h.portfolio.get_repos(false).await.unwrap();
        repos[0].description = Some("edited".into());
        h.portfolio.save_descriptions(&repos).unwrap();
        assert!(h.store.load(REPOS_KEY).unwrap().is_none());

        let repos = h.portfolio.get_repos(false).await.unwrap();
        assert_eq!(repos[0].description.as_deref(), Some("edited"));
    }
}
