// Secondary data that must never sink the whole request
use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Await `fetch` and return its value, or `T::default()` if it failed.
///
/// This is the only place errors are swallowed on purpose. The suppressed
/// error is always logged with the name of what was being fetched.
pub async fn best_effort<T, E, F>(what: &str, fetch: F) -> T
where
    T: Default,
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match fetch.await {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not fetch {}, using an empty value: {}", what, e);
            T::default()
        }
    }
}
