// Page-number pagination: keep asking for page N+1 until GitHub says we're done
use std::future::Future;

use tracing::debug;

use crate::github::{GitHubError, Result};

/// Largest `per_page` GitHub accepts
pub const MAX_PER_PAGE: u32 = 100;

/// One fetched page
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total item count the API declared, if it declares one
    pub declared_total: Option<u64>,
}

impl<T> Page<T> {
    pub fn unbounded(items: Vec<T>) -> Self {
        Self {
            items,
            declared_total: None,
        }
    }

    pub fn with_total(items: Vec<T>, total: u64) -> Self {
        Self {
            items,
            declared_total: Some(total),
        }
    }
}

/// How a paginated resource tells us it has no more pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The first page declares a total; the accumulated count must match it exactly
    DeclaredTotal,
    /// Nothing is declared; stop at the first empty page
    EmptyPage,
}

/// Drive `fetch_page` over pages 1, 2, 3... and concatenate the results in page order.
///
/// Stops on an empty page, on the first error from `fetch_page`, or once the
/// declared total is reached. With `Termination::DeclaredTotal` a final count
/// that differs from the declared total is a `Consistency` error rather than a
/// silently truncated list.
pub async fn collect_pages<T, F, Fut>(termination: Termination, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items: Vec<T> = Vec::new();
    let mut declared: Option<u64> = None;
    let mut page = 1u32;

    loop {
        let batch = fetch_page(page).await?;

        if termination == Termination::DeclaredTotal && declared.is_none() {
            declared = Some(batch.declared_total.ok_or_else(|| {
                GitHubError::UnexpectedShape("first page declared no total count".to_string())
            })?);
        }

        if batch.items.is_empty() {
            debug!("Page {} is empty, stopping", page);
            break;
        }

        debug!("Page {} returned {} items", page, batch.items.len());
        items.extend(batch.items);

        if let Some(total) = declared {
            if items.len() as u64 >= total {
                break;
            }
        }

        page += 1;
    }

    if let Some(expected) = declared {
        if items.len() as u64 != expected {
            return Err(GitHubError::Consistency {
                expected,
                actual: items.len() as u64,
            });
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_declared_total_fetches_until_reached() {
        let calls = AtomicU32::new(0);
        let pages: Vec<Vec<u32>> = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7], vec![]];

        let items = collect_pages(Termination::DeclaredTotal, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            let batch = pages[(page - 1) as usize].clone();
            async move { Ok(Page::with_total(batch, 7)) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_declared_total_mismatch_is_consistency_error() {
        let pages: Vec<Vec<u32>> = vec![vec![1, 2, 3], vec![]];

        let result = collect_pages(Termination::DeclaredTotal, |page| {
            let batch = pages[(page - 1) as usize].clone();
            async move { Ok(Page::with_total(batch, 7)) }
        })
        .await;

        match result {
            Err(GitHubError::Consistency { expected, actual }) => {
                assert_eq!(expected, 7);
                assert_eq!(actual, 3);
            }
            other => panic!("expected consistency error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overshooting_declared_total_is_consistency_error() {
        let result = collect_pages(Termination::DeclaredTotal, |_| async {
            Ok(Page::with_total(vec![1, 2, 3], 5))
        })
        .await;

        assert!(matches!(
            result,
            Err(GitHubError::Consistency {
                expected: 5,
                actual: 6
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_page_termination() {
        let calls = AtomicU32::new(0);

        let items = collect_pages(Termination::EmptyPage, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            let batch: Vec<u32> = if page <= 2 {
                (0..MAX_PER_PAGE).collect()
            } else {
                Vec::new()
            };
            async move { Ok(Page::unbounded(batch)) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_aborts_pagination() {
        let calls = AtomicU32::new(0);

        let result: Result<Vec<u32>> = collect_pages(Termination::EmptyPage, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if page == 2 {
                    Err(GitHubError::RateLimitExceeded)
                } else {
                    Ok(Page::unbounded(vec![page]))
                }
            }
        })
        .await;

        assert!(matches!(result, Err(GitHubError::RateLimitExceeded)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_declared_total() {
        let items: Vec<u32> = collect_pages(Termination::DeclaredTotal, |_| async {
            Ok(Page::with_total(Vec::new(), 0))
        })
        .await
        .unwrap();
        assert!(items.is_empty());
    }
}
