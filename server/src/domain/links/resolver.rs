//! Link resolution with caching and single-flight deduplication
//!
//! A URL resolves to a short text summary. Lookups go memory cache →
//! store → external reader. Concurrent misses for the same URL join a
//! single in-flight resolution; a global semaphore bounds outbound calls.
//! Failures resolve to an empty string, are not cached, and count against
//! a per-URL attempt cap so a dead link stops generating outbound calls.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use moka::future::Cache;
use sqlx::SqlitePool;
use tokio::sync::Semaphore;

use crate::core::constants::{
    LINK_ATTEMPT_CAP, LINK_CACHE_MAX_ENTRIES, LINK_RESOLVE_CONCURRENCY,
    LINK_RESOLVE_TIMEOUT_SECS,
};
use crate::data::sqlite::repositories::link_summary;
use crate::domain::llm::LinkReader;

type ResolveFuture = Shared<BoxFuture<'static, String>>;

pub struct LinkResolver {
    pool: SqlitePool,
    reader: Arc<dyn LinkReader>,
    permits: Arc<Semaphore>,
    inflight: Arc<DashMap<String, ResolveFuture>>,
    attempts: Arc<DashMap<String, u32>>,
    cache: Cache<String, String>,
    call_timeout: Duration,
}

impl LinkResolver {
    pub fn new(pool: SqlitePool, reader: Arc<dyn LinkReader>) -> Self {
        Self {
            pool,
            reader,
            permits: Arc::new(Semaphore::new(LINK_RESOLVE_CONCURRENCY)),
            inflight: Arc::new(DashMap::new()),
            attempts: Arc::new(DashMap::new()),
            cache: Cache::new(LINK_CACHE_MAX_ENTRIES),
            call_timeout: Duration::from_secs(LINK_RESOLVE_TIMEOUT_SECS),
        }
    }

    #[cfg(test)]
    fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Resolve a URL to its summary.
    ///
    /// Infallible from the caller's view: failures come back as an empty
    /// string so one dead link never stalls a message.
    pub async fn resolve(&self, url: &str) -> String {
        if let Some(summary) = self.cache.get(url).await {
            return summary;
        }

        match link_summary::get(&self.pool, url).await {
            Ok(Some(summary)) => {
                self.cache.insert(url.to_string(), summary.clone()).await;
                return summary;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(url, error = %e, "Link summary lookup failed, treating as miss");
            }
        }

        if self.attempts.get(url).map(|a| *a).unwrap_or(0) >= LINK_ATTEMPT_CAP {
            tracing::debug!(url, "Attempt cap reached, skipping resolution");
            return String::new();
        }

        let future = match self.inflight.entry(url.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let future = self.resolution_future(url.to_string());
                entry.insert(future.clone());
                future
            }
        };

        future.await
    }

    /// Build the shared future that performs one outbound resolution.
    ///
    /// The future owns clones of everything it touches so joiners can
    /// await it independently of the resolver's lifetime.
    fn resolution_future(&self, url: String) -> ResolveFuture {
        let pool = self.pool.clone();
        let reader = Arc::clone(&self.reader);
        let permits = Arc::clone(&self.permits);
        let inflight = Arc::clone(&self.inflight);
        let attempts = Arc::clone(&self.attempts);
        let cache = self.cache.clone();
        let call_timeout = self.call_timeout;

        async move {
            let _permit = permits.acquire_owned().await.expect("semaphore never closed");

            let outcome = tokio::time::timeout(call_timeout, reader.describe(&url)).await;
            let summary = match outcome {
                Ok(Ok(summary)) => {
                    attempts.remove(&url);
                    if let Err(e) = link_summary::put(&pool, &url, &summary).await {
                        tracing::warn!(url, error = %e, "Failed to persist link summary");
                    }
                    cache.insert(url.clone(), summary.clone()).await;
                    summary
                }
                Ok(Err(e)) => {
                    *attempts.entry(url.clone()).or_insert(0) += 1;
                    tracing::warn!(url, error = %e, "Link resolution failed");
                    String::new()
                }
                Err(_) => {
                    *attempts.entry(url.clone()).or_insert(0) += 1;
                    tracing::warn!(url, "Link resolution timed out");
                    String::new()
                }
            };

            inflight.remove(&url);
            summary
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::data::sqlite::test_pool;
    use crate::domain::llm::LlmError;

    struct CountingReader {
        calls: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    impl CountingReader {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                delay: Duration::ZERO,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                delay,
            }
        }
    }

    #[async_trait]
    impl LinkReader for CountingReader {
        async fn describe(&self, url: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(LlmError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(format!("summary of {url}"))
        }
    }

    #[tokio::test]
    async fn test_miss_resolves_and_persists() {
        let pool = test_pool().await;
        let reader = Arc::new(CountingReader::ok());
        let resolver = LinkResolver::new(pool.clone(), reader.clone());

        let summary = resolver.resolve("https://ex.com/1").await;
        assert_eq!(summary, "summary of https://ex.com/1");
        assert_eq!(reader.calls.load(Ordering::SeqCst), 1);

        let stored = link_summary::get(&pool, "https://ex.com/1").await.unwrap();
        assert_eq!(stored.as_deref(), Some("summary of https://ex.com/1"));
    }

    #[tokio::test]
    async fn test_store_hit_skips_outbound_call() {
        let pool = test_pool().await;
        link_summary::put(&pool, "https://ex.com/1", "cached").await.unwrap();

        let reader = Arc::new(CountingReader::ok());
        let resolver = LinkResolver::new(pool, reader.clone());

        assert_eq!(resolver.resolve("https://ex.com/1").await, "cached");
        assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_call() {
        let pool = test_pool().await;
        let reader = Arc::new(CountingReader::slow(Duration::from_millis(50)));
        let resolver = Arc::new(LinkResolver::new(pool, reader.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = Arc::clone(&resolver);
            handles.push(tokio::spawn(async move {
                resolver.resolve("https://ex.com/1").await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "summary of https://ex.com/1");
        }

        assert_eq!(reader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_returns_empty_and_is_not_cached() {
        let pool = test_pool().await;
        let reader = Arc::new(CountingReader::failing());
        let resolver = LinkResolver::new(pool.clone(), reader.clone());

        assert_eq!(resolver.resolve("https://ex.com/1").await, "");
        assert!(
            link_summary::get(&pool, "https://ex.com/1")
                .await
                .unwrap()
                .is_none()
        );

        // Not cached, so a second call retries
        assert_eq!(resolver.resolve("https://ex.com/1").await, "");
        assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_attempt_cap_stops_outbound_calls() {
        let pool = test_pool().await;
        let reader = Arc::new(CountingReader::failing());
        let resolver = LinkResolver::new(pool, reader.clone());

        for _ in 0..10 {
            resolver.resolve("https://ex.com/dead").await;
        }
        assert_eq!(
            reader.calls.load(Ordering::SeqCst),
            LINK_ATTEMPT_CAP as usize
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_empty() {
        let pool = test_pool().await;
        let reader = Arc::new(CountingReader::slow(Duration::from_secs(60)));
        let resolver = LinkResolver::new(pool, reader)
            .with_call_timeout(Duration::from_millis(100));

        assert_eq!(resolver.resolve("https://ex.com/slow").await, "");
    }
}
