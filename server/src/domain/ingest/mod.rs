//! Channel ingestion pipeline
//!
//! Materializes messages and their resolved outbound links into the
//! store, emitting progress along the way. Fan-out over sources is
//! bounded; a failing source is reported in its progress event and never
//! aborts the batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Map;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::constants::{
    CHANNEL_FETCH_CONCURRENCY, CHANNEL_FETCH_TIMEOUT_SECS, PROGRESS_MIN_EMIT_INTERVAL_SECS,
};
use crate::data::sqlite::SqliteError;
use crate::data::sqlite::repositories::{message, source};
use crate::domain::links::{LinkResolver, extract_urls};
use crate::domain::progress::{ProgressBus, ProgressEvent};
use crate::domain::telegram::ChannelClient;
use crate::utils::url::{canonicalize, channel_slug};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Storage error: {0}")]
    Data(#[from] SqliteError),
}

/// One ingestion run over a set of sources and a time window
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub sources: Vec<String>,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub request_id: String,
}

/// Outcome of an ingestion run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub sources: usize,
    pub new_messages: usize,
    pub failures: usize,
}

pub struct ChannelIngestor {
    pool: SqlitePool,
    client: Arc<dyn ChannelClient>,
    resolver: Arc<LinkResolver>,
    progress: Arc<ProgressBus>,
    fetch_permits: Arc<Semaphore>,
}

impl ChannelIngestor {
    pub fn new(
        pool: SqlitePool,
        client: Arc<dyn ChannelClient>,
        resolver: Arc<LinkResolver>,
        progress: Arc<ProgressBus>,
    ) -> Self {
        Self {
            pool,
            client,
            resolver,
            progress,
            fetch_permits: Arc::new(Semaphore::new(CHANNEL_FETCH_CONCURRENCY)),
        }
    }

    /// Run one ingestion job to completion.
    ///
    /// Sources are canonicalized and upserted first, then fetched with
    /// bounded concurrency. The terminal progress event is always emitted,
    /// even when every source fails.
    pub async fn run(&self, job: IngestJob) -> Result<IngestReport, IngestError> {
        let total = job.sources.len() as u64;
        self.progress.emit(
            &job.request_id,
            ProgressEvent::new(0, total, "Initializing"),
        );

        let processed = Arc::new(AtomicU64::new(0));
        let mut report = IngestReport {
            sources: 0,
            new_messages: 0,
            failures: 0,
        };

        let mut tasks = JoinSet::new();
        for raw_url in &job.sources {
            let url = match canonicalize(raw_url) {
                Ok(url) => url,
                Err(e) => {
                    let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.progress.emit(
                        &job.request_id,
                        ProgressEvent::new(
                            done,
                            total,
                            format!("Processing {done}/{total}: {raw_url}"),
                        )
                        .with_error(e),
                    );
                    report.failures += 1;
                    continue;
                }
            };

            let name = channel_slug(&url).unwrap_or(url.as_str()).to_string();
            if let Err(e) = source::upsert(&self.pool, &url, &name, "telegram", "Uncategorized").await
            {
                self.progress.fail(&job.request_id, "storage failure");
                return Err(e.into());
            }
            report.sources += 1;

            let pool = self.pool.clone();
            let client = Arc::clone(&self.client);
            let resolver = Arc::clone(&self.resolver);
            let progress = Arc::clone(&self.progress);
            let permits = Arc::clone(&self.fetch_permits);
            let processed = Arc::clone(&processed);
            let request_id = job.request_id.clone();
            let (since, until) = (job.since, job.until);

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.expect("semaphore never closed");

                let outcome = ingest_source(
                    &pool, &client, &resolver, &progress, &request_id, &processed, total, &url,
                    since, until,
                )
                .await;

                let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                let mut event = ProgressEvent::new(
                    done,
                    total,
                    format!("Processing {done}/{total}: {url}"),
                );
                if let Err(e) = &outcome {
                    tracing::warn!(url, error = %e, "Source ingestion failed");
                    event = event.with_error(e.clone());
                }
                progress.emit(&request_id, event);
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(new_messages)) => report.new_messages += new_messages,
                Ok(Err(_)) => report.failures += 1,
                Err(e) => {
                    tracing::error!(error = %e, "Ingestion task panicked");
                    report.failures += 1;
                }
            }
        }

        self.progress.complete(&job.request_id);
        tracing::info!(
            sources = report.sources,
            new_messages = report.new_messages,
            failures = report.failures,
            "Ingestion run finished"
        );
        Ok(report)
    }
}

/// Ingest a single source; storage and fetch problems surface as the
/// per-source error string carried by its progress event.
#[allow(clippy::too_many_arguments)]
async fn ingest_source(
    pool: &SqlitePool,
    client: &Arc<dyn ChannelClient>,
    resolver: &Arc<LinkResolver>,
    progress: &Arc<ProgressBus>,
    request_id: &str,
    processed: &Arc<AtomicU64>,
    total: u64,
    url: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<usize, String> {
    let fetch = client.fetch_channel_messages(url, since, until);
    let mut messages = tokio::time::timeout(
        Duration::from_secs(CHANNEL_FETCH_TIMEOUT_SECS),
        fetch,
    )
    .await
    .map_err(|_| format!("fetch timed out for {url}"))?
    .map_err(|e| e.to_string())?;

    // Persist in source timestamp order regardless of fetch order
    messages.sort_by(|a, b| a.posted_at.cmp(&b.posted_at));

    let min_emit_interval = Duration::from_secs(PROGRESS_MIN_EMIT_INTERVAL_SECS);
    let mut last_emit = Instant::now();
    let mut new_messages = 0;

    for msg in messages {
        let inserted = message::record(
            pool,
            "telegram",
            &msg.channel_id,
            &msg.message_id,
            url,
            msg.posted_at.timestamp(),
            &msg.text,
        )
        .await
        .map_err(|e| e.to_string())?;

        if let Some(id) = inserted {
            new_messages += 1;

            let urls = extract_urls(&msg.text);
            if !urls.is_empty() {
                let summaries =
                    futures::future::join_all(urls.iter().map(|u| resolver.resolve(u))).await;

                let mut map = Map::new();
                for (link, summary) in urls.into_iter().zip(summaries) {
                    if !summary.is_empty() {
                        map.insert(link, summary.into());
                    }
                }
                if !map.is_empty() {
                    let json = serde_json::Value::Object(map).to_string();
                    message::attach_resolved_links(pool, id, &json)
                        .await
                        .map_err(|e| e.to_string())?;
                }
            }
        }

        if last_emit.elapsed() >= min_emit_interval {
            let done = processed.load(Ordering::SeqCst);
            progress.emit(
                request_id,
                ProgressEvent::new(done, total, format!("Processing {done}/{total}: {url}")),
            );
            last_emit = Instant::now();
        }
    }

    Ok(new_messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::data::sqlite::repositories::link_summary;
    use crate::data::sqlite::test_pool;
    use crate::domain::llm::{LinkReader, LlmError};
    use crate::domain::telegram::{ChannelMessage, TelegramError};

    struct StubClient;

    #[async_trait]
    impl ChannelClient for StubClient {
        async fn fetch_channel_messages(
            &self,
            url: &str,
            _since: DateTime<Utc>,
            _until: DateTime<Utc>,
        ) -> Result<Vec<ChannelMessage>, TelegramError> {
            if url.contains("down") {
                return Err(TelegramError::Status {
                    status: 404,
                    url: url.to_string(),
                });
            }
            let base = Utc.with_ymd_and_hms(2026, 7, 30, 10, 0, 0).unwrap();
            Ok(vec![
                ChannelMessage {
                    channel_id: "foo".into(),
                    message_id: "2".into(),
                    posted_at: base,
                    text: "B".into(),
                },
                ChannelMessage {
                    channel_id: "foo".into(),
                    message_id: "1".into(),
                    posted_at: base - chrono::Duration::hours(1),
                    text: "A https://ex.com/1".into(),
                },
            ])
        }
    }

    struct StubReader;

    #[async_trait]
    impl LinkReader for StubReader {
        async fn describe(&self, _url: &str) -> Result<String, LlmError> {
            Ok("ex summary".to_string())
        }
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2026, 7, 29, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap(),
        )
    }

    fn ingestor(pool: &SqlitePool) -> ChannelIngestor {
        let resolver = Arc::new(LinkResolver::new(pool.clone(), Arc::new(StubReader)));
        ChannelIngestor::new(
            pool.clone(),
            Arc::new(StubClient),
            resolver,
            Arc::new(ProgressBus::new()),
        )
    }

    #[tokio::test]
    async fn test_single_source_ingest_persists_messages_and_links() {
        let pool = test_pool().await;
        let (since, until) = window();

        let report = ingestor(&pool)
            .run(IngestJob {
                sources: vec!["https://t.me/foo".into()],
                since,
                until,
                request_id: "r1".into(),
            })
            .await
            .unwrap();

        assert_eq!(report.sources, 1);
        assert_eq!(report.new_messages, 2);
        assert_eq!(report.failures, 0);

        let messages = message::in_window(&pool, &[], 0, i64::MAX).await.unwrap();
        assert_eq!(messages.len(), 2);
        // Timestamp order, not fetch order
        assert_eq!(messages[0].message_id, "1");
        assert_eq!(messages[1].message_id, "2");
        assert!(messages[0].resolved_links.as_deref().unwrap().contains("ex summary"));
        assert!(messages[1].resolved_links.is_none());

        let summary = link_summary::get(&pool, "https://ex.com/1").await.unwrap();
        assert_eq!(summary.as_deref(), Some("ex summary"));
    }

    #[tokio::test]
    async fn test_reingest_inserts_nothing_new() {
        let pool = test_pool().await;
        let (since, until) = window();
        let ingestor = ingestor(&pool);

        let job = IngestJob {
            sources: vec!["https://t.me/foo".into()],
            since,
            until,
            request_id: "r1".into(),
        };
        ingestor.run(job.clone()).await.unwrap();

        let report = ingestor
            .run(IngestJob {
                request_id: "r2".into(),
                ..job
            })
            .await
            .unwrap();
        assert_eq!(report.new_messages, 0);

        let messages = message::in_window(&pool, &[], 0, i64::MAX).await.unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_batch() {
        let pool = test_pool().await;
        let (since, until) = window();
        let progress = Arc::new(ProgressBus::new());
        let resolver = Arc::new(LinkResolver::new(pool.clone(), Arc::new(StubReader)));
        let ingestor = ChannelIngestor::new(
            pool.clone(),
            Arc::new(StubClient),
            resolver,
            Arc::clone(&progress),
        );

        let report = ingestor
            .run(IngestJob {
                sources: vec!["https://t.me/down".into(), "https://t.me/foo".into()],
                since,
                until,
                request_id: "r1".into(),
            })
            .await
            .unwrap();

        assert_eq!(report.sources, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(report.new_messages, 2);

        // The failing source is reported in-stream, then the run completes
        let mut sub = progress.subscribe("r1").unwrap();
        let mut saw_error = false;
        let mut last = None;
        while let Some(event) = sub.next().await {
            saw_error |= event.error.is_some();
            last = Some(event);
        }
        assert!(saw_error);
        assert_eq!(
            last.unwrap().current_channel,
            crate::domain::progress::COMPLETE_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_counted_as_failure() {
        let pool = test_pool().await;
        let (since, until) = window();

        let report = ingestor(&pool)
            .run(IngestJob {
                sources: vec!["not a url".into()],
                since,
                until,
                request_id: "r1".into(),
            })
            .await
            .unwrap();

        assert_eq!(report.sources, 0);
        assert_eq!(report.failures, 1);
    }
}
