//! Progress bus
//!
//! In-process publish/subscribe registry mapping a caller-supplied request
//! id to a bounded event queue. Producers (the ingestor and clusterer)
//! emit without blocking; SSE subscribers replay the retained buffer and
//! then follow the live stream. Finished queues linger for a grace period
//! so a late subscriber still sees the terminal event.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::core::constants::{PROGRESS_GRACE_SECS, PROGRESS_QUEUE_CAPACITY};

/// Terminal event text for a successfully completed job
pub const COMPLETE_MESSAGE: &str = "Clustering complete!";

/// State of a long-running job at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub processed_channels: u64,
    pub total_channels: u64,
    pub current_channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn new(processed: u64, total: u64, current: impl Into<String>) -> Self {
        Self {
            processed_channels: processed,
            total_channels: total,
            current_channel: current.into(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

struct ChannelState {
    buffer: VecDeque<ProgressEvent>,
    /// Absolute sequence number of the event at buffer front
    base: u64,
    terminal: bool,
}

struct ProgressChannel {
    state: Mutex<ChannelState>,
    notify: Notify,
}

impl ProgressChannel {
    fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState {
                buffer: VecDeque::new(),
                base: 0,
                terminal: false,
            }),
            notify: Notify::new(),
        }
    }
}

/// Registry of per-request progress queues
pub struct ProgressBus {
    channels: Arc<DashMap<String, Arc<ProgressChannel>>>,
    capacity: usize,
    grace: Duration,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: PROGRESS_QUEUE_CAPACITY,
            grace: Duration::from_secs(PROGRESS_GRACE_SECS),
        }
    }

    #[cfg(test)]
    fn with_settings(capacity: usize, grace: Duration) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity,
            grace,
        }
    }

    /// Emit an event for a request id. Non-blocking; creates the queue
    /// lazily on first emit. When the queue is full the oldest event is
    /// dropped so the latest is always retained. Events after a terminal
    /// event are ignored.
    ///
    /// A per-source error rides an ordinary event's `error` field and does
    /// not end the stream; only `complete` and `fail` are terminal.
    pub fn emit(&self, request_id: &str, event: ProgressEvent) {
        self.push(request_id, event, false);
    }

    /// Emit the terminal success event and schedule queue eviction
    pub fn complete(&self, request_id: &str) {
        let (processed, total) = self.last_counts(request_id);
        self.push(
            request_id,
            ProgressEvent::new(processed, total, COMPLETE_MESSAGE),
            true,
        );
        self.schedule_eviction(request_id);
    }

    /// Emit a terminal error event and schedule queue eviction
    pub fn fail(&self, request_id: &str, reason: &str) {
        let (processed, total) = self.last_counts(request_id);
        self.push(
            request_id,
            ProgressEvent::new(processed, total, "Error").with_error(reason),
            true,
        );
        self.schedule_eviction(request_id);
    }

    fn push(&self, request_id: &str, event: ProgressEvent, terminal: bool) {
        let channel = self
            .channels
            .entry(request_id.to_string())
            .or_insert_with(|| Arc::new(ProgressChannel::new()))
            .clone();

        {
            let mut state = channel.state.lock();
            if state.terminal {
                tracing::debug!(request_id, "Progress event after terminal, dropped");
                return;
            }
            state.terminal = terminal;
            if state.buffer.len() == self.capacity {
                state.buffer.pop_front();
                state.base += 1;
            }
            state.buffer.push_back(event);
        }
        channel.notify.notify_waiters();
    }

    /// Subscribe to a request id's stream. Returns `None` for unknown ids.
    ///
    /// Each subscription independently replays the retained buffer from
    /// its start and then follows live emissions in order, ending after a
    /// terminal event.
    pub fn subscribe(&self, request_id: &str) -> Option<ProgressSubscription> {
        let channel = self.channels.get(request_id)?.clone();
        Some(ProgressSubscription { channel, cursor: 0 })
    }

    fn last_counts(&self, request_id: &str) -> (u64, u64) {
        self.channels
            .get(request_id)
            .and_then(|c| {
                let state = c.state.lock();
                state
                    .buffer
                    .back()
                    .map(|e| (e.processed_channels, e.total_channels))
            })
            .unwrap_or((0, 0))
    }

    fn schedule_eviction(&self, request_id: &str) {
        let channels = Arc::clone(&self.channels);
        let request_id = request_id.to_string();
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            channels.remove(&request_id);
            tracing::debug!(request_id, "Progress queue evicted");
        });
    }
}

/// A single subscriber's view of a request's progress stream
pub struct ProgressSubscription {
    channel: Arc<ProgressChannel>,
    /// Absolute sequence number of the next event to deliver
    cursor: u64,
}

impl ProgressSubscription {
    /// Wait for and return the next event, or `None` once the stream has
    /// delivered its terminal event.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        loop {
            let notified = self.channel.notify.notified();
            tokio::pin!(notified);
            // Register before checking state so an emit between the check
            // and the await still wakes us
            notified.as_mut().enable();
            {
                let state = self.channel.state.lock();
                // Overflow may have dropped events past our cursor
                if self.cursor < state.base {
                    self.cursor = state.base;
                }
                let end = state.base + state.buffer.len() as u64;
                if self.cursor < end {
                    let event = state.buffer[(self.cursor - state.base) as usize].clone();
                    self.cursor += 1;
                    return Some(event);
                }
                if state.terminal {
                    return None;
                }
            }
            notified.await;
        }
    }
}
