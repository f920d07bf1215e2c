//! The ingest queue: a bounded FIFO between ingress and the worker pool.
//!
//! `tokio::sync::mpsc` does not expose the `size()`/`capacity()` the
//! backpressure health check needs without a side counter racing the
//! channel itself, so this hand-rolls a `Mutex<VecDeque>` with two
//! `Notify`s — one for "became non-full", one for "became non-empty".

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::timeout;

use crate::model::{GraphId, TraceId};
use crate::payload::{EventPayload, StaticGraphPayload};

/// One unit of ingest work.
#[derive(Debug, Clone)]
pub enum WorkItem {
    StaticGraph {
        graph_id: GraphId,
        payload: StaticGraphPayload,
        created_at: DateTime<Utc>,
    },
    RuntimeEvents {
        trace_id: TraceId,
        graph_id: GraphId,
        payload: EventPayload,
        trace_complete: bool,
        created_at: DateTime<Utc>,
    },
}

/// A bounded, FIFO, multi-producer multi-consumer queue with introspection.
pub struct IngestQueue {
    capacity: usize,
    items: Mutex<VecDeque<WorkItem>>,
    len: AtomicUsize,
    not_full: Notify,
    not_empty: Notify,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueueHealth {
    pub size: usize,
    pub capacity: usize,
    pub utilization_percent: f64,
}

impl IngestQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            len: AtomicUsize::new(0),
            not_full: Notify::new(),
            not_empty: Notify::new(),
        })
    }

    /// Blocks (cooperatively) until space is available or `wait` elapses.
    /// Returns `false` — without enqueuing — if the timeout expires first.
    pub async fn enqueue(&self, item: WorkItem, wait: std::time::Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            {
                let mut items = self.items.lock();
                if items.len() < self.capacity {
                    items.push_back(item);
                    self.len.fetch_add(1, Ordering::SeqCst);
                    self.not_empty.notify_one();
                    return true;
                }
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if timeout(remaining, self.not_full.notified()).await.is_err() {
                return false;
            }
        }
    }

    /// Pops the oldest item, waiting up to `wait` for one to arrive.
    pub async fn dequeue(&self, wait: std::time::Duration) -> Option<WorkItem> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            {
                let mut items = self.items.lock();
                if let Some(item) = items.pop_front() {
                    self.len.fetch_sub(1, Ordering::SeqCst);
                    self.not_full.notify_one();
                    return Some(item);
                }
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            if timeout(remaining, self.not_empty.notified()).await.is_err() {
                return None;
            }
        }
    }

    pub fn size(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn utilization_percent(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.size() as f64 / self.capacity as f64) * 100.0
    }

    pub fn health(&self) -> QueueHealth {
        QueueHealth {
            size: self.size(),
            capacity: self.capacity,
            utilization_percent: self.utilization_percent(),
        }
    }
}
