//! Externally configurable options, plus their documented defaults.
//!
//! Loaded from environment variables the same way the service binary reads
//! `PORT`/`HOST`, generalized into a typed struct with a programmatic
//! builder for tests and a `from_env` for the service binary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ingest queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Bound of the ingest queue. Default 10,000.
    pub capacity: usize,
    /// Utilization percent above which health reports degraded. Default 80.
    pub backpressure_threshold: u8,
    /// Default timeout handed to the queue by ingress. Default 5s.
    pub enqueue_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            backpressure_threshold: 80,
            enqueue_timeout: Duration::from_secs(5),
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of workers. Default 2.
    pub count: usize,
    /// Dequeue poll timeout. Default 100ms.
    pub poll_timeout: Duration,
    /// Grace period workers are given to drain the queue on shutdown.
    pub shutdown_grace: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 2,
            poll_timeout: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Trace buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Merged-trace retention. Default 10 minutes.
    pub ttl: Duration,
    /// Hard cap on trace buffer size; oldest `created_at` evicted first.
    pub max_count: usize,
    /// Periodic eviction cadence. Default 60s.
    pub eviction_interval: Duration,
    /// Master switch for per-trace event dedup.
    pub dedup_enabled: bool,
    /// Hard bound for traces that never complete. Default 24h.
    pub unmerged_hard_bound: Duration,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_count: 100_000,
            eviction_interval: Duration::from_secs(60),
            dedup_enabled: true,
            unmerged_hard_bound: Duration::from_secs(24 * 3600),
        }
    }
}

/// Merge engine configuration. `max_retries` bounds the optimistic-retry
/// loop around a store compare-and-swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    pub max_retries: u32,
    /// Toggles strict mode in the validator (no self-loops, all zoom
    /// levels assigned).
    pub validator_strict: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            validator_strict: false,
        }
    }
}

/// Top-level configuration, composed of the per-component sections above.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub trace: TraceConfig,
    pub merge: MergeConfig,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Some(v) = env_usize("FLOW_CORE_QUEUE_CAPACITY") {
            config.queue.capacity = v;
        }
        if let Some(v) = env_u8("FLOW_CORE_QUEUE_BACKPRESSURE_THRESHOLD") {
            config.queue.backpressure_threshold = v;
        }
        if let Some(v) = env_millis("FLOW_CORE_ENQUEUE_TIMEOUT_MS") {
            config.queue.enqueue_timeout = v;
        }
        if let Some(v) = env_usize("FLOW_CORE_WORKER_COUNT") {
            config.worker.count = v;
        }
        if let Some(v) = env_millis("FLOW_CORE_WORKER_POLL_TIMEOUT_MS") {
            config.worker.poll_timeout = v;
        }
        if let Some(v) = env_millis("FLOW_CORE_TRACE_TTL_MS") {
            config.trace.ttl = v;
        }
        if let Some(v) = env_usize("FLOW_CORE_TRACE_MAX_COUNT") {
            config.trace.max_count = v;
        }
        if let Some(v) = env_millis("FLOW_CORE_TRACE_EVICTION_INTERVAL_MS") {
            config.trace.eviction_interval = v;
        }
        if let Ok(v) = std::env::var("FLOW_CORE_DEDUP_ENABLED") {
            config.trace.dedup_enabled = v.eq_ignore_ascii_case("true") || v == "1";
        }
        if let Ok(v) = std::env::var("FLOW_CORE_VALIDATOR_STRICT") {
            config.merge.validator_strict = v.eq_ignore_ascii_case("true") || v == "1";
        }

        config
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_u8(key: &str) -> Option<u8> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.queue.capacity, 10_000);
        assert_eq!(config.queue.backpressure_threshold, 80);
        assert_eq!(config.worker.count, 2);
        assert_eq!(config.worker.poll_timeout, Duration::from_millis(100));
        assert_eq!(config.trace.ttl, Duration::from_secs(600));
        assert_eq!(config.trace.eviction_interval, Duration::from_secs(60));
    }
}
