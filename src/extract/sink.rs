//! Analytics sinks: where exported Cypher statements go once handed off to
//! the external analytics store. Flow Core stops at handing the statements
//! to a sink; it never executes them itself.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::CoreError;

/// A destination for a batch of Cypher statements produced by
/// [`crate::extract::cypher::export`].
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn push(&self, graph_id: &str, statements: &[String]) -> Result<(), CoreError>;
}

/// Discards every batch. Used where no analytics layer is configured.
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl AnalyticsSink for NullSink {
    async fn push(&self, _graph_id: &str, _statements: &[String]) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Buffers pushed batches in memory, keyed by the order they arrived.
/// Exercised by tests and by local/dev deployments that read the buffer
/// back out instead of standing up a real graph database.
#[derive(Debug, Default)]
pub struct InMemorySink {
    batches: Mutex<Vec<(String, Vec<String>)>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<(String, Vec<String>)> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl AnalyticsSink for InMemorySink {
    async fn push(&self, graph_id: &str, statements: &[String]) -> Result<(), CoreError> {
        self.batches.lock().push((graph_id.to_string(), statements.to_vec()));
        Ok(())
    }
}

#[cfg(feature = "analytics-http")]
pub mod http {
    use super::*;
    use serde::Serialize;

    /// Pushes a batch of Cypher statements to a configured HTTP endpoint as
    /// a JSON body. The endpoint's own semantics (batching, execution,
    /// retries on its side) are out of scope here.
    pub struct HttpSink {
        client: reqwest::Client,
        endpoint: String,
        timeout: std::time::Duration,
    }

    #[derive(Serialize)]
    struct Batch<'a> {
        graph_id: &'a str,
        statements: &'a [String],
    }

    impl HttpSink {
        pub fn new(endpoint: impl Into<String>, timeout: std::time::Duration) -> Self {
            Self { client: reqwest::Client::new(), endpoint: endpoint.into(), timeout }
        }
    }

    #[async_trait]
    impl AnalyticsSink for HttpSink {
        async fn push(&self, graph_id: &str, statements: &[String]) -> Result<(), CoreError> {
            let response = self
                .client
                .post(&self.endpoint)
                .timeout(self.timeout)
                .json(&Batch { graph_id, statements })
                .send()
                .await
                .map_err(|err| CoreError::Unavailable(err.to_string()))?;

            if !response.status().is_success() {
                return Err(CoreError::Unavailable(format!(
                    "analytics endpoint returned {}",
                    response.status()
                )));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_sink_always_succeeds() {
        let sink = NullSink;
        assert!(sink.push("g1", &["MERGE (g:FlowGraph {});".to_string()]).await.is_ok());
    }

    #[tokio::test]
    async fn in_memory_sink_records_batches_in_order() {
        let sink = InMemorySink::new();
        sink.push("g1", &["a;".to_string()]).await.unwrap();
        sink.push("g2", &["b;".to_string()]).await.unwrap();

        let batches = sink.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].0, "g1");
        assert_eq!(batches[1].0, "g2");
    }
}
