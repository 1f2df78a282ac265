//! Fire-and-forget forwarding of structured log entries.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;
use workflows::LogPublisher;

/// Destination every forwarded entry is published to.
pub const LOGS_EXCHANGE: &str = "lagoon-logs";

/// Republishes log entries to [`LOGS_EXCHANGE`] without blocking the caller.
///
/// Encoding happens inline; publishing runs on a spawned task. Both kinds of
/// failure are reported at `debug` level and then dropped.
#[derive(Clone)]
pub struct LogForwarder {
    publisher: Arc<dyn LogPublisher>,
}

impl LogForwarder {
    pub fn new(publisher: Arc<dyn LogPublisher>) -> Self {
        Self { publisher }
    }

    /// Encodes `message` as JSON and publishes it in the background.
    ///
    /// Returns the publishing task, or `None` if the message could not be
    /// encoded. Callers are free to drop the handle. Must be called from
    /// within a Tokio runtime.
    pub fn forward<M: Serialize + ?Sized>(&self, message: &M) -> Option<JoinHandle<()>> {
        let payload = match serde_json::to_vec(message) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Unable to encode log entry as JSON");
                return None;
            }
        };

        let publisher = Arc::clone(&self.publisher);
        Some(tokio::spawn(async move {
            if let Err(e) = publisher.publish(LOGS_EXCHANGE, payload).await {
                debug!(error = %e, "Failed to forward log entry");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use workflows::BrokerError;

    use super::*;

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    #[async_trait]
    impl LogPublisher for RecordingPublisher {
        async fn publish(&self, destination: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
            if self.fail {
                return Err(BrokerError::Publish {
                    destination: destination.to_string(),
                    reason: "channel closed".to_string(),
                });
            }
            self.published
                .lock()
                .unwrap()
                .push((destination.to_string(), payload));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_forward_publishes_json_to_logs_exchange() {
        let publisher = Arc::new(RecordingPublisher::default());
        let forwarder = LogForwarder::new(publisher.clone());

        let handle = forwarder
            .forward(&serde_json::json!({ "severity": "info", "event": "workflow:invoked" }))
            .unwrap();
        handle.await.unwrap();

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, LOGS_EXCHANGE);
        let body: serde_json::Value = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(body["event"], "workflow:invoked");
    }

    #[tokio::test]
    async fn test_unencodable_message_is_dropped() {
        let publisher = Arc::new(RecordingPublisher::default());
        let forwarder = LogForwarder::new(publisher.clone());

        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8, 2], "sequence keys are not valid JSON object keys");

        assert!(forwarder.forward(&bad).is_none());
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_is_swallowed() {
        let publisher = Arc::new(RecordingPublisher {
            fail: true,
            ..RecordingPublisher::default()
        });
        let forwarder = LogForwarder::new(publisher);

        let handle = forwarder.forward(&serde_json::json!({ "event": "x" })).unwrap();
        assert!(handle.await.is_ok());
    }
}
