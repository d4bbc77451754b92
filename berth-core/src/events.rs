use async_trait::async_trait;

/// Sink for event payloads leaving the process (e.g. a Kafka topic). The
/// broadcaster treats publishing as best-effort; implementations log and
/// return errors but are never allowed to block a seat operation.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
