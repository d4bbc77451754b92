use async_trait::async_trait;
use uuid::Uuid;

/// Tagged result for one provider call, decoupling the lock manager from
/// whatever shape the third-party inventory system answers with.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub success: bool,
    pub description: String,
}

impl ProviderResponse {
    pub fn ok(description: impl Into<String>) -> Self {
        Self {
            success: true,
            description: description.into(),
        }
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            success: false,
            description: description.into(),
        }
    }
}

/// Client for an external reservation system of record, keyed by
/// (event, session, seat). Calls are best-effort from the engine's point of
/// view: a failure here never rolls back a committed local decision.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn book_seat(
        &self,
        event_id: Uuid,
        session_id: &str,
        seat_id: &str,
    ) -> Result<ProviderResponse, Box<dyn std::error::Error + Send + Sync>>;

    async fn cancel_book_seat(
        &self,
        event_id: Uuid,
        session_id: &str,
        seat_id: &str,
    ) -> Result<ProviderResponse, Box<dyn std::error::Error + Send + Sync>>;
}
