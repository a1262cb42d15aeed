use crate::event::PrinterEvent;
use async_trait::async_trait;

pub type PublishError = Box<dyn std::error::Error + Send + Sync>;

/// Sink for printer events.
///
/// Implementations must not block on slow observers; the session awaits every publish
/// while holding its lock.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: PrinterEvent) -> Result<(), PublishError>;

    /// Publish every event even if some fail; the first failure is returned.
    async fn publish_batch(&self, events: Vec<PrinterEvent>) -> Result<(), PublishError> {
        let mut first_error = None;
        for event in events {
            if let Err(e) = self.publish(event).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
