use async_trait::async_trait;
use domain::event::{EventPublisher, PrinterEvent};
use tokio::sync::broadcast;

pub const DEFAULT_CAPACITY: usize = 256;

/// Observer channel: every subscriber gets every event published after it subscribed.
///
/// Publishing with no subscribers is not an error. Slow subscribers lose the oldest
/// events (`RecvError::Lagged`) rather than blocking the printer session.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<PrinterEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PrinterEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(
        &self,
        event: PrinterEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ConnectionState;

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let publisher = BroadcastEventPublisher::default();
        let mut a = publisher.subscribe();
        let mut b = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 2);

        let event = PrinterEvent::connection_state_changed(
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            None,
            None,
        );
        publisher.publish(event.clone()).await.unwrap();

        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let publisher = BroadcastEventPublisher::new(4);
        let event = PrinterEvent::connection_state_changed(
            ConnectionState::Connected,
            ConnectionState::Disconnecting,
            None,
            None,
        );
        assert!(publisher.publish(event).await.is_ok());
    }

    #[tokio::test]
    async fn test_batch_keeps_order() {
        let publisher = BroadcastEventPublisher::new(4);
        let mut rx = publisher.subscribe();
        let first = PrinterEvent::connection_state_changed(
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            None,
            None,
        );
        let second = PrinterEvent::connection_state_changed(
            ConnectionState::Connecting,
            ConnectionState::Connected,
            None,
            None,
        );
        publisher
            .publish_batch(vec![first.clone(), second.clone()])
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), first);
        assert_eq!(rx.recv().await.unwrap(), second);
    }
}
