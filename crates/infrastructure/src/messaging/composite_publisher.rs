use async_trait::async_trait;
use domain::event::{EventPublisher, PrinterEvent};
use std::sync::Arc;

/// Fans every event out to several publishers.
pub struct CompositeEventPublisher {
    publishers: Vec<Arc<dyn EventPublisher>>,
}

impl CompositeEventPublisher {
    pub fn new(publishers: Vec<Arc<dyn EventPublisher>>) -> Self {
        Self { publishers }
    }
}

#[async_trait]
impl EventPublisher for CompositeEventPublisher {
    async fn publish(
        &self,
        event: PrinterEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for publisher in &self.publishers {
            // A failing observer must not starve the others
            if let Err(e) = publisher.publish(event.clone()).await {
                tracing::error!(
                    event_type = event.event_type(),
                    "Failed to publish event to one of the publishers: {}",
                    e
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::BroadcastEventPublisher;
    use domain::Device;

    struct FailingPublisher;

    #[async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(
            &self,
            _event: PrinterEvent,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("observer down".into())
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_fan_out() {
        let broadcast = Arc::new(BroadcastEventPublisher::new(8));
        let mut rx = broadcast.subscribe();
        let composite = CompositeEventPublisher::new(vec![
            Arc::new(FailingPublisher),
            broadcast.clone(),
        ]);

        let event = PrinterEvent::device_discovered(Device::new("AA:BB", Some("BT Printer")));
        assert!(composite.publish(event.clone()).await.is_ok());
        assert_eq!(rx.recv().await.unwrap(), event);
    }
}
