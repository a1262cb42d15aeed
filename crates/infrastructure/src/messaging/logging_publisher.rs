use async_trait::async_trait;
use domain::event::{EventPublisher, PrinterEvent};
use domain::printer::JobStatus;
use tracing::{debug, info, warn};

/// Writes every event to the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(
        &self,
        event: PrinterEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match &event {
            PrinterEvent::ConnectionStateChanged {
                previous,
                current,
                device,
                error,
                ..
            } => {
                let device = device.as_ref().map(|d| d.display_name()).unwrap_or("-");
                match error {
                    Some(error) => warn!(
                        %previous, %current, device, error = %error,
                        "🔌 Connection state changed"
                    ),
                    None => info!(%previous, %current, device, "🔌 Connection state changed"),
                }
            }
            PrinterEvent::DeviceDiscovered { device, .. } => {
                debug!(
                    address = %device.address,
                    name = device.display_name(),
                    dialect = %device.dialect(),
                    "📡 Device discovered"
                );
            }
            PrinterEvent::PrintJobStatusChanged {
                job_id,
                status,
                error,
                ..
            } => match status {
                JobStatus::Failed => warn!(
                    job_id = %job_id,
                    error = error.as_deref().unwrap_or("unknown"),
                    "❌ Print job failed"
                ),
                JobStatus::Completed => info!(job_id = %job_id, "✅ Print job completed"),
                JobStatus::Sending => debug!(job_id = %job_id, "🖨️ Print job sending"),
            },
            PrinterEvent::PrinterStatusChanged { status, .. } => {
                if status.is_ready() {
                    info!(labels = status.labels_remaining, "Printer ready");
                } else {
                    warn!(faults = ?status.faults(), "⚠️ Printer not ready");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::printer::PrinterStatus;

    #[tokio::test]
    async fn test_logging_never_fails() {
        let publisher = LoggingEventPublisher::new();
        let events = vec![
            PrinterEvent::job_status_changed("job-1", JobStatus::Sending, None),
            PrinterEvent::job_status_changed("job-1", JobStatus::Failed, Some("gone".into())),
            PrinterEvent::printer_status_changed(PrinterStatus {
                paper_out: true,
                ..PrinterStatus::default()
            }),
        ];
        assert!(publisher.publish_batch(events).await.is_ok());
    }
}
