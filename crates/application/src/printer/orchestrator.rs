use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domain::device::Dialect;
use domain::event::{EventPublisher, PrinterEvent};
use domain::printer::{
    BarcodeSymbology, CutMode, EncoderFactory, PrintPrimitive, PrinterSettings, PrinterStatus,
    QrErrorLevel, SessionConfig, TextFormat,
};
use domain::{ConnectionState, Device, PrinterError, PrinterTransport};

use super::session::{JobId, PrinterSession, SessionSnapshot};

/// Entry point for applications: discovery, the single printer session and dispatch.
///
/// Construction is explicit: the transport, the dialect-to-encoder factory and the event
/// publisher are passed in. Observers learn about connection outcomes through the publisher.
pub struct PrinterOrchestrator {
    transport: Arc<dyn PrinterTransport>,
    publisher: Arc<dyn EventPublisher>,
    session: PrinterSession,
    discovered: RwLock<Vec<Device>>,
}

impl PrinterOrchestrator {
    pub fn new(
        transport: Arc<dyn PrinterTransport>,
        factory: Arc<dyn EncoderFactory>,
        publisher: Arc<dyn EventPublisher>,
        config: SessionConfig,
    ) -> Self {
        Self::with_settings(transport, factory, publisher, config, PrinterSettings::default())
    }

    /// Like `new`, with the settings every new session starts from
    pub fn with_settings(
        transport: Arc<dyn PrinterTransport>,
        factory: Arc<dyn EncoderFactory>,
        publisher: Arc<dyn EventPublisher>,
        config: SessionConfig,
        settings: PrinterSettings,
    ) -> Self {
        let session = PrinterSession::new(
            transport.clone(),
            factory,
            publisher.clone(),
            config,
            settings,
        );
        Self {
            transport,
            publisher,
            session,
            discovered: RwLock::new(Vec::new()),
        }
    }

    // ---- discovery ----

    pub fn is_bluetooth_available(&self) -> bool {
        self.transport.is_available()
    }

    pub async fn request_permissions(&self) -> bool {
        self.transport.request_permissions().await
    }

    /// Scan for nearby printers.
    ///
    /// Cancelling `cancel` ends the scan with `ScanCancelled`; the active session, if any,
    /// is untouched because scanning never takes the session lock.
    pub async fn scan(
        &self,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Vec<Device>, PrinterError> {
        if !self.transport.is_available() {
            return Err(PrinterError::TransportUnavailable(
                "Bluetooth is off or unsupported".into(),
            ));
        }
        info!(timeout_ms = timeout.as_millis() as u64, "📡 Scanning for printers");

        let devices = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Scan cancelled");
                return Err(PrinterError::ScanCancelled);
            }
            result = self.transport.scan(timeout) => result?,
        };
        Ok(self.record_discovered(devices).await)
    }

    pub async fn paired_devices(&self) -> Result<Vec<Device>, PrinterError> {
        if !self.transport.is_available() {
            return Err(PrinterError::TransportUnavailable(
                "Bluetooth is off or unsupported".into(),
            ));
        }
        let devices = self.transport.paired_devices().await?;
        Ok(self.record_discovered(devices).await)
    }

    /// Every device seen by a scan or paired lookup so far
    pub async fn discovered_devices(&self) -> Vec<Device> {
        self.discovered.read().await.clone()
    }

    /// Tag devices with their dialect, merge them into the known set and announce them.
    async fn record_discovered(&self, devices: Vec<Device>) -> Vec<Device> {
        let devices: Vec<Device> = devices
            .into_iter()
            .map(|mut device| {
                device.dialect_hint = Some(device.dialect());
                device
            })
            .collect();

        {
            let mut known = self.discovered.write().await;
            for device in &devices {
                match known.iter_mut().find(|d| d.address == device.address) {
                    Some(existing) => *existing = device.clone(),
                    None => known.push(device.clone()),
                }
            }
        }

        for device in &devices {
            debug!(address = %device.address, dialect = %device.dialect(), "Device discovered");
            if let Err(e) = self
                .publisher
                .publish(PrinterEvent::device_discovered(device.clone()))
                .await
            {
                warn!("Failed to publish discovery: {}", e);
            }
        }
        devices
    }

    // ---- connection ----

    /// Connect to `device` with the dialect its hint or name selects.
    ///
    /// An active session is torn down first.
    pub async fn connect(&self, device: Device) -> Result<(), PrinterError> {
        self.session.connect(device).await
    }

    /// Connect with an explicit dialect, overriding classification
    pub async fn connect_with_dialect(
        &self,
        device: Device,
        dialect: Dialect,
    ) -> Result<(), PrinterError> {
        self.session.connect(device.with_dialect(dialect)).await
    }

    /// Connect to a device found by an earlier scan or paired lookup
    pub async fn connect_by_address(&self, address: &str) -> Result<(), PrinterError> {
        let device = self
            .discovered
            .read()
            .await
            .iter()
            .find(|d| d.address == address)
            .cloned()
            .ok_or_else(|| PrinterError::DeviceNotFound(address.to_string()))?;
        self.session.connect(device).await
    }

    pub async fn disconnect(&self) -> Result<(), PrinterError> {
        self.session.disconnect().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn connected_device(&self) -> Option<Device> {
        self.session.connected_device()
    }

    /// Dialect of the active session
    pub fn active_dialect(&self) -> Option<Dialect> {
        self.session.connected_device().map(|d| d.dialect())
    }

    /// Whether label operations (raw labels, templates, darkness) are open to the active session
    pub fn supports_labels(&self) -> bool {
        self.active_dialect().is_some_and(|d| d.supports_labels())
    }

    /// Follow state and bound-device changes without polling.
    pub fn watch_state(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe_snapshot()
    }

    // ---- printing ----

    pub async fn print(&self, primitive: PrintPrimitive) -> Result<JobId, PrinterError> {
        self.session.print(&primitive).await
    }

    pub async fn print_text(
        &self,
        content: &str,
        format: TextFormat,
    ) -> Result<JobId, PrinterError> {
        self.print(PrintPrimitive::text(content, format)).await
    }

    pub async fn print_barcode(
        &self,
        data: &str,
        symbology: BarcodeSymbology,
    ) -> Result<JobId, PrinterError> {
        self.print(PrintPrimitive::barcode(data, symbology)).await
    }

    pub async fn print_qr_code(
        &self,
        data: &str,
        size: u8,
        error_level: QrErrorLevel,
    ) -> Result<JobId, PrinterError> {
        self.print(PrintPrimitive::qr_code(data, size, error_level))
            .await
    }

    /// Print a 1-bit raster, `ceil(width / 8)` bytes per row, MSB first
    pub async fn print_image(
        &self,
        raster: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<JobId, PrinterError> {
        self.print(PrintPrimitive::image(raster, width, height))
            .await
    }

    pub async fn line_break(&self, count: u8) -> Result<JobId, PrinterError> {
        self.print(PrintPrimitive::line_break(count)).await
    }

    pub async fn cut_paper(&self, mode: CutMode) -> Result<JobId, PrinterError> {
        self.print(PrintPrimitive::cut(mode)).await
    }

    pub async fn print_batch(&self, primitives: &[PrintPrimitive]) -> Result<JobId, PrinterError> {
        self.session.print_batch(primitives).await
    }

    // ---- label printers ----

    pub async fn print_raw_label(&self, label: &str) -> Result<JobId, PrinterError> {
        self.session.print_raw_label(label).await
    }

    pub async fn print_label_with_template(
        &self,
        template: &str,
        substitutions: &HashMap<String, String>,
    ) -> Result<JobId, PrinterError> {
        self.session
            .print_label_with_template(template, substitutions)
            .await
    }

    pub async fn set_darkness(&self, darkness: i32) -> Result<JobId, PrinterError> {
        self.session.set_darkness(darkness).await
    }

    pub async fn set_speed(&self, speed: i32) -> Result<JobId, PrinterError> {
        self.session.set_speed(speed).await
    }

    pub async fn set_label_dimensions(&self, width: u32, length: u32) -> Result<JobId, PrinterError> {
        self.session.set_label_dimensions(width, length).await
    }

    pub async fn calibrate(&self) -> Result<JobId, PrinterError> {
        self.session.calibrate().await
    }

    pub async fn print_test_label(&self) -> Result<JobId, PrinterError> {
        self.session.print_test_label().await
    }

    pub async fn get_settings(&self) -> Result<PrinterSettings, PrinterError> {
        self.session.settings().await
    }

    pub async fn get_status(&self) -> Result<PrinterStatus, PrinterError> {
        self.session.query_status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure::{BroadcastEventPublisher, DialectEncoderFactory, MockTransport};

    fn orchestrator(transport: MockTransport) -> PrinterOrchestrator {
        PrinterOrchestrator::new(
            Arc::new(transport),
            Arc::new(DialectEncoderFactory::default()),
            Arc::new(BroadcastEventPublisher::default()),
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_discovery_tags_dialects() {
        let transport = MockTransport::new().with_devices(vec![
            Device::new("AA:01", Some("Zebra ZQ520")),
            Device::new("AA:02", Some("BT Thermal POS")),
            Device::new("AA:03", None),
        ]);
        let orchestrator = orchestrator(transport);
        let devices = orchestrator
            .scan(Duration::from_secs(5), CancellationToken::new())
            .await
            .unwrap();

        let dialects: Vec<_> = devices.iter().map(|d| d.dialect_hint).collect();
        assert_eq!(
            dialects,
            vec![
                Some(Dialect::Zebra),
                Some(Dialect::EscPos),
                Some(Dialect::Unknown)
            ]
        );
        assert_eq!(orchestrator.discovered_devices().await.len(), 3);
    }

    #[tokio::test]
    async fn test_rescan_merges_by_address() {
        let transport = MockTransport::new()
            .with_devices(vec![Device::new("AA:01", Some("Zebra ZQ520"))])
            .with_paired(vec![
                Device::new("AA:01", Some("Zebra ZQ520")),
                Device::new("AA:09", Some("Receipt 80")),
            ]);
        let orchestrator = orchestrator(transport);
        orchestrator
            .scan(Duration::from_secs(1), CancellationToken::new())
            .await
            .unwrap();
        orchestrator.paired_devices().await.unwrap();

        let known = orchestrator.discovered_devices().await;
        assert_eq!(known.len(), 2);
        assert!(known.iter().all(|d| d.paired));
    }

    #[tokio::test]
    async fn test_connect_by_unknown_address() {
        let orchestrator = orchestrator(MockTransport::new());
        assert_eq!(
            orchestrator.connect_by_address("FF:FF").await,
            Err(PrinterError::DeviceNotFound("FF:FF".into()))
        );
        assert_eq!(orchestrator.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_scan_requires_adapter() {
        let orchestrator = orchestrator(MockTransport::new().unavailable());
        assert!(!orchestrator.is_bluetooth_available());
        assert!(matches!(
            orchestrator
                .scan(Duration::from_secs(1), CancellationToken::new())
                .await,
            Err(PrinterError::TransportUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_permissions_are_delegated() {
        assert!(orchestrator(MockTransport::new()).request_permissions().await);
        assert!(
            !orchestrator(MockTransport::new().deny_permissions())
                .request_permissions()
                .await
        );
    }
}
