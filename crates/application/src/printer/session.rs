use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use domain::event::{EventPublisher, PrinterEvent};
use domain::printer::{
    CommandEncoder, EncodedCommand, EncoderFactory, JobStatus, LabelEncoder, PrintPrimitive,
    PrinterSettings, PrinterStatus, SessionConfig,
};
use domain::{ConnectionState, Device, PrinterError, PrinterTransport};

pub type JobId = String;

/// What observers can read without taking the session lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    /// Target while connecting, bound device while connected
    pub device: Option<Device>,
}

struct SessionCore {
    state: ConnectionState,
    device: Option<Device>,
    encoder: Option<Box<dyn CommandEncoder>>,
    settings: PrinterSettings,
}

/// One transport binding plus its dialect encoder.
///
/// Every entry point takes the core lock for its whole duration, so state checks,
/// transitions and the writes of one command never interleave with another call.
pub struct PrinterSession {
    transport: Arc<dyn PrinterTransport>,
    factory: Arc<dyn EncoderFactory>,
    publisher: Arc<dyn EventPublisher>,
    config: SessionConfig,
    base_settings: PrinterSettings,
    core: Mutex<SessionCore>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl PrinterSession {
    pub fn new(
        transport: Arc<dyn PrinterTransport>,
        factory: Arc<dyn EncoderFactory>,
        publisher: Arc<dyn EventPublisher>,
        config: SessionConfig,
        settings: PrinterSettings,
    ) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            transport,
            factory,
            publisher,
            config,
            base_settings: settings.clone(),
            core: Mutex::new(SessionCore {
                state: ConnectionState::Disconnected,
                device: None,
                encoder: None,
                settings,
            }),
            snapshot,
        }
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot.borrow().state
    }

    /// Device of the active session, `None` unless connected
    pub fn connected_device(&self) -> Option<Device> {
        let snapshot = self.snapshot.borrow();
        if snapshot.state.is_connected() {
            snapshot.device.clone()
        } else {
            None
        }
    }

    // ---- lifecycle ----

    /// Bind `device`, tearing down any session that is already active.
    pub async fn connect(&self, device: Device) -> Result<(), PrinterError> {
        let mut core = self.core.lock().await;
        self.recover_interrupted(&mut core).await;

        if core.state.is_connected() {
            info!(device = %device.address, "Replacing active session");
            self.teardown(&mut core).await;
        }

        let dialect = device.dialect();
        core.device = Some(device.clone());
        core.settings = self.base_settings.clone();
        self.advance(&mut core, ConnectionState::to_connecting, None)
            .await?;
        info!(device = %device.address, name = device.display_name(), %dialect, "Connecting");

        let encoder = self.factory.create(dialect);
        let timeout = self.config.connect_timeout();
        match tokio::time::timeout(timeout, self.establish(&device, encoder.as_ref())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.fail(&mut core, &e).await;
                return Err(e);
            }
            Err(_) => {
                let e = PrinterError::ConnectTimeout(self.config.connect_timeout_ms);
                self.fail(&mut core, &e).await;
                return Err(e);
            }
        }

        if let Some(label) = encoder.as_label() {
            if let Err(e) = self.await_readiness(label).await {
                self.fail(&mut core, &e).await;
                return Err(e);
            }
        }

        core.encoder = Some(encoder);
        self.advance(&mut core, ConnectionState::to_connected, None)
            .await?;
        Ok(())
    }

    /// Release the transport and clear the binding. Succeeds when already disconnected.
    pub async fn disconnect(&self) -> Result<(), PrinterError> {
        let mut core = self.core.lock().await;
        self.recover_interrupted(&mut core).await;
        if core.state == ConnectionState::Disconnected {
            debug!("Disconnect requested while already disconnected");
            return Ok(());
        }
        self.teardown(&mut core).await;
        Ok(())
    }

    // ---- printing ----

    pub async fn print(&self, primitive: &PrintPrimitive) -> Result<JobId, PrinterError> {
        let mut core = self.core.lock().await;
        let encoder = Self::require_encoder(&core)?;
        let command = encoder.encode(primitive, &core.settings)?;
        debug!(kind = primitive.kind(), chunks = command.len(), "Encoded primitive");
        self.run_job(&mut core, command).await
    }

    /// Encode every primitive first; nothing is written if any of them is invalid.
    pub async fn print_batch(&self, primitives: &[PrintPrimitive]) -> Result<JobId, PrinterError> {
        let mut core = self.core.lock().await;
        let encoder = Self::require_encoder(&core)?;
        let command = encoder.encode_batch(primitives, &core.settings)?;
        debug!(items = primitives.len(), chunks = command.len(), "Encoded batch");
        self.run_job(&mut core, command).await
    }

    // ---- label printer operations ----

    pub async fn print_raw_label(&self, label: &str) -> Result<JobId, PrinterError> {
        let mut core = self.core.lock().await;
        let command = Self::require_label(&core)?.raw_label(label)?;
        self.run_job(&mut core, command).await
    }

    pub async fn print_label_with_template(
        &self,
        template: &str,
        substitutions: &HashMap<String, String>,
    ) -> Result<JobId, PrinterError> {
        let mut core = self.core.lock().await;
        let command = Self::require_label(&core)?.template_label(template, substitutions)?;
        self.run_job(&mut core, command).await
    }

    pub async fn set_darkness(&self, darkness: i32) -> Result<JobId, PrinterError> {
        let mut core = self.core.lock().await;
        let command = Self::require_label(&core)?.darkness(darkness)?;
        let job = self.run_job(&mut core, command).await?;
        core.settings.darkness = Some(darkness as u8);
        Ok(job)
    }

    pub async fn set_speed(&self, speed: i32) -> Result<JobId, PrinterError> {
        let mut core = self.core.lock().await;
        let command = Self::require_label(&core)?.speed(speed)?;
        let job = self.run_job(&mut core, command).await?;
        core.settings.speed = Some(speed as u8);
        Ok(job)
    }

    pub async fn set_label_dimensions(&self, width: u32, length: u32) -> Result<JobId, PrinterError> {
        let mut core = self.core.lock().await;
        let command = Self::require_label(&core)?.label_dimensions(width, length)?;
        let job = self.run_job(&mut core, command).await?;
        core.settings.label_width = Some(width);
        core.settings.label_length = Some(length);
        Ok(job)
    }

    pub async fn calibrate(&self) -> Result<JobId, PrinterError> {
        let mut core = self.core.lock().await;
        let command = Self::require_label(&core)?.calibrate();
        self.run_job(&mut core, command).await
    }

    pub async fn print_test_label(&self) -> Result<JobId, PrinterError> {
        let mut core = self.core.lock().await;
        let command = Self::require_label(&core)?.test_label(&core.settings);
        self.run_job(&mut core, command).await
    }

    pub async fn settings(&self) -> Result<PrinterSettings, PrinterError> {
        let core = self.core.lock().await;
        Self::require_label(&core)?;
        Ok(core.settings.clone())
    }

    /// Query and parse the printer's host status.
    ///
    /// A reply timeout fails the session like any other transport failure.
    pub async fn query_status(&self) -> Result<PrinterStatus, PrinterError> {
        let mut core = self.core.lock().await;
        let label = Self::require_label(&core)?;
        let query = label.status_query();

        let result = match self.dispatch(query).await {
            Ok(()) => self.read_status(label).await,
            Err(e) => Err(Self::as_write_failure(e)),
        };
        match result {
            Err(e) if e.is_transport_failure() => {
                self.fail(&mut core, &e).await;
                Err(e)
            }
            other => other,
        }
    }

    // ---- internals ----

    fn require_encoder(core: &SessionCore) -> Result<&dyn CommandEncoder, PrinterError> {
        if !core.state.is_connected() {
            return Err(PrinterError::NotConnected);
        }
        core.encoder.as_deref().ok_or(PrinterError::NotConnected)
    }

    fn require_label(core: &SessionCore) -> Result<&dyn LabelEncoder, PrinterError> {
        let encoder = Self::require_encoder(core)?;
        encoder.as_label().ok_or_else(|| {
            PrinterError::unsupported(format!(
                "{} printers have no label operations",
                encoder.dialect()
            ))
        })
    }

    /// Open the link and run the dialect handshake writes.
    async fn establish(
        &self,
        device: &Device,
        encoder: &dyn CommandEncoder,
    ) -> Result<(), PrinterError> {
        self.transport.connect(device).await?;
        self.dispatch(encoder.handshake())
            .await
            .map_err(Self::as_write_failure)
    }

    /// Read the reply to the handshake status query.
    ///
    /// A write-only link skips the check; a silent printer fails the connect.
    async fn await_readiness(&self, label: &dyn LabelEncoder) -> Result<(), PrinterError> {
        match self.read_status(label).await {
            Ok(status) => {
                if !status.is_ready() {
                    warn!(faults = ?status.faults(), "Printer connected but not ready");
                }
                Ok(())
            }
            Err(PrinterError::UnsupportedOperation(_)) => {
                debug!("Transport cannot read back, skipping readiness check");
                Ok(())
            }
            Err(PrinterError::InvalidArgument(msg)) => {
                warn!(error = %msg, "Unparseable status reply");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn read_status(&self, label: &dyn LabelEncoder) -> Result<PrinterStatus, PrinterError> {
        let timeout = self.config.status_timeout();
        let reply = tokio::time::timeout(timeout, self.transport.receive(timeout))
            .await
            .map_err(|_| PrinterError::ReadTimeout(self.config.status_timeout_ms))??;
        let status = label.parse_status(&reply)?;
        self.publish(PrinterEvent::printer_status_changed(status.clone()))
            .await;
        Ok(status)
    }

    /// Write every chunk in order, awaiting each, sleeping its settle delay after it.
    async fn dispatch(&self, command: EncodedCommand) -> Result<(), PrinterError> {
        debug!(
            chunks = command.len(),
            settle_ms = command.total_settle().as_millis() as u64,
            "Dispatching"
        );
        for chunk in command {
            self.transport.send(&chunk.bytes).await?;
            debug!(bytes = chunk.bytes.len(), "Chunk written");
            if self.config.pacing_enabled && !chunk.settle.is_zero() {
                tokio::time::sleep(chunk.settle).await;
            }
        }
        Ok(())
    }

    async fn run_job(
        &self,
        core: &mut SessionCore,
        command: EncodedCommand,
    ) -> Result<JobId, PrinterError> {
        let job_id = Uuid::new_v4().to_string();
        self.publish(PrinterEvent::job_status_changed(
            job_id.clone(),
            JobStatus::Sending,
            None,
        ))
        .await;

        match self.dispatch(command).await {
            Ok(()) => {
                self.publish(PrinterEvent::job_status_changed(
                    job_id.clone(),
                    JobStatus::Completed,
                    None,
                ))
                .await;
                Ok(job_id)
            }
            Err(e) => {
                let e = Self::as_write_failure(e);
                error!(job_id = %job_id, error = %e, "Print job failed");
                self.publish(PrinterEvent::job_status_changed(
                    job_id,
                    JobStatus::Failed,
                    Some(e.to_string()),
                ))
                .await;
                self.fail(core, &e).await;
                Err(e)
            }
        }
    }

    fn as_write_failure(error: PrinterError) -> PrinterError {
        match error {
            PrinterError::TransportWriteFailed(_) => error,
            other => PrinterError::TransportWriteFailed(other.to_string()),
        }
    }

    /// Move to `Failed` and release everything the attempt or session held.
    async fn fail(&self, core: &mut SessionCore, cause: &PrinterError) {
        error!(error = %cause, "Session failed");
        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "Transport release after failure also failed");
        }
        core.encoder = None;
        if let Err(e) = self
            .advance(core, ConnectionState::to_failed, Some(cause.to_string()))
            .await
        {
            warn!(error = %e, "Could not record failure");
        }
    }

    /// `Connected`/`Failed` → `Disconnecting` → `Disconnected`. Transport errors are
    /// reported on the final event but never stop the cleanup.
    async fn teardown(&self, core: &mut SessionCore) {
        if let Err(e) = self
            .advance(core, ConnectionState::to_disconnecting, None)
            .await
        {
            warn!(error = %e, "Teardown from unexpected state");
        }
        let release_error = match self.transport.disconnect().await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Transport disconnect failed, clearing session anyway");
                Some(e.to_string())
            }
        };
        core.encoder = None;
        if let Err(e) = self
            .advance(core, ConnectionState::to_disconnected, release_error)
            .await
        {
            warn!(error = %e, "Could not record disconnect");
        }
        core.device = None;
        core.settings = self.base_settings.clone();
        self.publish_snapshot(core);
    }

    /// A caller dropped a connect/disconnect future midway; finish what it started.
    async fn recover_interrupted(&self, core: &mut SessionCore) {
        if !core.state.is_transitioning() {
            return;
        }
        warn!(state = %core.state, "Previous call was cancelled mid-transition, recovering");
        match core.state {
            ConnectionState::Connecting => {
                let e = PrinterError::ConnectionFailed("connect attempt interrupted".into());
                self.fail(core, &e).await;
            }
            ConnectionState::Disconnecting => self.teardown_rest(core).await,
            _ => {}
        }
    }

    async fn teardown_rest(&self, core: &mut SessionCore) {
        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "Transport disconnect failed, clearing session anyway");
        }
        core.encoder = None;
        if let Err(e) = self
            .advance(core, ConnectionState::to_disconnected, None)
            .await
        {
            warn!(error = %e, "Could not record disconnect");
        }
        core.device = None;
        self.publish_snapshot(core);
    }

    async fn advance(
        &self,
        core: &mut SessionCore,
        transition: fn(&ConnectionState) -> Result<ConnectionState, &'static str>,
        error: Option<String>,
    ) -> Result<(), PrinterError> {
        let previous = core.state;
        let current =
            transition(&previous).map_err(|e| PrinterError::InvalidState(e.to_string()))?;
        core.state = current;
        if let Some(device) = core.device.as_mut() {
            device.last_known_state = current;
        }

        match &error {
            Some(error) => warn!(%previous, %current, error = %error, "Connection state changed"),
            None => info!(%previous, %current, "Connection state changed"),
        }

        self.publish_snapshot(core);
        self.publish(PrinterEvent::connection_state_changed(
            previous,
            current,
            core.device.clone(),
            error,
        ))
        .await;
        Ok(())
    }

    fn publish_snapshot(&self, core: &SessionCore) {
        self.snapshot.send_replace(SessionSnapshot {
            state: core.state,
            device: core.device.clone(),
        });
    }

    async fn publish(&self, event: PrinterEvent) {
        if let Err(e) = self.publisher.publish(event).await {
            error!("Failed to publish printer event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::device::Dialect;
    use domain::printer::TextFormat;
    use infrastructure::{DialectEncoderFactory, MockTransport};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingPublisher {
        events: StdMutex<Vec<PrinterEvent>>,
    }

    impl RecordingPublisher {
        fn transitions(&self) -> Vec<(ConnectionState, ConnectionState)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    PrinterEvent::ConnectionStateChanged {
                        previous, current, ..
                    } => Some((*previous, *current)),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(
            &self,
            event: PrinterEvent,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn session(transport: MockTransport) -> (PrinterSession, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let session = PrinterSession::new(
            Arc::new(transport),
            Arc::new(DialectEncoderFactory::default()),
            publisher.clone(),
            SessionConfig::default(),
            PrinterSettings::default(),
        );
        (session, publisher)
    }

    fn receipt_printer() -> Device {
        Device::new("00:11:22:33:44:55", Some("BT Thermal POS"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_walks_the_state_machine() {
        let (session, publisher) = session(MockTransport::new());
        session.connect(receipt_printer()).await.unwrap();

        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(
            session.connected_device().map(|d| d.address),
            Some("00:11:22:33:44:55".to_string())
        );
        assert_eq!(
            publisher.transitions(),
            vec![
                (ConnectionState::Disconnected, ConnectionState::Connecting),
                (ConnectionState::Connecting, ConnectionState::Connected),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_binding() {
        let (session, publisher) = session(MockTransport::new());
        session.connect(receipt_printer()).await.unwrap();
        session.disconnect().await.unwrap();

        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(session.connected_device().is_none());
        assert_eq!(
            publisher.transitions()[2..],
            [
                (ConnectionState::Connected, ConnectionState::Disconnecting),
                (ConnectionState::Disconnecting, ConnectionState::Disconnected),
            ]
        );
        assert_eq!(
            session
                .print(&PrintPrimitive::text("x", TextFormat::default()))
                .await,
            Err(PrinterError::NotConnected)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_connect_is_finished_by_the_next_call() {
        let transport = MockTransport::new().with_connect_delay(std::time::Duration::from_secs(5));
        let (session, publisher) = session(transport.clone());

        let attempt = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            session.connect(receipt_printer()),
        )
        .await;
        assert!(attempt.is_err());
        assert_eq!(session.state(), ConnectionState::Connecting);

        session.disconnect().await.unwrap();
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(transport.open_handles().await, 0);
        assert_eq!(
            publisher.transitions(),
            vec![
                (ConnectionState::Disconnected, ConnectionState::Connecting),
                (ConnectionState::Connecting, ConnectionState::Failed),
                (ConnectionState::Failed, ConnectionState::Disconnecting),
                (ConnectionState::Disconnecting, ConnectionState::Disconnected),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_follows_chunk_settle() {
        let transport = MockTransport::new();
        let (session, _) = session(transport.clone());
        session.connect(receipt_printer()).await.unwrap();
        transport.clear_writes().await;

        session
            .print(&PrintPrimitive::text("Hi", TextFormat::default()))
            .await
            .unwrap();

        let times = transport.write_times().await;
        assert_eq!(times.len(), 4);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= std::time::Duration::from_millis(50));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_label_ops_need_a_label_dialect() {
        let (session, _) = session(MockTransport::new());
        session
            .connect(receipt_printer().with_dialect(Dialect::EscPos))
            .await
            .unwrap();
        assert!(matches!(
            session.set_darkness(10).await,
            Err(PrinterError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            session.settings().await,
            Err(PrinterError::UnsupportedOperation(_))
        ));
    }
}
