use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{Device, PrinterError, PrinterTransport};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Fixed behaviour of a mock link, set up before it is shared.
#[derive(Debug, Clone)]
struct MockConfig {
    available: bool,
    permissions_granted: bool,
    read_back: bool,
    devices: Vec<Device>,
    paired: Vec<Device>,
    scan_delay: Duration,
    connect_delay: Option<Duration>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            available: true,
            permissions_granted: true,
            read_back: true,
            devices: Vec::new(),
            paired: Vec::new(),
            scan_delay: Duration::ZERO,
            connect_delay: None,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    connected: Option<String>,
    writes: Vec<(Instant, Vec<u8>)>,
    connect_calls: usize,
    disconnect_calls: usize,
    open_handles: usize,
    replies: VecDeque<Vec<u8>>,
    connect_failure: Option<PrinterError>,
    send_failure: Option<(usize, PrinterError)>,
}

/// In-memory transport that records every write as its own chunk.
///
/// Used by tests and by the agent's dry-run mode. Clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    config: MockConfig,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices returned by `scan`
    pub fn with_devices(mut self, devices: Vec<Device>) -> Self {
        self.config.devices = devices;
        self
    }

    /// Devices returned by `paired_devices`
    pub fn with_paired(mut self, devices: Vec<Device>) -> Self {
        self.config.paired = devices.into_iter().map(|d| d.paired(true)).collect();
        self
    }

    pub fn with_scan_delay(mut self, delay: Duration) -> Self {
        self.config.scan_delay = delay;
        self
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.config.connect_delay = Some(delay);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.config.available = false;
        self
    }

    pub fn deny_permissions(mut self) -> Self {
        self.config.permissions_granted = false;
        self
    }

    /// Behave like a write-only link
    pub fn without_read_back(mut self) -> Self {
        self.config.read_back = false;
        self
    }

    /// Make the next `connect` fail with `error`
    pub async fn fail_next_connect(&self, error: PrinterError) {
        self.state.lock().await.connect_failure = Some(error);
    }

    /// Let `accepted` more writes through, then fail every write with `error`
    pub async fn fail_sends_after(&self, accepted: usize, error: PrinterError) {
        let mut state = self.state.lock().await;
        let limit = state.writes.len() + accepted;
        state.send_failure = Some((limit, error));
    }

    pub async fn heal(&self) {
        let mut state = self.state.lock().await;
        state.send_failure = None;
        state.connect_failure = None;
    }

    /// Queue a reply for the next `receive`
    pub async fn queue_reply(&self, reply: impl Into<Vec<u8>>) {
        self.state.lock().await.replies.push_back(reply.into());
    }

    pub async fn writes(&self) -> Vec<Vec<u8>> {
        let state = self.state.lock().await;
        state.writes.iter().map(|(_, bytes)| bytes.clone()).collect()
    }

    pub async fn write_times(&self) -> Vec<Instant> {
        let state = self.state.lock().await;
        state.writes.iter().map(|(at, _)| *at).collect()
    }

    /// Every written byte, concatenated
    pub async fn written_bytes(&self) -> Vec<u8> {
        let state = self.state.lock().await;
        state
            .writes
            .iter()
            .flat_map(|(_, bytes)| bytes.iter().copied())
            .collect()
    }

    pub async fn clear_writes(&self) {
        self.state.lock().await.writes.clear();
    }

    pub async fn connect_calls(&self) -> usize {
        self.state.lock().await.connect_calls
    }

    pub async fn disconnect_calls(&self) -> usize {
        self.state.lock().await.disconnect_calls
    }

    /// Links opened and not yet closed
    pub async fn open_handles(&self) -> usize {
        self.state.lock().await.open_handles
    }

    pub async fn connected_address(&self) -> Option<String> {
        self.state.lock().await.connected.clone()
    }
}

#[async_trait]
impl PrinterTransport for MockTransport {
    fn is_available(&self) -> bool {
        self.config.available
    }

    async fn request_permissions(&self) -> bool {
        self.config.permissions_granted
    }

    async fn scan(&self, timeout: Duration) -> Result<Vec<Device>, PrinterError> {
        if !self.config.available {
            return Err(PrinterError::TransportUnavailable("mock adapter off".into()));
        }
        tokio::time::sleep(self.config.scan_delay.min(timeout)).await;
        Ok(self.config.devices.clone())
    }

    async fn paired_devices(&self) -> Result<Vec<Device>, PrinterError> {
        if !self.config.available {
            return Err(PrinterError::TransportUnavailable("mock adapter off".into()));
        }
        Ok(self.config.paired.clone())
    }

    async fn connect(&self, device: &Device) -> Result<(), PrinterError> {
        {
            let mut state = self.state.lock().await;
            state.connect_calls += 1;
            if let Some(error) = state.connect_failure.take() {
                return Err(error);
            }
        }
        if let Some(delay) = self.config.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().await;
        state.connected = Some(device.address.clone());
        state.open_handles += 1;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PrinterError> {
        let mut state = self.state.lock().await;
        state.disconnect_calls += 1;
        if state.connected.take().is_some() {
            state.open_handles = state.open_handles.saturating_sub(1);
        }
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), PrinterError> {
        let mut state = self.state.lock().await;
        if state.connected.is_none() {
            return Err(PrinterError::NotConnected);
        }
        if let Some((limit, error)) = &state.send_failure {
            if state.writes.len() >= *limit {
                return Err(error.clone());
            }
        }
        state.writes.push((Instant::now(), data.to_vec()));
        Ok(())
    }

    async fn receive(&self, timeout: Duration) -> Result<Vec<u8>, PrinterError> {
        if !self.config.read_back {
            return Err(PrinterError::unsupported("transport cannot read back"));
        }
        let reply = {
            let mut state = self.state.lock().await;
            if state.connected.is_none() {
                return Err(PrinterError::NotConnected);
            }
            state.replies.pop_front()
        };
        match reply {
            Some(reply) => Ok(reply),
            None => {
                tokio::time::sleep(timeout).await;
                Err(PrinterError::ReadTimeout(timeout.as_millis() as u64))
            }
        }
    }
}
