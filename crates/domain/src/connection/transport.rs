use std::time::Duration;

use async_trait::async_trait;

use crate::device::Device;
use crate::error::PrinterError;

/// Byte-stream transport provided by the platform Bluetooth layer.
///
/// Implementations use interior mutability: the orchestrator scans through the same handle
/// the session writes through, so every method takes `&self`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrinterTransport: Send + Sync {
    /// Whether the radio/adapter is present and switched on
    fn is_available(&self) -> bool;

    /// Ask the platform for the permissions scanning and connecting need
    async fn request_permissions(&self) -> bool;

    /// Discover nearby devices for at most `timeout`
    async fn scan(&self, timeout: Duration) -> Result<Vec<Device>, PrinterError>;

    /// Devices already bonded with this host
    async fn paired_devices(&self) -> Result<Vec<Device>, PrinterError>;

    /// Open the link to `device`
    async fn connect(&self, device: &Device) -> Result<(), PrinterError>;

    /// Close the link. Must be safe to call when nothing is open.
    async fn disconnect(&self) -> Result<(), PrinterError>;

    /// Write one chunk and wait until the transport accepted it
    async fn send(&self, data: &[u8]) -> Result<(), PrinterError>;

    /// Read whatever the printer answered within `timeout`
    async fn receive(&self, timeout: Duration) -> Result<Vec<u8>, PrinterError> {
        let _ = timeout;
        Err(PrinterError::unsupported("transport cannot read back"))
    }
}
