use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain::{Device, PrinterError, PrinterTransport};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// Spool sink: every write is appended to a file (or a printer share / device node).
///
/// Write-only; status queries fall back to the trait's unsupported `receive`.
pub struct FileTransport {
    path: PathBuf,
    name: Option<String>,
    connected: AtomicBool,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
            connected: AtomicBool::new(false),
        }
    }

    /// Name reported for the sink, so classification can pick a dialect
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn device(&self) -> Device {
        Device::new(self.path.display().to_string(), self.name.as_deref()).paired(true)
    }
}

#[async_trait]
impl PrinterTransport for FileTransport {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_permissions(&self) -> bool {
        true
    }

    async fn scan(&self, _timeout: Duration) -> Result<Vec<Device>, PrinterError> {
        Ok(vec![self.device()])
    }

    async fn paired_devices(&self) -> Result<Vec<Device>, PrinterError> {
        Ok(vec![self.device()])
    }

    async fn connect(&self, device: &Device) -> Result<(), PrinterError> {
        info!("Preparing to print to file/share: {:?}", self.path);
        if device.address != self.device().address {
            return Err(PrinterError::DeviceNotFound(device.address.clone()));
        }
        // Open/close per write so shares are never held locked; connect only checks access.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                error!("Failed to open printer file {:?}: {}", self.path, e);
                PrinterError::ConnectionFailed(e.to_string())
            })?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PrinterError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), PrinterError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(PrinterError::NotConnected);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                error!("Failed to open printer file {:?}: {}", self.path, e);
                PrinterError::TransportWriteFailed(e.to_string())
            })?;
        if let Err(e) = file.write_all(data).await {
            error!("Failed to write to printer file: {}", e);
            return Err(PrinterError::TransportWriteFailed(e.to_string()));
        }
        if let Err(e) = file.flush().await {
            error!("Failed to flush to printer file: {}", e);
            return Err(PrinterError::TransportWriteFailed(e.to_string()));
        }
        Ok(())
    }
}
