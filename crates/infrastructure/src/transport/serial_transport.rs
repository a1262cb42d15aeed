use std::time::Duration;

use async_trait::async_trait;
use domain::{Device, PrinterError, PrinterTransport};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};

/// Gap that ends a multi-frame reply once the first bytes arrived
const REPLY_QUIET_GAP: Duration = Duration::from_millis(100);

/// Serial link bound to a Bluetooth printer (`/dev/rfcommN`, a Windows BT COM port)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port used when a device carries no port of its own
    #[serde(default)]
    pub port: Option<String>,
    /// Advertised name to report for `port`, used for dialect classification
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: String, // "None", "Even", "Odd"
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    115200
}
fn default_data_bits() -> u8 {
    8
}
fn default_parity() -> String {
    "None".to_string()
}
fn default_stop_bits() -> u8 {
    1
}
fn default_timeout_ms() -> u64 {
    1000
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            name: None,
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: Some(port.into()),
            ..Self::default()
        }
    }

    fn to_parity(&self) -> Result<tokio_serial::Parity, PrinterError> {
        match self.parity.as_str() {
            "None" => Ok(tokio_serial::Parity::None),
            "Even" => Ok(tokio_serial::Parity::Even),
            "Odd" => Ok(tokio_serial::Parity::Odd),
            _ => Err(PrinterError::invalid(format!(
                "Invalid parity: {}",
                self.parity
            ))),
        }
    }

    fn to_stop_bits(&self) -> Result<tokio_serial::StopBits, PrinterError> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            _ => Err(PrinterError::invalid(format!(
                "Invalid stop bits: {}",
                self.stop_bits
            ))),
        }
    }

    fn to_data_bits(&self) -> Result<tokio_serial::DataBits, PrinterError> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            _ => Err(PrinterError::invalid(format!(
                "Invalid data bits: {}",
                self.data_bits
            ))),
        }
    }
}

/// Normalize port name for Windows (e.g., COM7 -> \\.\COM7)
fn native_port_name(port: &str) -> String {
    if cfg!(target_os = "windows") && !port.to_uppercase().starts_with(r"\\.\") {
        format!(r"\\.\{}", port)
    } else {
        port.to_string()
    }
}

fn looks_like_bluetooth(info: &tokio_serial::SerialPortInfo) -> bool {
    matches!(info.port_type, SerialPortType::BluetoothPort) || info.port_name.contains("rfcomm")
}

/// Printer transport over a Bluetooth serial port.
///
/// A device's `address` is the port path. Discovery lists the serial ports the OS exposes
/// for Bluetooth links; pairing and RFCOMM binding happen outside this process.
pub struct SerialTransport {
    config: SerialConfig,
    port: Mutex<Option<SerialStream>>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            port: Mutex::new(None),
        }
    }

    /// Device for the configured port, if any
    pub fn configured_device(&self) -> Option<Device> {
        self.config
            .port
            .as_ref()
            .map(|port| Device::new(port.clone(), self.config.name.as_deref()).paired(true))
    }

    fn list_ports(&self) -> Result<Vec<Device>, PrinterError> {
        let ports = tokio_serial::available_ports()
            .map_err(|e| PrinterError::TransportUnavailable(e.to_string()))?;

        let mut devices: Vec<Device> = ports
            .iter()
            .filter(|info| looks_like_bluetooth(info))
            .map(|info| {
                let name = if self.config.port.as_deref() == Some(info.port_name.as_str()) {
                    self.config.name.clone()
                } else {
                    None
                };
                let name = name.as_deref().unwrap_or(info.port_name.as_str());
                Device::new(info.port_name.clone(), Some(name)).paired(true)
            })
            .collect();

        if let Some(configured) = self.configured_device() {
            if !devices.iter().any(|d| d.address == configured.address) {
                devices.push(configured);
            }
        }
        Ok(devices)
    }
}

#[async_trait]
impl PrinterTransport for SerialTransport {
    fn is_available(&self) -> bool {
        tokio_serial::available_ports().is_ok()
    }

    async fn request_permissions(&self) -> bool {
        // Port access is granted by group membership (dialout), nothing to ask for at runtime
        true
    }

    async fn scan(&self, _timeout: Duration) -> Result<Vec<Device>, PrinterError> {
        let devices = self.list_ports()?;
        tracing::debug!(count = devices.len(), "Serial ports enumerated");
        Ok(devices)
    }

    async fn paired_devices(&self) -> Result<Vec<Device>, PrinterError> {
        self.list_ports()
    }

    async fn connect(&self, device: &Device) -> Result<(), PrinterError> {
        let mut guard = self.port.lock().await;
        if let Some(mut old) = guard.take() {
            if let Err(e) = old.shutdown().await {
                tracing::warn!(error = %e, "Error closing previous serial port");
            }
        }

        let port_name = native_port_name(&device.address);
        tracing::debug!(
            port = %port_name,
            baud_rate = self.config.baud_rate,
            "Opening serial port"
        );

        let port = tokio_serial::new(&port_name, self.config.baud_rate)
            .data_bits(self.config.to_data_bits()?)
            .parity(self.config.to_parity()?)
            .stop_bits(self.config.to_stop_bits()?)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .open_native_async()
            .map_err(|e| {
                tracing::warn!(port = %port_name, error = %e, "Failed to open serial port");
                match e.kind() {
                    tokio_serial::ErrorKind::NoDevice => {
                        PrinterError::DeviceNotFound(device.address.clone())
                    }
                    tokio_serial::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                        PrinterError::PermissionDenied(format!("{}: {}", port_name, e))
                    }
                    _ => PrinterError::ConnectionFailed(format!(
                        "Failed to open serial port {}: {}",
                        port_name, e
                    )),
                }
            })?;

        *guard = Some(port);
        tracing::debug!(port = %device.address, "Serial port opened successfully");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PrinterError> {
        if let Some(mut port) = self.port.lock().await.take() {
            if let Err(e) = port.shutdown().await {
                tracing::warn!(error = %e, "Error shutting down serial port");
            }
            tracing::info!("Serial port disconnected");
        }
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), PrinterError> {
        let mut guard = self.port.lock().await;
        let port = guard.as_mut().ok_or(PrinterError::NotConnected)?;

        port.write_all(data)
            .await
            .map_err(|e| PrinterError::TransportWriteFailed(format!("Write error: {}", e)))?;
        port.flush()
            .await
            .map_err(|e| PrinterError::TransportWriteFailed(format!("Flush error: {}", e)))?;
        Ok(())
    }

    async fn receive(&self, timeout: Duration) -> Result<Vec<u8>, PrinterError> {
        let mut guard = self.port.lock().await;
        let port = guard.as_mut().ok_or(PrinterError::NotConnected)?;

        let mut reply = Vec::new();
        let mut buffer = vec![0u8; 1024];

        match tokio::time::timeout(timeout, port.read(&mut buffer)).await {
            Ok(Ok(n)) if n > 0 => reply.extend_from_slice(&buffer[..n]),
            Ok(Ok(_)) | Err(_) => {
                return Err(PrinterError::ReadTimeout(timeout.as_millis() as u64));
            }
            Ok(Err(e)) => {
                return Err(PrinterError::ConnectionFailed(format!("Read error: {}", e)));
            }
        }

        // Status replies span several frames; keep reading until the line goes quiet
        loop {
            match tokio::time::timeout(REPLY_QUIET_GAP, port.read(&mut buffer)).await {
                Ok(Ok(n)) if n > 0 => reply.extend_from_slice(&buffer[..n]),
                _ => break,
            }
        }
        Ok(reply)
    }
}
