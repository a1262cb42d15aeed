use thiserror::Error;

/// Errors surfaced by the printer core.
///
/// Validation errors (`InvalidArgument`, `UnsupportedOperation`) are raised before any
/// transport write. Transport errors (`TransportWriteFailed`, `ConnectTimeout`,
/// `ReadTimeout`) also move the session to `Failed`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrinterError {
    #[error("Bluetooth transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Connection timed out after {0} ms")]
    ConnectTimeout(u64),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transport write failed: {0}")]
    TransportWriteFailed(String),

    #[error("Status read timed out after {0} ms")]
    ReadTimeout(u64),

    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    #[error("Scan cancelled")]
    ScanCancelled,
}

impl PrinterError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    /// Errors that originate on the wire rather than in argument validation.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::TransportWriteFailed(_)
                | Self::ConnectTimeout(_)
                | Self::ConnectionFailed(_)
                | Self::ReadTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PrinterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failures_are_classified() {
        assert!(PrinterError::TransportWriteFailed("eof".into()).is_transport_failure());
        assert!(PrinterError::ConnectTimeout(100).is_transport_failure());
        assert!(PrinterError::ReadTimeout(100).is_transport_failure());
        assert!(!PrinterError::NotConnected.is_transport_failure());
        assert!(!PrinterError::invalid("bad").is_transport_failure());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(PrinterError::NotConnected.to_string(), "Not connected");
        assert_eq!(
            PrinterError::ConnectTimeout(5000).to_string(),
            "Connection timed out after 5000 ms"
        );
    }
}
