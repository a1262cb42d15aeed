use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod publisher;
pub use publisher::{EventPublisher, PublishError};

use crate::connection::ConnectionState;
use crate::device::Device;
use crate::printer::{JobStatus, PrinterStatus};

/// Events observers receive from the orchestrator. There is no polling API for these
/// outcomes; subscribe to a publisher instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PrinterEvent {
    /// Session moved between connection states
    ConnectionStateChanged {
        previous: ConnectionState,
        current: ConnectionState,
        device: Option<Device>,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A scan or paired-list lookup produced a device
    DeviceDiscovered {
        device: Device,
        timestamp: DateTime<Utc>,
    },

    /// A print call started, completed or failed on the wire
    PrintJobStatusChanged {
        job_id: String,
        status: JobStatus,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A Zebra host-status reply was parsed
    PrinterStatusChanged {
        status: PrinterStatus,
        timestamp: DateTime<Utc>,
    },
}

impl PrinterEvent {
    /// Create a ConnectionStateChanged event
    pub fn connection_state_changed(
        previous: ConnectionState,
        current: ConnectionState,
        device: Option<Device>,
        error: Option<String>,
    ) -> Self {
        Self::ConnectionStateChanged {
            previous,
            current,
            device,
            error,
            timestamp: Utc::now(),
        }
    }

    /// Create a DeviceDiscovered event
    pub fn device_discovered(device: Device) -> Self {
        Self::DeviceDiscovered {
            device,
            timestamp: Utc::now(),
        }
    }

    /// Create a PrintJobStatusChanged event
    pub fn job_status_changed(
        job_id: impl Into<String>,
        status: JobStatus,
        error: Option<String>,
    ) -> Self {
        Self::PrintJobStatusChanged {
            job_id: job_id.into(),
            status,
            error,
            timestamp: Utc::now(),
        }
    }

    /// Create a PrinterStatusChanged event
    pub fn printer_status_changed(status: PrinterStatus) -> Self {
        Self::PrinterStatusChanged {
            status,
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ConnectionStateChanged { timestamp, .. } => *timestamp,
            Self::DeviceDiscovered { timestamp, .. } => *timestamp,
            Self::PrintJobStatusChanged { timestamp, .. } => *timestamp,
            Self::PrinterStatusChanged { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &str {
        match self {
            Self::ConnectionStateChanged { .. } => "ConnectionStateChanged",
            Self::DeviceDiscovered { .. } => "DeviceDiscovered",
            Self::PrintJobStatusChanged { .. } => "PrintJobStatusChanged",
            Self::PrinterStatusChanged { .. } => "PrinterStatusChanged",
        }
    }
}
