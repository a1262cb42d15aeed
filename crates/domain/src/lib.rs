//! Domain layer - printer protocol types with no I/O
//!
//! This crate contains:
//! - Entities (Device) and the name-based DeviceClassifier
//! - Value Objects (Dialect, PrintPrimitive, EncodedCommand, PrinterSettings)
//! - The connection state machine
//! - Printer events and the EventPublisher interface
//! - Seams implemented elsewhere: PrinterTransport, CommandEncoder, EncoderFactory
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Validation rules enforced at domain level
//! - Testable in isolation

pub mod connection;
pub mod device;
pub mod error;
pub mod event;
pub mod printer;

// Re-export commonly used types
pub use connection::{ConnectionState, PrinterTransport};
pub use device::{Device, DeviceClassifier, Dialect, LabelLanguage};
pub use error::PrinterError;
pub use event::{EventPublisher, PrinterEvent};
pub use printer::{EncodedCommand, PrintPrimitive, PrinterSettings, SessionConfig};
