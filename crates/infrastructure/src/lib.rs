//! Infrastructure layer - dialect encoders, transports, publishers and configuration

pub mod config;
pub mod messaging;
pub mod protocol;
pub mod transport;

pub use config::{AgentConfig, TransportKind};
pub use messaging::{BroadcastEventPublisher, CompositeEventPublisher, LoggingEventPublisher};
pub use protocol::{CpclEncoder, DialectEncoderFactory, EscPosEncoder, GenericEncoder, ZplEncoder};
pub use transport::{FileTransport, MockTransport, SerialConfig, SerialTransport};
