pub mod file_transport;
pub mod mock_transport;
pub mod serial_transport;

pub use file_transport::FileTransport;
pub use mock_transport::MockTransport;
pub use serial_transport::{SerialConfig, SerialTransport};
