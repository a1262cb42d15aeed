mod connection_state;
mod transport;

pub use connection_state::ConnectionState;
pub use transport::PrinterTransport;

#[cfg(test)]
pub use transport::MockPrinterTransport;
