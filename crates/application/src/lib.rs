//! Application layer - the printer session and the orchestrator callers drive

pub mod printer;

pub use printer::{JobId, PrinterOrchestrator, PrinterSession, SessionSnapshot};
