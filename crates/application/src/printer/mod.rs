pub mod orchestrator;
pub mod session;

pub use orchestrator::PrinterOrchestrator;
pub use session::{JobId, PrinterSession, SessionSnapshot};
