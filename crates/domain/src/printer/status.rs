use serde::{Deserialize, Serialize};

/// Printer condition reported by a Zebra host-status reply.
///
/// Only parsed replies produce a `PrinterStatus`; a query that was merely sent says nothing
/// about readiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PrinterStatus {
    pub paper_out: bool,
    pub paused: bool,
    pub head_open: bool,
    pub ribbon_out: bool,
    pub over_temperature: bool,
    pub under_temperature: bool,
    pub buffer_full: bool,
    pub labels_remaining: u32,
}

impl PrinterStatus {
    pub fn is_ready(&self) -> bool {
        !(self.paper_out
            || self.paused
            || self.head_open
            || self.ribbon_out
            || self.over_temperature
            || self.buffer_full)
    }

    /// Human-readable list of active fault flags
    pub fn faults(&self) -> Vec<&'static str> {
        let flags = [
            (self.paper_out, "paper out"),
            (self.paused, "paused"),
            (self.head_open, "head open"),
            (self.ribbon_out, "ribbon out"),
            (self.over_temperature, "over temperature"),
            (self.under_temperature, "under temperature"),
            (self.buffer_full, "buffer full"),
        ];
        flags
            .into_iter()
            .filter_map(|(set, name)| set.then_some(name))
            .collect()
    }
}

/// Lifecycle of one print call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Sending,
    Completed,
    Failed,
}
