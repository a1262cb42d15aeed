use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PrinterError;

pub const DARKNESS_RANGE: std::ops::RangeInclusive<i32> = 0..=30;
pub const SPEED_RANGE: std::ops::RangeInclusive<i32> = 1..=14;

/// Validate a darkness value (0-30). Out-of-range values are rejected, never clamped.
pub fn validate_darkness(value: i32) -> Result<u8, PrinterError> {
    if DARKNESS_RANGE.contains(&value) {
        Ok(value as u8)
    } else {
        Err(PrinterError::invalid(format!(
            "darkness {} outside {}..={}",
            value,
            DARKNESS_RANGE.start(),
            DARKNESS_RANGE.end()
        )))
    }
}

/// Validate a print speed (1-14).
pub fn validate_speed(value: i32) -> Result<u8, PrinterError> {
    if SPEED_RANGE.contains(&value) {
        Ok(value as u8)
    } else {
        Err(PrinterError::invalid(format!(
            "speed {} outside {}..={}",
            value,
            SPEED_RANGE.start(),
            SPEED_RANGE.end()
        )))
    }
}

/// Per-session print settings. Label dialects read the layout fields; ESC/POS ignores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterSettings {
    #[serde(default)]
    pub darkness: Option<u8>,
    #[serde(default)]
    pub speed: Option<u8>,
    /// Label width in dots
    #[serde(default)]
    pub label_width: Option<u32>,
    /// Label length in dots
    #[serde(default)]
    pub label_length: Option<u32>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_origin")]
    pub origin_x: u32,
    #[serde(default = "default_origin")]
    pub origin_y: u32,
    /// Text height in dots, also the vertical step between stacked fields
    #[serde(default = "default_line_height")]
    pub line_height: u32,
    #[serde(default = "default_copies")]
    pub copies: u32,
}

fn default_dpi() -> u32 {
    203
}
fn default_origin() -> u32 {
    20
}
fn default_line_height() -> u32 {
    30
}
fn default_copies() -> u32 {
    1
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            darkness: None,
            speed: None,
            label_width: None,
            label_length: None,
            dpi: default_dpi(),
            origin_x: default_origin(),
            origin_y: default_origin(),
            line_height: default_line_height(),
            copies: default_copies(),
        }
    }
}

/// Timeouts and pacing applied by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,
    /// Honour the settle delays encoders attach to each chunk
    #[serde(default = "default_pacing_enabled")]
    pub pacing_enabled: bool,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_status_timeout_ms() -> u64 {
    2_000
}
fn default_pacing_enabled() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            status_timeout_ms: default_status_timeout_ms(),
            pacing_enabled: default_pacing_enabled(),
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }
}
