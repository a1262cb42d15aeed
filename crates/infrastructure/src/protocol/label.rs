//! Pieces shared by the ZPL and CPCL encoders.

use std::time::Duration;

use domain::PrinterError;
use domain::printer::PrinterSettings;

/// A full label is one write; give the printer time to render it.
pub const LABEL_SETTLE: Duration = Duration::from_millis(200);
/// Standalone setting commands (`~SD`, `setvar`, ...)
pub const SETTING_SETTLE: Duration = Duration::from_millis(100);

pub const MAX_LABEL_DOTS: u32 = 32_000;

/// Rough QR symbol side in modules, used only to advance the layout cursor.
const QR_MODULES_ESTIMATE: u32 = 29;

/// Upper-case hex, the graphic field encoding both languages accept.
pub fn hex_upper(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0F) as usize] as char);
    }
    out
}

pub fn validate_dimensions(width: u32, length: u32) -> Result<(), PrinterError> {
    for (name, value) in [("width", width), ("length", length)] {
        if value == 0 || value > MAX_LABEL_DOTS {
            return Err(PrinterError::invalid(format!(
                "label {} {} outside 1..={}",
                name, value, MAX_LABEL_DOTS
            )));
        }
    }
    Ok(())
}

/// Top-to-bottom placement of fields on one label.
#[derive(Debug)]
pub struct Cursor {
    pub x: u32,
    pub y: u32,
    pub line_height: u32,
}

impl Cursor {
    pub fn new(settings: &PrinterSettings) -> Self {
        Self {
            x: settings.origin_x,
            y: settings.origin_y,
            line_height: settings.line_height.max(1),
        }
    }

    /// Return the current row and move down by `height`.
    pub fn take(&mut self, height: u32) -> u32 {
        let y = self.y;
        self.y = self.y.saturating_add(height);
        y
    }

    pub fn take_lines(&mut self, lines: u32) -> u32 {
        self.take(self.line_height.saturating_mul(lines))
    }

    pub fn qr_height(magnification: u8) -> u32 {
        QR_MODULES_ESTIMATE * magnification as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_upper() {
        assert_eq!(hex_upper(&[0x00, 0xAB, 0x7F]), "00AB7F");
        assert_eq!(hex_upper(&[]), "");
    }

    #[test]
    fn test_dimension_bounds() {
        assert!(validate_dimensions(812, 1218).is_ok());
        assert!(validate_dimensions(0, 100).is_err());
        assert!(validate_dimensions(100, MAX_LABEL_DOTS + 1).is_err());
    }

    #[test]
    fn test_cursor_advances() {
        let settings = PrinterSettings::default();
        let mut cursor = Cursor::new(&settings);
        assert_eq!(cursor.take_lines(1), settings.origin_y);
        assert_eq!(cursor.take(100), settings.origin_y + settings.line_height);
        assert_eq!(cursor.y, settings.origin_y + settings.line_height + 100);
    }
}
