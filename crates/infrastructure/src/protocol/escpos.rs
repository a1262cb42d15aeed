//! ESC/POS command builders and encoder.
//!
//! Every command is its own transport write. Receipt printers drop bytes when writes
//! arrive back-to-back, so each chunk carries a settle delay; the cutter gets the longest.

use std::time::Duration;

use domain::device::Dialect;
use domain::printer::{
    Alignment, BarcodeSymbology, CommandEncoder, CutMode, EncodedCommand, FeedDirection,
    PrintPrimitive, PrinterSettings, QrErrorLevel, raster_row_bytes, validate_raster,
};
use domain::PrinterError;

pub const ESC: u8 = 0x1B;
pub const GS: u8 = 0x1D;
pub const LF: u8 = 0x0A;
pub const NUL: u8 = 0x00;

pub const COMMAND_SETTLE: Duration = Duration::from_millis(50);
pub const QR_STEP_SETTLE: Duration = Duration::from_millis(50);
pub const IMAGE_SETTLE: Duration = Duration::from_millis(100);
pub const CUT_SETTLE: Duration = Duration::from_millis(500);

pub const BARCODE_HEIGHT_RANGE: std::ops::RangeInclusive<u16> = 1..=255;
pub const BARCODE_WIDTH_RANGE: std::ops::RangeInclusive<u8> = 2..=6;
pub const QR_SIZE_RANGE: std::ops::RangeInclusive<u8> = 1..=8;

/// ESC @ - reset the printer to power-on defaults
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// ESC a n - justification (0 left, 1 center, 2 right)
pub fn align(alignment: Alignment) -> Vec<u8> {
    let n = match alignment {
        Alignment::Left => 0,
        Alignment::Center => 1,
        Alignment::Right => 2,
    };
    vec![ESC, b'a', n]
}

/// ESC E n - emphasized mode
pub fn bold(on: bool) -> Vec<u8> {
    vec![ESC, b'E', on as u8]
}

/// ESC - n - underline mode
pub fn underline(on: bool) -> Vec<u8> {
    vec![ESC, b'-', on as u8]
}

/// ESC E 0 + ESC - 0
pub fn reset_format() -> Vec<u8> {
    let mut cmd = bold(false);
    cmd.extend(underline(false));
    cmd
}

/// GS h n - barcode height in dots
pub fn barcode_height(n: u8) -> Vec<u8> {
    vec![GS, b'h', n]
}

/// GS w n - barcode module width
pub fn barcode_width(n: u8) -> Vec<u8> {
    vec![GS, b'w', n]
}

/// GS H n - HRI position (2 = below)
pub fn hri_position(n: u8) -> Vec<u8> {
    vec![GS, b'H', n]
}

/// GS f n - HRI font
pub fn hri_font(n: u8) -> Vec<u8> {
    vec![GS, b'f', n]
}

/// `m` selector for GS k and whether the data is NUL-terminated
fn symbology_code(symbology: BarcodeSymbology) -> (u8, bool) {
    match symbology {
        BarcodeSymbology::UpcA => (0, false),
        BarcodeSymbology::UpcE => (1, false),
        BarcodeSymbology::Ean13 => (2, false),
        BarcodeSymbology::Ean8 => (3, false),
        BarcodeSymbology::Code39 => (4, true),
        BarcodeSymbology::Itf => (5, true),
        BarcodeSymbology::Codabar => (6, true),
        BarcodeSymbology::Code128 => (8, true),
    }
}

/// GS k m d1...dk [NUL] - print barcode. Data must already be validated.
pub fn barcode(symbology: BarcodeSymbology, data: &str) -> Vec<u8> {
    let (m, terminated) = symbology_code(symbology);
    let mut cmd = vec![GS, b'k', m];
    cmd.extend_from_slice(data.as_bytes());
    if terminated {
        cmd.push(NUL);
    }
    cmd
}

/// GS ( k header: cn = 49 ('1', QR), then fn and parameters
fn qr_function(fn_code: u8, params: &[u8]) -> Vec<u8> {
    let len = (params.len() + 2) as u16;
    let [p_l, p_h] = len.to_le_bytes();
    let mut cmd = vec![GS, b'(', b'k', p_l, p_h, 49, fn_code];
    cmd.extend_from_slice(params);
    cmd
}

/// Function 165: select model 2
pub fn qr_model() -> Vec<u8> {
    qr_function(65, &[50, 0])
}

/// Function 167: module size in dots (1-8)
pub fn qr_module_size(size: u8) -> Vec<u8> {
    qr_function(67, &[size])
}

/// Function 169: error correction level, sent as 48 + level
pub fn qr_error_level(level: QrErrorLevel) -> Vec<u8> {
    qr_function(69, &[48 + level.level()])
}

/// Function 180: store data in the symbol area. `pL pH` = payload length + 3.
pub fn qr_store(data: &[u8]) -> Vec<u8> {
    let mut params = Vec::with_capacity(data.len() + 1);
    params.push(48);
    params.extend_from_slice(data);
    qr_function(80, &params)
}

/// Function 181: print the stored symbol
pub fn qr_print() -> Vec<u8> {
    qr_function(81, &[48])
}

/// GS v 0 m xL xH yL yH - raster bit image header, x in bytes, y in dots
pub fn raster_header(width_bytes: u16, height: u16) -> Vec<u8> {
    let [x_l, x_h] = width_bytes.to_le_bytes();
    let [y_l, y_h] = height.to_le_bytes();
    vec![GS, b'v', b'0', 0, x_l, x_h, y_l, y_h]
}

/// GS V m - cut paper
pub fn cut(mode: CutMode) -> Vec<u8> {
    let m = match mode {
        CutMode::Partial => 0,
        CutMode::Full => 1,
    };
    vec![GS, b'V', m]
}

/// ESC J n forward / ESC K n backward
pub fn feed(direction: FeedDirection, lines: u8) -> Vec<u8> {
    let code = match direction {
        FeedDirection::Forward => b'J',
        FeedDirection::Backward => b'K',
    };
    vec![ESC, code, lines]
}

/// Encoder for ESC/POS receipt printers.
#[derive(Debug, Clone, Default)]
pub struct EscPosEncoder;

impl EscPosEncoder {
    pub fn new() -> Self {
        Self
    }

    fn text(&self, content: &str, alignment: Alignment, is_bold: bool, is_underline: bool) -> EncodedCommand {
        let mut cmd = EncodedCommand::single(align(alignment), COMMAND_SETTLE);
        if is_bold {
            cmd.push(bold(true), COMMAND_SETTLE);
        }
        if is_underline {
            cmd.push(underline(true), COMMAND_SETTLE);
        }
        cmd.push(content.as_bytes(), COMMAND_SETTLE);
        cmd.push(reset_format(), COMMAND_SETTLE);
        cmd.push(vec![LF], COMMAND_SETTLE);
        cmd
    }

    fn barcode(
        &self,
        data: &str,
        symbology: BarcodeSymbology,
        height: u16,
        width: u8,
    ) -> Result<EncodedCommand, PrinterError> {
        symbology.validate(data)?;
        if !BARCODE_HEIGHT_RANGE.contains(&height) {
            return Err(PrinterError::invalid(format!(
                "barcode height {} outside 1..=255",
                height
            )));
        }
        if !BARCODE_WIDTH_RANGE.contains(&width) {
            return Err(PrinterError::invalid(format!(
                "barcode width {} outside 2..=6",
                width
            )));
        }
        if data.len() > 255 {
            return Err(PrinterError::invalid("barcode data longer than 255 bytes"));
        }

        let mut cmd = EncodedCommand::single(barcode_height(height as u8), COMMAND_SETTLE);
        cmd.push(barcode_width(width), COMMAND_SETTLE);
        cmd.push(hri_position(2), COMMAND_SETTLE);
        cmd.push(hri_font(0), COMMAND_SETTLE);
        cmd.push(barcode(symbology, data), COMMAND_SETTLE);
        Ok(cmd)
    }

    fn qr_code(
        &self,
        data: &str,
        size: u8,
        error_level: QrErrorLevel,
    ) -> Result<EncodedCommand, PrinterError> {
        if data.is_empty() {
            return Err(PrinterError::invalid("QR data is empty"));
        }
        if !QR_SIZE_RANGE.contains(&size) {
            return Err(PrinterError::invalid(format!(
                "QR module size {} outside 1..=8",
                size
            )));
        }
        if data.len() + 3 > u16::MAX as usize {
            return Err(PrinterError::invalid("QR data too long"));
        }

        let mut cmd = EncodedCommand::single(qr_model(), QR_STEP_SETTLE);
        cmd.push(qr_module_size(size), QR_STEP_SETTLE);
        cmd.push(qr_error_level(error_level), QR_STEP_SETTLE);
        cmd.push(qr_store(data.as_bytes()), QR_STEP_SETTLE);
        cmd.push(qr_print(), QR_STEP_SETTLE);
        Ok(cmd)
    }

    fn image(&self, raster: &[u8], width: u32, height: u32) -> Result<EncodedCommand, PrinterError> {
        validate_raster(raster, width, height)?;
        let width_bytes = u16::try_from(raster_row_bytes(width))
            .map_err(|_| PrinterError::invalid("image too wide"))?;
        let height = u16::try_from(height).map_err(|_| PrinterError::invalid("image too tall"))?;

        let mut cmd = EncodedCommand::single(raster_header(width_bytes, height), COMMAND_SETTLE);
        cmd.push(raster, IMAGE_SETTLE);
        Ok(cmd)
    }
}

impl CommandEncoder for EscPosEncoder {
    fn dialect(&self) -> Dialect {
        Dialect::EscPos
    }

    fn handshake(&self) -> EncodedCommand {
        EncodedCommand::single(init(), COMMAND_SETTLE)
    }

    fn encode(
        &self,
        primitive: &PrintPrimitive,
        _settings: &PrinterSettings,
    ) -> Result<EncodedCommand, PrinterError> {
        match primitive {
            PrintPrimitive::Text {
                content,
                alignment,
                bold,
                underline,
            } => Ok(self.text(content, *alignment, *bold, *underline)),
            PrintPrimitive::Barcode {
                data,
                symbology,
                height,
                width,
            } => self.barcode(data, *symbology, *height, *width),
            PrintPrimitive::QrCode {
                data,
                size,
                error_level,
            } => self.qr_code(data, *size, *error_level),
            PrintPrimitive::Image {
                raster,
                width,
                height,
            } => self.image(raster, *width, *height),
            PrintPrimitive::LineBreak { count, direction } => {
                let mut cmd = EncodedCommand::new();
                if *count > 0 {
                    cmd.push(feed(*direction, *count), COMMAND_SETTLE);
                }
                Ok(cmd)
            }
            PrintPrimitive::Cut { mode } => Ok(EncodedCommand::single(cut(*mode), CUT_SETTLE)),
        }
    }
}
