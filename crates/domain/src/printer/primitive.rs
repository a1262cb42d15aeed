use serde::{Deserialize, Serialize};

use crate::error::PrinterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarcodeSymbology {
    Code128,
    Code39,
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Itf,
    Codabar,
}

const CODE39_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ -.$/+%*";
const CODABAR_CHARSET: &str = "0123456789-$:/.+ABCDabcd";

impl BarcodeSymbology {
    /// Number of digits the caller supplies for fixed-length symbologies.
    /// The check digit is computed by the printer.
    pub fn fixed_length(&self) -> Option<usize> {
        match self {
            Self::Ean13 => Some(12),
            Self::Ean8 => Some(7),
            Self::UpcA | Self::UpcE => Some(11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code128 => "CODE128",
            Self::Code39 => "CODE39",
            Self::Ean13 => "EAN13",
            Self::Ean8 => "EAN8",
            Self::UpcA => "UPCA",
            Self::UpcE => "UPCE",
            Self::Itf => "ITF",
            Self::Codabar => "CODABAR",
        }
    }

    /// Check `data` against the symbology's length and character rules.
    pub fn validate(&self, data: &str) -> Result<(), PrinterError> {
        if data.is_empty() {
            return Err(PrinterError::invalid(format!(
                "{} barcode data is empty",
                self.as_str()
            )));
        }
        if data.contains('\0') {
            return Err(PrinterError::invalid("barcode data contains NUL"));
        }

        if let Some(len) = self.fixed_length() {
            if data.len() != len || !data.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PrinterError::invalid(format!(
                    "{} requires exactly {} digits, got {:?}",
                    self.as_str(),
                    len,
                    data
                )));
            }
            return Ok(());
        }

        match self {
            Self::Itf if data.len() % 2 != 0 || !data.bytes().all(|b| b.is_ascii_digit()) => {
                Err(PrinterError::invalid(format!(
                    "ITF requires an even number of digits, got {:?}",
                    data
                )))
            }
            Self::Code39 if !data.chars().all(|c| CODE39_CHARSET.contains(c)) => Err(
                PrinterError::invalid(format!("invalid CODE39 data {:?}", data)),
            ),
            Self::Codabar if !data.chars().all(|c| CODABAR_CHARSET.contains(c)) => Err(
                PrinterError::invalid(format!("invalid CODABAR data {:?}", data)),
            ),
            Self::Code128 if !data.is_ascii() => Err(PrinterError::invalid(
                "CODE128 data must be ASCII",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QrErrorLevel {
    L,
    #[default]
    M,
    Q,
    H,
}

impl QrErrorLevel {
    /// 0..=3, the ordinal ESC/POS adds to 48
    pub fn level(&self) -> u8 {
        match self {
            Self::L => 0,
            Self::M => 1,
            Self::Q => 2,
            Self::H => 3,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::L => 'L',
            Self::M => 'M',
            Self::Q => 'Q',
            Self::H => 'H',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CutMode {
    Partial,
    #[default]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FeedDirection {
    #[default]
    Forward,
    Backward,
}

/// Text styling shared by `print_text` and `PrintPrimitive::Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TextFormat {
    pub alignment: Alignment,
    pub bold: bool,
    pub underline: bool,
}

impl TextFormat {
    pub fn aligned(alignment: Alignment) -> Self {
        Self {
            alignment,
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }
}

/// One high-level print request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PrintPrimitive {
    Text {
        content: String,
        #[serde(default)]
        alignment: Alignment,
        #[serde(default)]
        bold: bool,
        #[serde(default)]
        underline: bool,
    },
    Barcode {
        data: String,
        symbology: BarcodeSymbology,
        height: u16,
        width: u8,
    },
    QrCode {
        data: String,
        size: u8,
        #[serde(default)]
        error_level: QrErrorLevel,
    },
    /// Pre-rasterised 1-bit image, rows packed MSB first, `ceil(width / 8)` bytes per row
    Image {
        raster: Vec<u8>,
        width: u32,
        height: u32,
    },
    LineBreak {
        count: u8,
        #[serde(default)]
        direction: FeedDirection,
    },
    Cut {
        #[serde(default)]
        mode: CutMode,
    },
}

pub const DEFAULT_BARCODE_HEIGHT: u16 = 80;
pub const DEFAULT_BARCODE_WIDTH: u8 = 2;
pub const DEFAULT_QR_SIZE: u8 = 6;

impl PrintPrimitive {
    pub fn text(content: impl Into<String>, format: TextFormat) -> Self {
        Self::Text {
            content: content.into(),
            alignment: format.alignment,
            bold: format.bold,
            underline: format.underline,
        }
    }

    pub fn barcode(data: impl Into<String>, symbology: BarcodeSymbology) -> Self {
        Self::Barcode {
            data: data.into(),
            symbology,
            height: DEFAULT_BARCODE_HEIGHT,
            width: DEFAULT_BARCODE_WIDTH,
        }
    }

    pub fn qr_code(data: impl Into<String>, size: u8, error_level: QrErrorLevel) -> Self {
        Self::QrCode {
            data: data.into(),
            size,
            error_level,
        }
    }

    pub fn image(raster: Vec<u8>, width: u32, height: u32) -> Self {
        Self::Image {
            raster,
            width,
            height,
        }
    }

    pub fn line_break(count: u8) -> Self {
        Self::LineBreak {
            count,
            direction: FeedDirection::Forward,
        }
    }

    pub fn cut(mode: CutMode) -> Self {
        Self::Cut { mode }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Barcode { .. } => "barcode",
            Self::QrCode { .. } => "qr_code",
            Self::Image { .. } => "image",
            Self::LineBreak { .. } => "line_break",
            Self::Cut { .. } => "cut",
        }
    }
}

/// Bytes per raster row for a 1-bit image `width` dots wide.
pub fn raster_row_bytes(width: u32) -> u32 {
    width.div_ceil(8)
}

/// Check that a raster payload matches its declared dimensions.
pub fn validate_raster(raster: &[u8], width: u32, height: u32) -> Result<(), PrinterError> {
    if width == 0 || height == 0 {
        return Err(PrinterError::invalid("image dimensions must be non-zero"));
    }
    let expected = raster_row_bytes(width) as usize * height as usize;
    if raster.len() != expected {
        return Err(PrinterError::invalid(format!(
            "raster is {} bytes, {}x{} needs {}",
            raster.len(),
            width,
            height,
            expected
        )));
    }
    Ok(())
}
