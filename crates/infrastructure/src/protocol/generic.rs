//! Plain passthrough for printers that take raw text (line printers, unknown devices).

use std::time::Duration;

use domain::device::Dialect;
use domain::printer::{
    CommandEncoder, EncodedCommand, FeedDirection, PrintPrimitive, PrinterSettings,
    validate_raster,
};
use domain::PrinterError;

pub const LF: u8 = 0x0A;
pub const FF: u8 = 0x0C;

pub const WRITE_SETTLE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default)]
pub struct GenericEncoder;

impl GenericEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl CommandEncoder for GenericEncoder {
    fn dialect(&self) -> Dialect {
        Dialect::Generic
    }

    fn handshake(&self) -> EncodedCommand {
        EncodedCommand::new()
    }

    fn encode(
        &self,
        primitive: &PrintPrimitive,
        _settings: &PrinterSettings,
    ) -> Result<EncodedCommand, PrinterError> {
        match primitive {
            PrintPrimitive::Text { content, .. } => {
                let mut bytes = content.as_bytes().to_vec();
                bytes.push(LF);
                Ok(EncodedCommand::single(bytes, WRITE_SETTLE))
            }
            PrintPrimitive::LineBreak { count, direction } => match direction {
                FeedDirection::Forward => Ok(EncodedCommand::single(
                    vec![LF; *count as usize],
                    WRITE_SETTLE,
                )),
                FeedDirection::Backward => Err(PrinterError::unsupported(
                    "backward feed needs a printer dialect",
                )),
            },
            PrintPrimitive::Image {
                raster,
                width,
                height,
            } => {
                validate_raster(raster, *width, *height)?;
                Ok(EncodedCommand::single(raster.clone(), WRITE_SETTLE))
            }
            PrintPrimitive::Cut { .. } => Ok(EncodedCommand::single(vec![FF], WRITE_SETTLE)),
            PrintPrimitive::Barcode { .. } | PrintPrimitive::QrCode { .. } => {
                Err(PrinterError::unsupported(format!(
                    "{} needs a printer dialect",
                    primitive.kind()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::printer::{BarcodeSymbology, CutMode, QrErrorLevel, TextFormat};

    fn encode(primitive: PrintPrimitive) -> Result<EncodedCommand, PrinterError> {
        GenericEncoder::new().encode(&primitive, &PrinterSettings::default())
    }

    #[test]
    fn test_text_is_utf8_plus_newline() {
        let cmd = encode(PrintPrimitive::text("Grüße", TextFormat::default())).unwrap();
        let mut expected = "Grüße".as_bytes().to_vec();
        expected.push(LF);
        assert_eq!(cmd.to_bytes(), expected);
    }

    #[test]
    fn test_feed_and_cut() {
        assert_eq!(encode(PrintPrimitive::line_break(3)).unwrap().to_bytes(), vec![LF; 3]);
        assert!(encode(PrintPrimitive::line_break(0)).unwrap().is_empty());
        assert_eq!(
            encode(PrintPrimitive::cut(CutMode::Partial)).unwrap().to_bytes(),
            vec![FF]
        );
    }

    #[test]
    fn test_symbols_are_unsupported() {
        let barcode = encode(PrintPrimitive::barcode("ABC", BarcodeSymbology::Code128));
        assert!(matches!(barcode, Err(PrinterError::UnsupportedOperation(_))));
        let qr = encode(PrintPrimitive::qr_code("x", 4, QrErrorLevel::L));
        assert!(matches!(qr, Err(PrinterError::UnsupportedOperation(_))));
    }

    #[test]
    fn test_no_handshake() {
        assert!(GenericEncoder::new().handshake().is_empty());
    }
}
