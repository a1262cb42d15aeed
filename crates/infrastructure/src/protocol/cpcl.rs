//! CPCL encoder for Zebra mobile printers running in line-print/CPCL mode.
//!
//! Labels are CRLF-terminated lines: a `! 0 dpi dpi height qty` header, field lines, then
//! `FORM` and `PRINT`. Settings go through SGD (`! U1 setvar`).

use std::collections::HashMap;

use domain::device::{Dialect, LabelLanguage};
use domain::printer::{
    Alignment, BarcodeSymbology, CommandEncoder, EncodedCommand, FeedDirection, LabelEncoder,
    PrintPrimitive, PrinterSettings, PrinterStatus, raster_row_bytes, validate_darkness,
    validate_raster, validate_speed,
};
use domain::PrinterError;

use super::host_status::parse_host_status;
use super::label::{Cursor, LABEL_SETTLE, SETTING_SETTLE, hex_upper, validate_dimensions};
use super::template;

pub const CRLF: &str = "\r\n";
pub const DEFAULT_FONT: u8 = 7;
pub const QR_UNIT_RANGE: std::ops::RangeInclusive<u8> = 1..=32;
pub const BARCODE_HEIGHT_RANGE: std::ops::RangeInclusive<u16> = 1..=32_000;

/// Rewrite every line ending as CRLF. Existing CRLF pairs are kept as-is.
pub fn normalize_line_endings(text: &str) -> String {
    let unix = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(unix.len() + unix.len() / 16);
    for c in unix.chars() {
        if c == '\n' {
            out.push_str(CRLF);
        } else {
            out.push(c);
        }
    }
    out
}

fn barcode_type(symbology: BarcodeSymbology) -> &'static str {
    match symbology {
        BarcodeSymbology::Code128 => "128",
        BarcodeSymbology::Code39 => "39",
        BarcodeSymbology::Ean13 => "EAN13",
        BarcodeSymbology::Ean8 => "EAN8",
        BarcodeSymbology::UpcA => "UPCA",
        BarcodeSymbology::UpcE => "UPCE",
        BarcodeSymbology::Itf => "I2OF5",
        BarcodeSymbology::Codabar => "CODABAR",
    }
}

fn justification(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "LEFT",
        Alignment::Center => "CENTER",
        Alignment::Right => "RIGHT",
    }
}

/// `TEXT font size x y text`
pub fn text_line(text: &str, x: u32, y: u32, font: u8) -> String {
    format!("TEXT {font} 0 {x} {y} {text}")
}

#[derive(Debug, Clone, Default)]
pub struct CpclEncoder;

impl CpclEncoder {
    pub fn new() -> Self {
        Self
    }

    fn place(
        &self,
        primitive: &PrintPrimitive,
        settings: &PrinterSettings,
        cursor: &mut Cursor,
        lines: &mut Vec<String>,
    ) -> Result<(), PrinterError> {
        match primitive {
            PrintPrimitive::Text {
                content,
                alignment,
                bold,
                underline,
            } => {
                let justified = *alignment != Alignment::Left && settings.label_width.is_some();
                if justified {
                    lines.push(justification(*alignment).to_string());
                }
                if *bold {
                    lines.push("SETBOLD 1".into());
                }
                if *underline {
                    lines.push("UNDERLINE ON".into());
                }
                for line in content.split('\n') {
                    let line = line.trim_end_matches('\r');
                    let y = cursor.take_lines(1);
                    lines.push(text_line(line, cursor.x, y, DEFAULT_FONT));
                }
                if *underline {
                    lines.push("UNDERLINE OFF".into());
                }
                if *bold {
                    lines.push("SETBOLD 0".into());
                }
                if justified {
                    lines.push("LEFT".into());
                }
                Ok(())
            }
            PrintPrimitive::Barcode {
                data,
                symbology,
                height,
                width,
            } => {
                symbology.validate(data)?;
                if !BARCODE_HEIGHT_RANGE.contains(height) {
                    return Err(PrinterError::invalid(format!(
                        "barcode height {} outside 1..=32000",
                        height
                    )));
                }
                if *width == 0 {
                    return Err(PrinterError::invalid("barcode width must be positive"));
                }
                let y = cursor.take((*height as u32).saturating_add(cursor.line_height));
                lines.push(format!("BARCODE-TEXT {DEFAULT_FONT} 0 5"));
                lines.push(format!(
                    "BARCODE {} {} 1 {} {} {} {}",
                    barcode_type(*symbology),
                    width,
                    height,
                    cursor.x,
                    y,
                    data
                ));
                lines.push("BARCODE-TEXT OFF".into());
                Ok(())
            }
            PrintPrimitive::QrCode {
                data,
                size,
                error_level,
            } => {
                if data.is_empty() {
                    return Err(PrinterError::invalid("QR data is empty"));
                }
                if !QR_UNIT_RANGE.contains(size) {
                    return Err(PrinterError::invalid(format!(
                        "QR unit width {} outside 1..=32",
                        size
                    )));
                }
                let y = cursor.take(Cursor::qr_height(*size));
                lines.push(format!("B QR {} {} M 2 U {}", cursor.x, y, size));
                lines.push(format!("{}A,{}", error_level.letter(), data));
                lines.push("ENDQR".into());
                Ok(())
            }
            PrintPrimitive::Image {
                raster,
                width,
                height,
            } => {
                validate_raster(raster, *width, *height)?;
                let y = cursor.take(*height);
                lines.push(format!(
                    "EG {} {} {} {} {}",
                    raster_row_bytes(*width),
                    height,
                    cursor.x,
                    y,
                    hex_upper(raster)
                ));
                Ok(())
            }
            PrintPrimitive::LineBreak { count, direction } => match direction {
                FeedDirection::Forward => {
                    cursor.take_lines(*count as u32);
                    Ok(())
                }
                FeedDirection::Backward => Err(PrinterError::unsupported(
                    "backward feed is not available on label printers",
                )),
            },
            PrintPrimitive::Cut { .. } => Err(PrinterError::unsupported(
                "cut is not available on Zebra label printers",
            )),
        }
    }

    fn page(&self, lines: &[String], height: u32, settings: &PrinterSettings) -> String {
        let mut page = format!(
            "! 0 {dpi} {dpi} {height} {copies}{CRLF}",
            dpi = settings.dpi,
            copies = settings.copies.max(1)
        );
        if let Some(width) = settings.label_width {
            page.push_str(&format!("PAGE-WIDTH {width}{CRLF}"));
        }
        for line in lines {
            page.push_str(&normalize_line_endings(line));
            page.push_str(CRLF);
        }
        page.push_str("FORM");
        page.push_str(CRLF);
        page.push_str("PRINT");
        page.push_str(CRLF);
        page
    }

    fn label(
        &self,
        primitives: &[PrintPrimitive],
        settings: &PrinterSettings,
    ) -> Result<EncodedCommand, PrinterError> {
        let mut cursor = Cursor::new(settings);
        let mut lines = Vec::new();
        for primitive in primitives {
            self.place(primitive, settings, &mut cursor, &mut lines)?;
        }
        if lines.is_empty() {
            return Ok(EncodedCommand::new());
        }
        let height = settings
            .label_length
            .unwrap_or(cursor.y.saturating_add(settings.origin_y));
        Ok(EncodedCommand::single(
            self.page(&lines, height, settings),
            LABEL_SETTLE,
        ))
    }

    fn sgd_set(&self, name: &str, value: impl std::fmt::Display) -> String {
        format!("! U1 setvar \"{name}\" \"{value}\"{CRLF}")
    }
}

impl CommandEncoder for CpclEncoder {
    fn dialect(&self) -> Dialect {
        Dialect::Zebra
    }

    fn handshake(&self) -> EncodedCommand {
        self.status_query()
    }

    fn encode(
        &self,
        primitive: &PrintPrimitive,
        settings: &PrinterSettings,
    ) -> Result<EncodedCommand, PrinterError> {
        self.label(std::slice::from_ref(primitive), settings)
    }

    fn encode_batch(
        &self,
        primitives: &[PrintPrimitive],
        settings: &PrinterSettings,
    ) -> Result<EncodedCommand, PrinterError> {
        self.label(primitives, settings)
    }

    fn as_label(&self) -> Option<&dyn LabelEncoder> {
        Some(self)
    }
}

impl LabelEncoder for CpclEncoder {
    fn language(&self) -> LabelLanguage {
        LabelLanguage::Cpcl
    }

    fn raw_label(&self, text: &str) -> Result<EncodedCommand, PrinterError> {
        if text.trim().is_empty() {
            return Err(PrinterError::invalid("label is empty"));
        }
        let mut label = normalize_line_endings(text);
        if !label.ends_with(CRLF) {
            label.push_str(CRLF);
        }
        Ok(EncodedCommand::single(label, LABEL_SETTLE))
    }

    fn template_label(
        &self,
        template: &str,
        substitutions: &HashMap<String, String>,
    ) -> Result<EncodedCommand, PrinterError> {
        let rendered = template::render(template, substitutions)?;
        self.raw_label(&rendered)
    }

    fn darkness(&self, value: i32) -> Result<EncodedCommand, PrinterError> {
        let value = validate_darkness(value)?;
        Ok(EncodedCommand::single(
            self.sgd_set("print.tone", value),
            SETTING_SETTLE,
        ))
    }

    fn speed(&self, value: i32) -> Result<EncodedCommand, PrinterError> {
        let value = validate_speed(value)?;
        Ok(EncodedCommand::single(
            self.sgd_set("media.speed", value),
            SETTING_SETTLE,
        ))
    }

    fn label_dimensions(&self, width: u32, length: u32) -> Result<EncodedCommand, PrinterError> {
        validate_dimensions(width, length)?;
        let mut cmd = EncodedCommand::single(
            self.sgd_set("ezpl.print_width", width),
            SETTING_SETTLE,
        );
        cmd.push(self.sgd_set("zpl.label_length", length), SETTING_SETTLE);
        Ok(cmd)
    }

    fn calibrate(&self) -> EncodedCommand {
        // Empty page; FORM feeds to the next gap so the sensor re-learns the label.
        EncodedCommand::single(
            format!("! 0 200 200 0 1{CRLF}FORM{CRLF}PRINT{CRLF}"),
            LABEL_SETTLE,
        )
    }

    fn test_label(&self, settings: &PrinterSettings) -> EncodedCommand {
        let mut cursor = Cursor::new(settings);
        let x = cursor.x;
        let mut lines = vec![text_line("TEST LABEL", x, cursor.take(50), 4)];
        lines.push(text_line(
            &format!("{} dpi", settings.dpi),
            x,
            cursor.take(35),
            DEFAULT_FONT,
        ));
        let y = cursor.take(60);
        lines.push(format!("BARCODE 128 2 1 60 {x} {y} 1234567890"));
        let height = settings
            .label_length
            .unwrap_or(cursor.y.saturating_add(settings.origin_y));
        EncodedCommand::single(self.page(&lines, height, settings), LABEL_SETTLE)
    }

    fn status_query(&self) -> EncodedCommand {
        EncodedCommand::single(
            format!("! U1 getvar \"device.host_status\"{CRLF}"),
            SETTING_SETTLE,
        )
    }

    /// `device.host_status` answers with the `~HS` frames, quoted.
    fn parse_status(&self, reply: &[u8]) -> Result<PrinterStatus, PrinterError> {
        let unquoted: Vec<u8> = reply.iter().copied().filter(|&b| b != b'"').collect();
        parse_host_status(&unquoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::printer::{QrErrorLevel, TextFormat};

    fn label_text(cmd: &EncodedCommand) -> String {
        String::from_utf8(cmd.to_bytes()).unwrap()
    }

    fn no_bare_lf(text: &str) -> bool {
        let bytes = text.as_bytes();
        bytes
            .iter()
            .enumerate()
            .all(|(i, &b)| b != b'\n' || (i > 0 && bytes[i - 1] == b'\r'))
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("line1\nline2"), "line1\r\nline2");
        assert_eq!(normalize_line_endings("a\r\nb\nc"), "a\r\nb\r\nc");
        assert_eq!(normalize_line_endings("plain"), "plain");
    }

    #[test]
    fn test_raw_label_crlf() {
        let cmd = CpclEncoder::new()
            .raw_label("! 0 200 200 210 1\nTEXT 4 0 30 40 Hello\nFORM\nPRINT")
            .unwrap();
        let text = label_text(&cmd);
        assert!(no_bare_lf(&text));
        assert!(text.ends_with("PRINT\r\n"));
        assert!(text.contains("! 0 200 200 210 1\r\nTEXT 4 0 30 40 Hello\r\n"));
    }

    #[test]
    fn test_text_label_layout() {
        let cmd = CpclEncoder::new()
            .encode(
                &PrintPrimitive::text("line1\nline2", TextFormat::default()),
                &PrinterSettings::default(),
            )
            .unwrap();
        let text = label_text(&cmd);
        assert_eq!(
            text,
            "! 0 203 203 100 1\r\n\
             TEXT 7 0 20 20 line1\r\n\
             TEXT 7 0 20 50 line2\r\n\
             FORM\r\nPRINT\r\n"
        );
        assert!(no_bare_lf(&text));
    }

    #[test]
    fn test_formatting_and_justification() {
        let settings = PrinterSettings {
            label_width: Some(576),
            ..PrinterSettings::default()
        };
        let format = TextFormat::aligned(Alignment::Center).bold().underline();
        let text = label_text(
            &CpclEncoder::new()
                .encode(&PrintPrimitive::text("Hi", format), &settings)
                .unwrap(),
        );
        let body: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(body[1], "PAGE-WIDTH 576");
        assert_eq!(
            &body[2..8],
            &[
                "CENTER",
                "SETBOLD 1",
                "UNDERLINE ON",
                "TEXT 7 0 20 20 Hi",
                "UNDERLINE OFF",
                "SETBOLD 0"
            ]
        );
        assert_eq!(body[8], "LEFT");
    }

    #[test]
    fn test_barcode_and_qr_lines() {
        let encoder = CpclEncoder::new();
        let batch = vec![
            PrintPrimitive::barcode("590123412345", BarcodeSymbology::Ean13),
            PrintPrimitive::qr_code("https://example.com", 4, QrErrorLevel::M),
        ];
        let text = label_text(
            &encoder
                .encode_batch(&batch, &PrinterSettings::default())
                .unwrap(),
        );
        assert!(text.contains("BARCODE EAN13 2 1 80 20 20 590123412345\r\n"));
        assert!(text.contains("B QR 20 130 M 2 U 4\r\nMA,https://example.com\r\nENDQR\r\n"));
        assert_eq!(text.matches("FORM").count(), 1);
    }

    #[test]
    fn test_invalid_barcode_rejected() {
        let result = CpclEncoder::new().encode(
            &PrintPrimitive::barcode("12", BarcodeSymbology::UpcA),
            &PrinterSettings::default(),
        );
        assert!(matches!(result, Err(PrinterError::InvalidArgument(_))));
    }

    #[test]
    fn test_sgd_settings() {
        let encoder = CpclEncoder::new();
        assert_eq!(
            label_text(&encoder.darkness(12).unwrap()),
            "! U1 setvar \"print.tone\" \"12\"\r\n"
        );
        assert_eq!(
            label_text(&encoder.speed(3).unwrap()),
            "! U1 setvar \"media.speed\" \"3\"\r\n"
        );
        assert!(encoder.darkness(31).is_err());
        assert!(encoder.speed(0).is_err());
        assert_eq!(encoder.label_dimensions(576, 400).unwrap().len(), 2);
    }

    #[test]
    fn test_status_reply_is_unquoted() {
        let reply = b"\"\x02030,1,0,1245,000,0,0,0,000,0,0,0\x03\r\n\
\x02000,0,0,0,0,2,4,0,00000000,1,000\x03\r\n\
\x021234,0\x03\"";
        let status = CpclEncoder::new().parse_status(reply).unwrap();
        assert!(status.paper_out);
    }

    #[test]
    fn test_test_label_is_a_page() {
        let text = label_text(&CpclEncoder::new().test_label(&PrinterSettings::default()));
        assert!(text.starts_with("! 0 203 203"));
        assert!(text.ends_with("FORM\r\nPRINT\r\n"));
        assert!(no_bare_lf(&text));
    }
}
