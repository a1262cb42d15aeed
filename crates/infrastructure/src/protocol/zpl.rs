//! ZPL encoder for Zebra label printers.
//!
//! Print primitives become fields of a `^XA ... ^XZ` label. A batch is laid out top to bottom
//! on a single label; settings (`~SD`, `^PR`, `^PW`, `^LL`) travel as standalone commands.

use std::collections::HashMap;

use domain::device::{Dialect, LabelLanguage};
use domain::printer::{
    Alignment, BarcodeSymbology, CommandEncoder, EncodedCommand, FeedDirection, LabelEncoder,
    PrintPrimitive, PrinterSettings, PrinterStatus, QrErrorLevel, raster_row_bytes,
    validate_darkness, validate_raster, validate_speed,
};
use domain::PrinterError;

use super::host_status::parse_host_status;
use super::label::{Cursor, LABEL_SETTLE, SETTING_SETTLE, hex_upper, validate_dimensions};
use super::template;

pub const DEFAULT_FONT: &str = "0";
pub const QR_MAGNIFICATION_RANGE: std::ops::RangeInclusive<u8> = 1..=10;
pub const MODULE_WIDTH_RANGE: std::ops::RangeInclusive<u8> = 1..=10;
pub const BARCODE_HEIGHT_RANGE: std::ops::RangeInclusive<u16> = 1..=32_000;

/// `^FD` with its payload, switching to `^FH` hex escapes when the text holds
/// ZPL control characters.
fn field_data(prefix: &str, text: &str) -> String {
    if !text.contains(['^', '~', '_']) {
        return format!("^FD{prefix}{text}");
    }
    let mut out = format!("^FH_^FD{prefix}");
    for c in text.chars() {
        match c {
            '^' => out.push_str("_5E"),
            '~' => out.push_str("_7E"),
            '_' => out.push_str("_5F"),
            c => out.push(c),
        }
    }
    out
}

/// `^FOx,y^A{font}N,h,w^FD...^FS`
pub fn text_field(text: &str, x: u32, y: u32, font: &str, size: u32) -> String {
    format!(
        "^FO{x},{y}^A{font}N,{size},{size}{}^FS",
        field_data("", text)
    )
}

/// Text in a field block, justified inside `block_width` dots
pub fn text_block(
    text: &str,
    x: u32,
    y: u32,
    font: &str,
    size: u32,
    block_width: u32,
    alignment: Alignment,
) -> String {
    let justify = match alignment {
        Alignment::Left => 'L',
        Alignment::Center => 'C',
        Alignment::Right => 'R',
    };
    format!(
        "^FO{x},{y}^A{font}N,{size},{size}^FB{block_width},1,0,{justify},0{}^FS",
        field_data("", text)
    )
}

fn barcode_command(symbology: BarcodeSymbology, height: u16) -> String {
    match symbology {
        BarcodeSymbology::Code128 => format!("^BCN,{height},Y,N,N"),
        BarcodeSymbology::Code39 => format!("^B3N,N,{height},Y,N"),
        BarcodeSymbology::Ean13 => format!("^BEN,{height},Y,N"),
        BarcodeSymbology::Ean8 => format!("^B8N,{height},Y,N"),
        BarcodeSymbology::UpcA => format!("^BUN,{height},Y,N,Y"),
        BarcodeSymbology::UpcE => format!("^B9N,{height},Y,N,Y"),
        BarcodeSymbology::Itf => format!("^B2N,{height},Y,N,N"),
        BarcodeSymbology::Codabar => format!("^BKN,N,{height},Y,N"),
    }
}

/// `^FOx,y^BY{w}^B..^FD{data}^FS`
pub fn barcode_field(
    symbology: BarcodeSymbology,
    data: &str,
    x: u32,
    y: u32,
    height: u16,
    width: u8,
) -> String {
    format!(
        "^FO{x},{y}^BY{width}{}{}^FS",
        barcode_command(symbology, height),
        field_data("", data)
    )
}

/// `^FOx,y^BQN,2,{size}^FD{level}A,{data}^FS`
pub fn qr_field(data: &str, x: u32, y: u32, size: u8, level: QrErrorLevel) -> String {
    let prefix = format!("{}A,", level.letter());
    format!(
        "^FO{x},{y}^BQN,2,{size}{}^FS",
        field_data(&prefix, data)
    )
}

/// `^GFA` graphic field from a 1-bpp raster
pub fn graphic_field(raster: &[u8], width: u32, x: u32, y: u32) -> String {
    let total = raster.len();
    let row = raster_row_bytes(width);
    format!(
        "^FO{x},{y}^GFA,{total},{total},{row},{}^FS",
        hex_upper(raster)
    )
}

fn wrap_label(body: &str, settings: &PrinterSettings) -> String {
    if settings.copies > 1 {
        format!("^XA{body}^PQ{}^XZ", settings.copies)
    } else {
        format!("^XA{body}^XZ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ZplEncoder;

impl ZplEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Append the fields for one primitive to `body`, advancing the cursor.
    fn place(
        &self,
        primitive: &PrintPrimitive,
        settings: &PrinterSettings,
        cursor: &mut Cursor,
        body: &mut String,
    ) -> Result<(), PrinterError> {
        match primitive {
            PrintPrimitive::Text {
                content, alignment, ..
            } => {
                let size = cursor.line_height;
                for line in content.split('\n') {
                    let line = line.trim_end_matches('\r');
                    let y = cursor.take_lines(1);
                    let field = match (alignment, settings.label_width) {
                        (Alignment::Left, _) | (_, None) => {
                            text_field(line, cursor.x, y, DEFAULT_FONT, size)
                        }
                        (alignment, Some(label_width)) => {
                            let block = label_width
                                .saturating_sub(cursor.x.saturating_mul(2))
                                .max(1);
                            text_block(line, cursor.x, y, DEFAULT_FONT, size, block, *alignment)
                        }
                    };
                    body.push_str(&field);
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
                if !MODULE_WIDTH_RANGE.contains(width) {
                    return Err(PrinterError::invalid(format!(
                        "barcode module width {} outside 1..=10",
                        width
                    )));
                }
                // HRI line below the bars
                let y = cursor.take((*height as u32).saturating_add(cursor.line_height));
                body.push_str(&barcode_field(*symbology, data, cursor.x, y, *height, *width));
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
                if !QR_MAGNIFICATION_RANGE.contains(size) {
                    return Err(PrinterError::invalid(format!(
                        "QR magnification {} outside 1..=10",
                        size
                    )));
                }
                let y = cursor.take(Cursor::qr_height(*size));
                body.push_str(&qr_field(data, cursor.x, y, *size, *error_level));
                Ok(())
            }
            PrintPrimitive::Image {
                raster,
                width,
                height,
            } => {
                validate_raster(raster, *width, *height)?;
                let y = cursor.take(*height);
                body.push_str(&graphic_field(raster, *width, cursor.x, y));
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

    fn label(
        &self,
        primitives: &[PrintPrimitive],
        settings: &PrinterSettings,
    ) -> Result<EncodedCommand, PrinterError> {
        let mut cursor = Cursor::new(settings);
        let mut body = String::new();
        for primitive in primitives {
            self.place(primitive, settings, &mut cursor, &mut body)?;
        }
        if body.is_empty() {
            return Ok(EncodedCommand::new());
        }
        Ok(EncodedCommand::single(
            wrap_label(&body, settings),
            LABEL_SETTLE,
        ))
    }
}

impl CommandEncoder for ZplEncoder {
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

impl LabelEncoder for ZplEncoder {
    fn language(&self) -> LabelLanguage {
        LabelLanguage::Zpl
    }

    fn raw_label(&self, text: &str) -> Result<EncodedCommand, PrinterError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PrinterError::invalid("label is empty"));
        }
        let label = if text.contains("^XA") {
            text.to_string()
        } else {
            format!("^XA{text}^XZ")
        };
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
        Ok(EncodedCommand::single(format!("~SD{:02}", value), SETTING_SETTLE))
    }

    fn speed(&self, value: i32) -> Result<EncodedCommand, PrinterError> {
        let value = validate_speed(value)?;
        Ok(EncodedCommand::single(format!("^PR{}", value), SETTING_SETTLE))
    }

    fn label_dimensions(&self, width: u32, length: u32) -> Result<EncodedCommand, PrinterError> {
        validate_dimensions(width, length)?;
        let mut cmd = EncodedCommand::single(format!("^PW{}", width), SETTING_SETTLE);
        cmd.push(format!("^LL{}", length), SETTING_SETTLE);
        Ok(cmd)
    }

    fn calibrate(&self) -> EncodedCommand {
        EncodedCommand::single("~JC", LABEL_SETTLE)
    }

    fn test_label(&self, settings: &PrinterSettings) -> EncodedCommand {
        let mut cursor = Cursor::new(settings);
        let x = cursor.x;
        let mut body = text_field("TEST LABEL", x, cursor.take(50), DEFAULT_FONT, 40);
        body.push_str(&text_field(
            &format!("{} dpi", settings.dpi),
            x,
            cursor.take(35),
            DEFAULT_FONT,
            25,
        ));
        let darkness = settings
            .darkness
            .map(|d| d.to_string())
            .unwrap_or_else(|| "default".into());
        let speed = settings
            .speed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "default".into());
        body.push_str(&text_field(
            &format!("Darkness {darkness} Speed {speed}"),
            x,
            cursor.take(45),
            DEFAULT_FONT,
            25,
        ));
        body.push_str(&barcode_field(
            BarcodeSymbology::Code128,
            "1234567890",
            x,
            cursor.y,
            60,
            2,
        ));
        EncodedCommand::single(format!("^XA{body}^XZ"), LABEL_SETTLE)
    }

    fn status_query(&self) -> EncodedCommand {
        EncodedCommand::single("~HS", SETTING_SETTLE)
    }

    fn parse_status(&self, reply: &[u8]) -> Result<PrinterStatus, PrinterError> {
        parse_host_status(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::printer::{CutMode, TextFormat};

    fn label_text(cmd: &EncodedCommand) -> String {
        String::from_utf8(cmd.to_bytes()).unwrap()
    }

    fn settings() -> PrinterSettings {
        PrinterSettings::default()
    }

    #[test]
    fn test_text_field_layout() {
        assert_eq!(
            text_field("Hi", 10, 20, "0", 10),
            "^FO10,20^A0N,10,10^FDHi^FS"
        );
    }

    #[test]
    fn test_control_characters_are_hex_escaped() {
        assert_eq!(
            text_field("a^b~c_d", 0, 0, "0", 10),
            "^FO0,0^A0N,10,10^FH_^FDa_5Eb_7Ec_5Fd^FS"
        );
    }

    #[test]
    fn test_single_text_is_enveloped() {
        let cmd = ZplEncoder::new()
            .encode(&PrintPrimitive::text("Hello", TextFormat::default()), &settings())
            .unwrap();
        assert_eq!(cmd.len(), 1);
        assert_eq!(label_text(&cmd), "^XA^FO20,20^A0N,30,30^FDHello^FS^XZ");
    }

    #[test]
    fn test_multiline_text_is_stacked() {
        let cmd = ZplEncoder::new()
            .encode(&PrintPrimitive::text("a\nb", TextFormat::default()), &settings())
            .unwrap();
        let text = label_text(&cmd);
        assert!(text.contains("^FO20,20^A0N,30,30^FDa^FS"));
        assert!(text.contains("^FO20,50^A0N,30,30^FDb^FS"));
    }

    #[test]
    fn test_centered_text_uses_field_block() {
        let settings = PrinterSettings {
            label_width: Some(400),
            ..PrinterSettings::default()
        };
        let cmd = ZplEncoder::new()
            .encode(
                &PrintPrimitive::text("Hi", TextFormat::aligned(Alignment::Center)),
                &settings,
            )
            .unwrap();
        assert!(label_text(&cmd).contains("^FB360,1,0,C,0^FDHi^FS"));
    }

    #[test]
    fn test_barcode_field() {
        assert_eq!(
            barcode_field(BarcodeSymbology::Code128, "ABC", 10, 20, 80, 2),
            "^FO10,20^BY2^BCN,80,Y,N,N^FDABC^FS"
        );
        assert!(barcode_field(BarcodeSymbology::Ean13, "590123412345", 0, 0, 80, 2)
            .contains("^BEN,80,Y,N"));
    }

    #[test]
    fn test_barcode_validation_happens_before_output() {
        let result = ZplEncoder::new().encode(
            &PrintPrimitive::barcode("12345", BarcodeSymbology::Ean13),
            &settings(),
        );
        assert!(matches!(result, Err(PrinterError::InvalidArgument(_))));
    }

    #[test]
    fn test_qr_field() {
        assert_eq!(
            qr_field("hello", 5, 6, 4, QrErrorLevel::Q),
            "^FO5,6^BQN,2,4^FDQA,hello^FS"
        );
        let too_big = ZplEncoder::new().encode(
            &PrintPrimitive::qr_code("x", 11, QrErrorLevel::M),
            &settings(),
        );
        assert!(too_big.is_err());
    }

    #[test]
    fn test_graphic_field() {
        let field = graphic_field(&[0xFF, 0x00, 0x0F, 0xF0], 16, 0, 0);
        assert_eq!(field, "^FO0,0^GFA,4,4,2,FF000FF0^FS");
    }

    #[test]
    fn test_batch_is_one_label() {
        let encoder = ZplEncoder::new();
        let batch = vec![
            PrintPrimitive::text("Title", TextFormat::default()),
            PrintPrimitive::line_break(1),
            PrintPrimitive::barcode("ABC-1", BarcodeSymbology::Code128),
        ];
        let cmd = encoder.encode_batch(&batch, &settings()).unwrap();
        let text = label_text(&cmd);
        assert_eq!(cmd.len(), 1);
        assert_eq!(text.matches("^XA").count(), 1);
        assert!(text.contains("^FO20,20^A0N,30,30^FDTitle^FS"));
        assert!(text.contains("^FO20,80^BY2^BCN,80,Y,N,N^FDABC-1^FS"));
    }

    #[test]
    fn test_line_break_alone_sends_nothing() {
        let cmd = ZplEncoder::new()
            .encode(&PrintPrimitive::line_break(2), &settings())
            .unwrap();
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_cut_is_unsupported() {
        let result = ZplEncoder::new().encode(&PrintPrimitive::cut(CutMode::Full), &settings());
        assert!(matches!(result, Err(PrinterError::UnsupportedOperation(_))));
    }

    #[test]
    fn test_copies_add_print_quantity() {
        let settings = PrinterSettings {
            copies: 3,
            ..PrinterSettings::default()
        };
        let cmd = ZplEncoder::new()
            .encode(&PrintPrimitive::text("x", TextFormat::default()), &settings)
            .unwrap();
        assert!(label_text(&cmd).ends_with("^PQ3^XZ"));
    }

    #[test]
    fn test_settings_commands() {
        let encoder = ZplEncoder::new();
        assert_eq!(label_text(&encoder.darkness(5).unwrap()), "~SD05");
        assert_eq!(label_text(&encoder.darkness(30).unwrap()), "~SD30");
        assert!(encoder.darkness(-1).is_err());
        assert!(encoder.darkness(31).is_err());
        assert_eq!(label_text(&encoder.speed(4).unwrap()), "^PR4");
        assert!(encoder.speed(0).is_err());
        assert!(encoder.speed(15).is_err());

        let dims = encoder.label_dimensions(812, 1218).unwrap();
        assert_eq!(dims.len(), 2);
        assert_eq!(dims.chunks()[0].bytes, b"^PW812".to_vec());
        assert_eq!(dims.chunks()[1].bytes, b"^LL1218".to_vec());
    }

    #[test]
    fn test_raw_label_is_wrapped_when_needed() {
        let encoder = ZplEncoder::new();
        assert_eq!(
            label_text(&encoder.raw_label("^FO0,0^FDx^FS").unwrap()),
            "^XA^FO0,0^FDx^FS^XZ"
        );
        assert_eq!(
            label_text(&encoder.raw_label("^XA^FDx^FS^XZ").unwrap()),
            "^XA^FDx^FS^XZ"
        );
        assert!(encoder.raw_label("   ").is_err());
    }

    #[test]
    fn test_template_label() {
        let mut subs = HashMap::new();
        subs.insert("sku".to_string(), "A-1".to_string());
        let cmd = ZplEncoder::new()
            .template_label("^XA^FO0,0^FD{sku}^FS^XZ", &subs)
            .unwrap();
        assert_eq!(label_text(&cmd), "^XA^FO0,0^FDA-1^FS^XZ");
    }

    #[test]
    fn test_test_label_is_enveloped() {
        let text = label_text(&ZplEncoder::new().test_label(&settings()));
        assert!(text.starts_with("^XA"));
        assert!(text.ends_with("^XZ"));
        assert!(text.contains("TEST LABEL"));
    }

    #[test]
    fn test_handshake_queries_status() {
        let encoder = ZplEncoder::new();
        assert_eq!(label_text(&encoder.handshake()), "~HS");
        assert_eq!(encoder.handshake(), encoder.status_query());
        assert_eq!(label_text(&encoder.calibrate()), "~JC");
    }
}
