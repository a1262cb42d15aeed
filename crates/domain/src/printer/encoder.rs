use std::collections::HashMap;

use super::{EncodedCommand, PrintPrimitive, PrinterSettings, PrinterStatus};
use crate::device::{Dialect, LabelLanguage};
use crate::error::PrinterError;

/// Turns print primitives into dialect bytes.
///
/// Encoders are pure: the same primitive and settings always give the same chunks, and
/// every validation error is returned before anything reaches a transport.
pub trait CommandEncoder: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Writes issued right after the transport connects (ESC/POS init, Zebra status query)
    fn handshake(&self) -> EncodedCommand;

    fn encode(
        &self,
        primitive: &PrintPrimitive,
        settings: &PrinterSettings,
    ) -> Result<EncodedCommand, PrinterError>;

    /// Encode a whole batch. Fails without output if any primitive is invalid.
    fn encode_batch(
        &self,
        primitives: &[PrintPrimitive],
        settings: &PrinterSettings,
    ) -> Result<EncodedCommand, PrinterError> {
        let mut out = EncodedCommand::new();
        for primitive in primitives {
            out.extend(self.encode(primitive, settings)?);
        }
        Ok(out)
    }

    /// Label-printer extensions, when the dialect has them
    fn as_label(&self) -> Option<&dyn LabelEncoder> {
        None
    }
}

/// Operations only label printers (ZPL/CPCL) understand.
pub trait LabelEncoder: Send + Sync {
    fn language(&self) -> LabelLanguage;

    /// Send caller-supplied label text, normalised for the language
    fn raw_label(&self, text: &str) -> Result<EncodedCommand, PrinterError>;

    /// Fill `{key}` placeholders and send the result as a raw label
    fn template_label(
        &self,
        template: &str,
        substitutions: &HashMap<String, String>,
    ) -> Result<EncodedCommand, PrinterError>;

    fn darkness(&self, value: i32) -> Result<EncodedCommand, PrinterError>;

    fn speed(&self, value: i32) -> Result<EncodedCommand, PrinterError>;

    fn label_dimensions(&self, width: u32, length: u32) -> Result<EncodedCommand, PrinterError>;

    fn calibrate(&self) -> EncodedCommand;

    fn test_label(&self, settings: &PrinterSettings) -> EncodedCommand;

    fn status_query(&self) -> EncodedCommand;

    fn parse_status(&self, reply: &[u8]) -> Result<PrinterStatus, PrinterError>;
}

/// Builds the encoder for a dialect. Injected into the orchestrator.
pub trait EncoderFactory: Send + Sync {
    fn create(&self, dialect: Dialect) -> Box<dyn CommandEncoder>;
}
