pub mod cpcl;
pub mod escpos;
pub mod generic;
pub mod host_status;
mod label;
pub mod template;
pub mod zpl;

pub use cpcl::CpclEncoder;
pub use escpos::EscPosEncoder;
pub use generic::GenericEncoder;
pub use host_status::parse_host_status;
pub use zpl::ZplEncoder;

use domain::device::{Dialect, LabelLanguage};
use domain::printer::{CommandEncoder, EncoderFactory};

/// Factory for dialect encoders
///
/// Zebra printers get ZPL or CPCL depending on `zebra_language`; the two cannot be told
/// apart from the advertised name.
#[derive(Debug, Clone, Default)]
pub struct DialectEncoderFactory {
    zebra_language: LabelLanguage,
}

impl DialectEncoderFactory {
    pub fn new(zebra_language: LabelLanguage) -> Self {
        Self { zebra_language }
    }
}

impl EncoderFactory for DialectEncoderFactory {
    fn create(&self, dialect: Dialect) -> Box<dyn CommandEncoder> {
        match dialect {
            Dialect::EscPos => Box::new(EscPosEncoder::new()),
            Dialect::Zebra => match self.zebra_language {
                LabelLanguage::Zpl => Box::new(ZplEncoder::new()),
                LabelLanguage::Cpcl => Box::new(CpclEncoder::new()),
            },
            Dialect::Generic | Dialect::Unknown => Box::new(GenericEncoder::new()),
        }
    }
}
