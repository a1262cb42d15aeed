use serde::{Deserialize, Serialize};

/// Command protocol a printer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Dialect {
    /// Byte-oriented receipt printer protocol
    EscPos,
    /// Zebra label printers (ZPL or CPCL)
    Zebra,
    /// Plain passthrough for unrecognised printers
    Generic,
    /// No name to classify on
    #[default]
    Unknown,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EscPos => "ESC/POS",
            Self::Zebra => "Zebra",
            Self::Generic => "Generic",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether label-only operations (raw labels, darkness, calibration...) apply
    pub fn supports_labels(&self) -> bool {
        matches!(self, Self::Zebra)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language spoken by a Zebra printer once the Zebra dialect is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LabelLanguage {
    #[default]
    Zpl,
    Cpcl,
}
