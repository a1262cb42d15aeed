use super::Dialect;

const ZEBRA_BRAND: &str = "zebra";

/// Zebra model families. Matched only at the start of a word so "Forward" is not an RW.
const ZEBRA_MODELS: &[&str] = &[
    "zt", "zm", "zq", "zr", "zd", "ql", "rw", "imz", "gk420", "gx420", "gc420",
];

const ESC_POS_TOKENS: &[&str] = &[
    "pos",
    "esc",
    "thermal",
    "receipt",
    "printer",
    "bt",
    "bluetooth",
    "serial",
];

/// Picks a dialect from a device's advertised name.
pub struct DeviceClassifier;

impl DeviceClassifier {
    /// Case-insensitive match, Zebra before ESC/POS so "Zebra BT Printer" stays a label printer.
    ///
    /// Missing or blank names are `Unknown`; names matching nothing are `Generic`.
    pub fn classify(name: Option<&str>) -> Dialect {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_lowercase(),
            _ => return Dialect::Unknown,
        };

        if is_zebra(&name) {
            Dialect::Zebra
        } else if ESC_POS_TOKENS.iter().any(|t| name.contains(t)) {
            Dialect::EscPos
        } else {
            Dialect::Generic
        }
    }
}

fn is_zebra(lowercase_name: &str) -> bool {
    lowercase_name.contains(ZEBRA_BRAND)
        || lowercase_name
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| ZEBRA_MODELS.iter().any(|m| word.starts_with(m)))
}
