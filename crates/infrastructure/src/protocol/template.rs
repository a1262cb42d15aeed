use std::collections::HashMap;
use std::sync::LazyLock;

use domain::PrinterError;
use regex::Regex;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.\-]*)\}").expect("Invalid regex")
});

/// Replace every `{key}` in `template` with its substitution.
///
/// A placeholder without a value is an error, so a half-filled label is never printed.
/// Braces that do not form a placeholder are kept literally.
pub fn render(
    template: &str,
    substitutions: &HashMap<String, String>,
) -> Result<String, PrinterError> {
    if template.trim().is_empty() {
        return Err(PrinterError::invalid("label template is empty"));
    }

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = substitutions.get(key.as_str()).ok_or_else(|| {
            PrinterError::invalid(format!("no value for template placeholder {{{}}}", key.as_str()))
        })?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_replaces_placeholders() {
        let out = render(
            "^XA^FO20,20^FD{name}^FS^FO20,60^FD{sku}^FS^XZ",
            &subs(&[("name", "Widget"), ("sku", "W-01")]),
        )
        .unwrap();
        assert_eq!(out, "^XA^FO20,20^FDWidget^FS^FO20,60^FDW-01^FS^XZ");
    }

    #[test]
    fn test_repeated_placeholder() {
        let out = render("{a}-{a}", &subs(&[("a", "x")])).unwrap();
        assert_eq!(out, "x-x");
    }

    #[test]
    fn test_missing_value_is_an_error() {
        let err = render("^FD{name}^FS", &HashMap::new()).unwrap_err();
        assert!(matches!(err, PrinterError::InvalidArgument(_)));
    }

    #[test]
    fn test_non_placeholder_braces_are_kept() {
        let out = render("{ not a key } {}", &HashMap::new()).unwrap();
        assert_eq!(out, "{ not a key } {}");
    }

    #[test]
    fn test_empty_template_rejected() {
        assert!(render("  ", &HashMap::new()).is_err());
    }
}
