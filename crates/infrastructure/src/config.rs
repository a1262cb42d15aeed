use config::{Config, ConfigError, Environment, File};
use domain::device::LabelLanguage;
use domain::printer::{PrinterSettings, SessionConfig};
use serde::{Deserialize, Serialize};

use crate::transport::SerialConfig;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Serial,
    File,
    /// In-memory, nothing leaves the process
    Mock,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,
    #[serde(default)]
    pub serial: SerialConfig,
    /// Spool file for the `file` transport
    pub path: Option<String>,
    /// Name to report for the file sink, so the dialect can be classified
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PrinterConfig {
    #[serde(default)]
    pub zebra_language: LabelLanguage,
    #[serde(default = "default_settings")]
    pub settings: PrinterSettings,
}

fn default_settings() -> PrinterSettings {
    PrinterSettings::default()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,
}

fn default_scan_timeout() -> u64 {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            session: SessionConfig::default(),
            printer: PrinterConfig::default(),
            scan_timeout_secs: default_scan_timeout(),
        }
    }
}

impl AgentConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Local config file, e.g. config/default.toml. Required so a missing install
            // fails loudly instead of printing to a default port.
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. BTPRINT__TRANSPORT__SERIAL__PORT=/dev/rfcomm0)
            .add_source(Environment::with_prefix("BTPRINT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.transport.kind, TransportKind::Serial);
        assert_eq!(config.printer.zebra_language, LabelLanguage::Zpl);
        assert_eq!(config.session.connect_timeout_ms, 10_000);
        assert_eq!(config.scan_timeout_secs, 10);
    }

    #[test]
    fn test_load_layers_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
scan_timeout_secs = 5

[transport]
kind = "file"
path = "/tmp/spool.zpl"
name = "Zebra ZD420"

[session]
connect_timeout_ms = 3000

[printer]
zebra_language = "cpcl"

[printer.settings]
darkness = 15
dpi = 300
"#
        )
        .unwrap();

        let config = AgentConfig::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.transport.kind, TransportKind::File);
        assert_eq!(config.transport.path.as_deref(), Some("/tmp/spool.zpl"));
        assert_eq!(config.session.connect_timeout_ms, 3000);
        assert_eq!(config.session.status_timeout_ms, 2000);
        assert_eq!(config.printer.zebra_language, LabelLanguage::Cpcl);
        assert_eq!(config.printer.settings.darkness, Some(15));
        assert_eq!(config.printer.settings.dpi, 300);
        assert_eq!(config.printer.settings.line_height, 30);
        assert_eq!(config.scan_timeout_secs, 5);
    }

    #[test]
    fn test_missing_default_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AgentConfig::load(dir.path().to_str().unwrap()).is_err());
    }
}
