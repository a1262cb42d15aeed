use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use application::PrinterOrchestrator;
use domain::device::Dialect;
use domain::printer::{Alignment, BarcodeSymbology, CutMode, QrErrorLevel, TextFormat};
use domain::Device;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan for nearby printers
    Scan {
        /// Scan window in seconds (defaults to scan_timeout_secs)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List printers already paired with this host
    Paired,
    /// Print a line of text
    Text {
        content: String,
        #[arg(long, value_enum, default_value_t = AlignArg::Left)]
        align: AlignArg,
        #[arg(long)]
        bold: bool,
        #[arg(long)]
        underline: bool,
    },
    /// Print a 1D barcode
    Barcode {
        data: String,
        #[arg(long, value_enum, default_value_t = SymbologyArg::Code128)]
        symbology: SymbologyArg,
    },
    /// Print a QR code
    Qr {
        data: String,
        #[arg(long, default_value_t = domain::printer::DEFAULT_QR_SIZE)]
        size: u8,
        #[arg(long, value_enum, default_value_t = QrLevelArg::M)]
        level: QrLevelArg,
    },
    /// Feed blank lines
    Feed {
        #[arg(default_value_t = 1)]
        lines: u8,
    },
    /// Cut the paper
    Cut {
        #[arg(long)]
        full: bool,
    },
    /// Send a ZPL or CPCL label file as-is
    Raw { file: PathBuf },
    /// Fill `{key}` placeholders in a label file and print it
    Template {
        file: PathBuf,
        /// key=value pairs
        #[arg(long = "set", value_parser = parse_substitution)]
        substitutions: Vec<(String, String)>,
    },
    /// Set print darkness (0-30)
    Darkness { value: i32 },
    /// Set print speed (1-14)
    Speed { value: i32 },
    /// Set label width and length in dots
    Dimensions { width: u32, length: u32 },
    /// Run media calibration
    Calibrate,
    /// Print the built-in test label
    TestLabel,
    /// Query and print the host status
    Status,
    /// Show the settings the session is using
    Settings,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum AlignArg {
    Left,
    Center,
    Right,
}

impl From<AlignArg> for Alignment {
    fn from(value: AlignArg) -> Self {
        match value {
            AlignArg::Left => Alignment::Left,
            AlignArg::Center => Alignment::Center,
            AlignArg::Right => Alignment::Right,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SymbologyArg {
    Code128,
    Code39,
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Itf,
    Codabar,
}

impl From<SymbologyArg> for BarcodeSymbology {
    fn from(value: SymbologyArg) -> Self {
        match value {
            SymbologyArg::Code128 => BarcodeSymbology::Code128,
            SymbologyArg::Code39 => BarcodeSymbology::Code39,
            SymbologyArg::Ean13 => BarcodeSymbology::Ean13,
            SymbologyArg::Ean8 => BarcodeSymbology::Ean8,
            SymbologyArg::UpcA => BarcodeSymbology::UpcA,
            SymbologyArg::UpcE => BarcodeSymbology::UpcE,
            SymbologyArg::Itf => BarcodeSymbology::Itf,
            SymbologyArg::Codabar => BarcodeSymbology::Codabar,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum QrLevelArg {
    L,
    M,
    Q,
    H,
}

impl From<QrLevelArg> for QrErrorLevel {
    fn from(value: QrLevelArg) -> Self {
        match value {
            QrLevelArg::L => QrErrorLevel::L,
            QrLevelArg::M => QrErrorLevel::M,
            QrLevelArg::Q => QrErrorLevel::Q,
            QrLevelArg::H => QrErrorLevel::H,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DialectArg {
    Escpos,
    Zebra,
    Generic,
}

impl From<DialectArg> for Dialect {
    fn from(value: DialectArg) -> Self {
        match value {
            DialectArg::Escpos => Dialect::EscPos,
            DialectArg::Zebra => Dialect::Zebra,
            DialectArg::Generic => Dialect::Generic,
        }
    }
}

/// Parse `key=value` for `--set`
pub fn parse_substitution(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got {:?}", raw)),
    }
}

/// Which printer a command talks to.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub device: Option<Device>,
    pub dialect: Option<Dialect>,
}

impl Command {
    fn needs_session(&self) -> bool {
        !matches!(self, Command::Scan { .. } | Command::Paired)
    }
}

/// Run one command and return what should be shown to the user.
///
/// Printing commands open a session to the target, run, then disconnect.
pub async fn execute(
    orchestrator: &PrinterOrchestrator,
    command: Command,
    target: Target,
    scan_timeout: Duration,
) -> Result<String> {
    if !command.needs_session() {
        return discover(orchestrator, command, scan_timeout).await;
    }

    let Some(device) = target.device else {
        bail!("no printer selected; pass --device or set transport.serial.port");
    };
    match target.dialect {
        Some(dialect) => orchestrator.connect_with_dialect(device, dialect).await?,
        None => orchestrator.connect(device).await?,
    }
    info!(dialect = ?orchestrator.active_dialect(), "Session open");

    let outcome = run(orchestrator, command).await;

    if let Err(e) = orchestrator.disconnect().await {
        warn!(error = %e, "Disconnect failed");
    }
    outcome
}

async fn discover(
    orchestrator: &PrinterOrchestrator,
    command: Command,
    scan_timeout: Duration,
) -> Result<String> {
    let devices = match command {
        Command::Scan { timeout } => {
            let window = timeout.map(Duration::from_secs).unwrap_or(scan_timeout);
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });
            let result = orchestrator.scan(window, cancel).await;
            watcher.abort();
            result?
        }
        _ => orchestrator.paired_devices().await?,
    };

    let lines: Vec<String> = devices
        .iter()
        .map(|d| format!("{}\t{}\t{}", d.address, d.display_name(), d.dialect()))
        .collect();
    Ok(lines.join("\n"))
}

async fn run(orchestrator: &PrinterOrchestrator, command: Command) -> Result<String> {
    let job_id = match command {
        Command::Text {
            content,
            align,
            bold,
            underline,
        } => {
            let mut format = TextFormat::aligned(align.into());
            if bold {
                format = format.bold();
            }
            if underline {
                format = format.underline();
            }
            orchestrator.print_text(&content, format).await?
        }
        Command::Barcode { data, symbology } => {
            orchestrator.print_barcode(&data, symbology.into()).await?
        }
        Command::Qr { data, size, level } => {
            orchestrator.print_qr_code(&data, size, level.into()).await?
        }
        Command::Feed { lines } => orchestrator.line_break(lines).await?,
        Command::Cut { full } => {
            let mode = if full { CutMode::Full } else { CutMode::Partial };
            orchestrator.cut_paper(mode).await?
        }
        Command::Raw { file } => {
            let label = read_label(&file)?;
            orchestrator.print_raw_label(&label).await?
        }
        Command::Template {
            file,
            substitutions,
        } => {
            let template = read_label(&file)?;
            let substitutions: HashMap<String, String> = substitutions.into_iter().collect();
            orchestrator
                .print_label_with_template(&template, &substitutions)
                .await?
        }
        Command::Darkness { value } => orchestrator.set_darkness(value).await?,
        Command::Speed { value } => orchestrator.set_speed(value).await?,
        Command::Dimensions { width, length } => {
            orchestrator.set_label_dimensions(width, length).await?
        }
        Command::Calibrate => orchestrator.calibrate().await?,
        Command::TestLabel => orchestrator.print_test_label().await?,
        Command::Status => {
            let status = orchestrator.get_status().await?;
            return Ok(serde_json::to_string_pretty(&status)?);
        }
        Command::Settings => {
            let settings = orchestrator.get_settings().await?;
            return Ok(serde_json::to_string_pretty(&settings)?);
        }
        other => bail!("{:?} does not print", other),
    };
    Ok(format!("job {} completed", job_id))
}

fn read_label(path: &PathBuf) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_substitution() {
        assert_eq!(
            parse_substitution("sku=W-01"),
            Ok(("sku".to_string(), "W-01".to_string()))
        );
        assert_eq!(
            parse_substitution("note=a=b"),
            Ok(("note".to_string(), "a=b".to_string()))
        );
        assert!(parse_substitution("novalue").is_err());
        assert!(parse_substitution("=x").is_err());
    }

    #[test]
    fn test_discovery_commands_skip_session() {
        assert!(!Command::Paired.needs_session());
        assert!(!Command::Scan { timeout: None }.needs_session());
        assert!(Command::Calibrate.needs_session());
    }
}
