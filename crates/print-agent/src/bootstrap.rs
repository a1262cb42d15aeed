use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use application::PrinterOrchestrator;
use domain::event::EventPublisher;
use domain::{Device, PrinterTransport};
use infrastructure::config::TransportConfig;
use infrastructure::{
    AgentConfig, BroadcastEventPublisher, CompositeEventPublisher, DialectEncoderFactory,
    FileTransport, LoggingEventPublisher, MockTransport, SerialTransport, TransportKind,
};

/// Address reported by the in-memory transport
pub const DRY_RUN_ADDRESS: &str = "dry-run";

/// A wired-up transport plus the device it points at, if the config names one.
pub struct Link {
    pub transport: Arc<dyn PrinterTransport>,
    pub default_device: Option<Device>,
}

/// Pick the transport the config asks for; `dry_run` forces the in-memory one.
pub fn build_link(config: &TransportConfig, dry_run: bool) -> Result<Link> {
    let kind = if dry_run {
        TransportKind::Mock
    } else {
        config.kind
    };

    let link = match kind {
        TransportKind::Serial => {
            let transport = SerialTransport::new(config.serial.clone());
            info!(port = ?config.serial.port, baud = config.serial.baud_rate, "🔌 Serial transport");
            Link {
                default_device: transport.configured_device(),
                transport: Arc::new(transport),
            }
        }
        TransportKind::File => {
            let path = config
                .path
                .as_deref()
                .context("transport.path is required for the file transport")?;
            let mut transport = FileTransport::new(path);
            if let Some(name) = &config.name {
                transport = transport.with_name(name.clone());
            }
            info!(path = %path, "📄 File transport");
            Link {
                default_device: Some(transport.device()),
                transport: Arc::new(transport),
            }
        }
        TransportKind::Mock => {
            let device = Device::new(DRY_RUN_ADDRESS, config.name.as_deref()).paired(true);
            // Nothing answers status queries in memory.
            let transport = MockTransport::new()
                .with_devices(vec![device.clone()])
                .with_paired(vec![device.clone()])
                .without_read_back();
            info!("🧪 Dry run, writes stay in memory");
            Link {
                default_device: Some(device),
                transport: Arc::new(transport),
            }
        }
    };
    Ok(link)
}

/// The orchestrator plus the broadcast channel its events go out on.
pub struct Agent {
    pub orchestrator: Arc<PrinterOrchestrator>,
    pub events: Arc<BroadcastEventPublisher>,
    pub default_device: Option<Device>,
}

pub fn build_agent(config: &AgentConfig, link: Link) -> Agent {
    let events = Arc::new(BroadcastEventPublisher::default());
    let sinks: Vec<Arc<dyn EventPublisher>> =
        vec![Arc::new(LoggingEventPublisher::new()), events.clone()];
    let publisher = Arc::new(CompositeEventPublisher::new(sinks));

    let orchestrator = PrinterOrchestrator::with_settings(
        link.transport,
        Arc::new(DialectEncoderFactory::new(config.printer.zebra_language)),
        publisher,
        config.session.clone(),
        config.printer.settings.clone(),
    );

    Agent {
        orchestrator: Arc::new(orchestrator),
        events,
        default_device: link.default_device,
    }
}
