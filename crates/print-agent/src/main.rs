use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use domain::Device;
use infrastructure::AgentConfig;
use print_agent::bootstrap::{build_agent, build_link};
use print_agent::commands::{Command, DialectArg, Target, execute};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Keep every write in memory instead of opening a port
    #[arg(long)]
    dry_run: bool,

    /// Printer address (serial port path) overriding the configured one
    #[arg(long)]
    device: Option<String>,

    /// Advertised printer name, used to pick the dialect
    #[arg(long)]
    name: Option<String>,

    /// Force a dialect instead of classifying by name
    #[arg(long, value_enum)]
    dialect: Option<DialectArg>,

    #[command(subcommand)]
    command: Command,
}

async fn run() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,print_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Run from the workspace root during development
    let dev_config = format!("crates/print-agent/{}", args.config_dir);
    let config_dir = if std::path::Path::new(&dev_config).exists() {
        dev_config
    } else {
        args.config_dir.clone()
    };
    info!("📂 Config directory: {}", config_dir);

    let mut config = AgentConfig::load(&config_dir)?;
    if let Some(name) = &args.name {
        config.transport.name = Some(name.clone());
        config.transport.serial.name = Some(name.clone());
    }

    let link = build_link(&config.transport, args.dry_run)?;
    let agent = build_agent(&config, link);

    let device = match &args.device {
        Some(address) => Some(Device::new(address.clone(), args.name.as_deref())),
        None => agent.default_device.clone(),
    };
    let target = Target {
        device,
        dialect: args.dialect.map(Into::into),
    };

    let output = execute(
        &agent.orchestrator,
        args.command,
        target,
        Duration::from_secs(config.scan_timeout_secs),
    )
    .await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Could not start the runtime: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ {:?}", e);
        std::process::exit(1);
    }
}
