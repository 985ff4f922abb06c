//! Performax command-line tool
//!
//! Talks to an Arcus Performax motor controller over USB: enumerates
//! controllers, passes ASCII commands through and prints the replies.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use common::{DeviceSession, SessionBridge, create_session_bridge, setup_logging};
use performax::config::PerformaxConfig;
use performax::startup::{connect_and_flush, run_init_sequence};
use performax::usb::{RusbDriver, list_devices, spawn_session_worker};
use protocol::Command;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "performax")]
#[command(
    author,
    version,
    about = "Send commands to Arcus Performax motor controllers over USB"
)]
#[command(long_about = "
Command passthrough for Arcus Performax stepper motor controllers.
Each command is sent as one USB packet and the controller's reply is printed.

EXAMPLES:
    # List attached controllers
    performax list

    # Query the controller ID and position
    performax send ID PX

    # Run the initialization sequence from the configuration
    performax init

    # Run with debug logging
    performax --log-level debug send MST

CONFIGURATION:
    The configuration is looked up in the following order:
    1. Path specified with --config
    2. ~/.config/performax/performax.toml
    3. /etc/performax/performax.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List attached controllers
    List,
    /// Send each command in order and print its reply
    Send {
        #[arg(required = true, value_name = "COMMAND")]
        commands: Vec<String>,
    },
    /// Connect and flush the controller's buffers
    Flush,
    /// Connect, flush and run the initialization sequence
    Init,
    /// Save default configuration to --config, or the default location, and exit
    SaveConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle save-config early (before loading config)
    if let Cmd::SaveConfig = args.command {
        let config = PerformaxConfig::default();
        let path = args
            .config
            .as_deref()
            .map(PerformaxConfig::expand_path)
            .unwrap_or_else(PerformaxConfig::default_path);
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        PerformaxConfig::load_from(path).context("Failed to load configuration")?
    } else {
        PerformaxConfig::load_or_default()
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.logging.log_level);

    setup_logging(log_level).context("Failed to setup logging")?;

    info!("performax v{}", env!("CARGO_PKG_VERSION"));

    if let Cmd::List = args.command {
        return list_mode().await;
    }

    // Validate up front so a typo never reaches the controller
    let commands = match &args.command {
        Cmd::Send { commands } => commands
            .iter()
            .map(|c| Command::new(c.as_str()).with_context(|| format!("Invalid command '{}'", c)))
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };

    let timeouts = config.timeouts.timeouts();
    let driver = RusbDriver::new()
        .map_err(|e| anyhow!("Failed to initialize libusb: {}", e))?
        .with_timeouts(timeouts);
    let session = DeviceSession::new(driver).with_timeouts(timeouts);

    let (bridge, worker) = create_session_bridge();
    let worker_handle =
        spawn_session_worker(worker, session).context("Failed to spawn session thread")?;

    let result = match args.command {
        Cmd::Send { .. } => send_mode(&bridge, &config, &commands).await,
        Cmd::Flush => flush_mode(&bridge, &config).await,
        Cmd::Init => init_mode(&bridge, &config).await,
        Cmd::List | Cmd::SaveConfig => Ok(()),
    };

    // Cleanup: the session thread disconnects before exiting
    if let Err(e) = bridge.shutdown().await {
        error!("Error shutting down session thread: {}", e);
    }
    if let Err(e) = worker_handle.join() {
        error!("Session thread panicked: {:?}", e);
    }

    result
}

/// List controllers and exit
async fn list_mode() -> Result<()> {
    let devices = tokio::task::spawn_blocking(|| {
        let driver = RusbDriver::new().map_err(|e| anyhow!("Failed to initialize libusb: {}", e))?;
        list_devices(driver.context()).map_err(|e| anyhow!("Enumeration failed: {}", e))
    })
    .await
    .context("Enumeration task failed")??;

    if devices.is_empty() {
        println!("No Performax controllers found.");
        return Ok(());
    }

    println!("Found {} controller(s):\n", devices.len());
    for device in devices {
        println!(
            "  [{}] {:04x}:{:04x} - {} {}",
            device.index,
            device.vendor_id,
            device.product_id,
            device
                .manufacturer
                .as_deref()
                .unwrap_or("Unknown Manufacturer"),
            device.product.as_deref().unwrap_or("Unknown Product")
        );
        println!(
            "      Bus {:03} Device {:03}",
            device.bus_number, device.device_address
        );
        if let Some(serial) = &device.serial_number {
            println!("      Serial: {}", serial);
        }
        println!();
    }

    Ok(())
}

async fn send_mode(
    bridge: &SessionBridge,
    config: &PerformaxConfig,
    commands: &[Command],
) -> Result<()> {
    connect_and_flush(bridge, &config.startup)
        .await
        .context("Failed to connect")?;

    for command in commands {
        let reply = bridge.send(command.clone()).await?;
        println!("{} -> {}", command, reply);
    }

    Ok(())
}

async fn flush_mode(bridge: &SessionBridge, config: &PerformaxConfig) -> Result<()> {
    let count = connect_and_flush(bridge, &config.startup)
        .await
        .context("Failed to connect")?;
    println!("Flushed ({} controller(s) attached)", count);
    Ok(())
}

async fn init_mode(bridge: &SessionBridge, config: &PerformaxConfig) -> Result<()> {
    connect_and_flush(bridge, &config.startup)
        .await
        .context("Failed to connect")?;

    let report = run_init_sequence(bridge, &config.startup.init_sequence).await?;
    for step in &report.steps {
        match &step.result {
            Ok(reply) => println!("{} -> {}", step.command, reply),
            Err(e) => println!("{} !! {}", step.command, e),
        }
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} of {} init steps failed",
            report.failed().count(),
            report.steps.len()
        ))
    }
}
