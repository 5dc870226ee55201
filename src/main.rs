use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use furby_bridge::transport::{BleTransport, Transport};
use furby_bridge::{Config, Daemon, commands, discovery};

/// Furby Bridge - HTTP control plane for Bluetooth LE Furby toys
#[derive(Parser)]
#[command(name = "furby-bridge", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "FURBY_BRIDGE_PORT")]
    port: Option<u16>,

    /// Advertised name of the peripherals to connect to
    #[arg(long, env = "FURBY_DEVICE_NAME")]
    device_name: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect the services of the first matching peripheral, then exit
    Introspect,
    /// Print the command catalog
    Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,furby_bridge=info",
        1 => "info,furby_bridge=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.api_server.port = port;
    }
    if let Some(name) = cli.device_name {
        config.device_name = name;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Introspect) => introspect(&config).await,
        Some(Command::Commands) => {
            println!("{}", serde_json::to_string_pretty(commands::catalog())?);
            Ok(())
        }
        None => {
            let daemon = Daemon::new(config).await?;
            daemon.run().await?;
            Ok(())
        }
    }
}

/// Print the services of the first matching peripheral
async fn introspect(config: &Config) -> anyhow::Result<()> {
    let transport = BleTransport::new().await?;
    let events = transport.events().await?;

    tracing::info!(device_name = %config.device_name, "waiting for a device to introspect");
    let (device_id, services) =
        discovery::introspect(&transport, events, &config.device_name).await?;

    println!("device {device_id}");
    println!("{}", serde_json::to_string_pretty(&services)?);
    Ok(())
}
