//! amqp-tether command line entry point
//!
//! `config` validates and prints the effective configuration, `probe`
//! connects to a broker and reports readiness.

use amqp_tether::client::{completion_channel, ClientBuilder, Ready};
use amqp_tether::config::{ClientOptions, EffectiveConfig};
use amqp_tether::observability::{init_default_logging, LogChoice};
use amqp_tether::transport::LapinTransport;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tokio::{
    signal,
    time::{sleep, Duration},
};
use tracing::{error, info, warn};

/// Resilient AMQP connection bootstrap
#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "AMQP connection lifecycle manager")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration (file plus AMQP_* environment overrides)
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
    /// Connect to the broker and wait until the client is ready
    Probe {
        /// Broker URL, overriding file and environment
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Keep the connection open this many seconds (Ctrl-C ends early)
        #[arg(long, value_name = "N", default_value_t = 0)]
        hold_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    info!("Starting tether v{}", env!("CARGO_PKG_VERSION"));

    let options = match load_options(&cli.config) {
        Ok(options) => options,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Config { show } => handle_config_command(options, show),
        Commands::Probe { url, hold_secs } => run_probe(options, url, hold_secs).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_options(config_path: &Option<PathBuf>) -> Result<ClientOptions, Box<dyn std::error::Error>> {
    let options = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            ClientOptions::load_from_file(path)?
        }
        None => {
            let default_path = PathBuf::from("tether.toml");
            if default_path.exists() {
                info!("Loading configuration from: {}", default_path.display());
                ClientOptions::load_from_file(&default_path)?
            } else {
                ClientOptions::default()
            }
        }
    };

    Ok(options.with_env_overrides()?)
}

fn handle_config_command(
    options: ClientOptions,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.merge()?;
    info!("Configuration is valid");

    if show {
        print_config(&config)?;
    }

    Ok(())
}

fn print_config(config: &EffectiveConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Address: {}", config.url);
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

async fn run_probe(
    mut options: ClientOptions,
    url: Option<String>,
    hold_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(url) = url {
        options = options.with_url(url);
    }
    if options.log.is_none() {
        options = options.with_log(LogChoice::Tracing);
    }
    if options.assert.queues.is_some()
        || options.assert.exchanges.is_some()
        || options.assert.binds.is_some()
    {
        warn!("Probe does not provision resources, ignoring assert configuration");
        options.assert = Default::default();
    }

    let (on_complete, ready) = completion_channel::<Ready<LapinTransport>>();
    let client = ClientBuilder::new()
        .options(options)
        .on_complete(on_complete)
        .build(LapinTransport::new().with_connection_name("tether-probe"))?;

    info!(client_id = %client.id(), address = %client.address(), "Probing broker");

    let outcome = match ready.await {
        Ok(outcome) => outcome,
        Err(_) => {
            client.close().await;
            return Err("client stopped before reporting an outcome".into());
        }
    };

    if let Err(e) = outcome {
        client.close().await;
        return Err(e.into());
    }

    info!(address = %client.address(), "Broker connection ready");

    if hold_secs > 0 {
        info!("Holding connection for {} seconds", hold_secs);
        tokio::select! {
            _ = sleep(Duration::from_secs(hold_secs)) => {}
            _ = signal::ctrl_c() => {
                info!("Received Ctrl-C, closing early");
            }
        }
    }

    client.close().await;
    info!("Connection closed");
    Ok(())
}
