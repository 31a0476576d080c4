//! Agent Relay - Main Entry Point
//!
//! Serves `POST /orchestrate` and forwards each message to the downstream
//! agent configured by `AGENT_RUN_URL` (or the config file).

use agent_relay::config::RelayConfig;
use agent_relay::forwarder::AgentForwarder;
use agent_relay::observability::{init_default_logging, init_logging, logging};
use agent_relay::server;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn, Level};

/// Config file looked up in the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "relay.toml";

/// HTTP relay between callers and a downstream agent service
#[derive(Parser)]
#[command(name = "agent-relay")]
#[command(about = "Forward orchestration requests to a downstream agent service")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RELAY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace); overrides LOG_LEVEL
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the relay until SIGINT or SIGTERM
    Run,
    /// Validate the effective configuration
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // .env must be in the environment before logging and config read it
    let dotenv_path = dotenvy::dotenv().ok();

    init_observability(cli.verbose);

    info!("Starting agent-relay v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_path {
        info!("Loaded environment from: {}", path.display());
    }

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_relay(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn init_observability(verbose: u8) {
    if verbose == 0 {
        init_default_logging();
        return;
    }

    let level = if verbose == 1 { Level::DEBUG } else { Level::TRACE };

    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let include_spans = logging::parse_spans_flag(&std::env::var("LOG_SPANS").unwrap_or_default());
    init_logging(level, logging::LogFormat::parse(&format), include_spans);
}

fn load_configuration(
    config_path: Option<&Path>,
) -> Result<RelayConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(RelayConfig::load_from_file(path)?)
        }
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                info!("Loading configuration from: {}", default_path.display());
                return Ok(RelayConfig::load_from_file(default_path)?);
            }

            info!("No configuration file, using defaults and environment");
            Ok(RelayConfig::from_env()?)
        }
    }
}

async fn run_relay(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Using Agent Run URL: {}", config.agent.run_url);
    warn!("Downstream agent calls have no timeout; a hung agent holds its request indefinitely");

    let forwarder = Arc::new(AgentForwarder::new(config.agent.run_url.clone()));
    server::serve(&config, forwarder, shutdown_signal()).await?;

    Ok(())
}

fn handle_config_command(
    config: &RelayConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current relay configuration:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
                }
                return;
            }
            _ => warn!("Unix signal handlers unavailable, falling back to Ctrl-C"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl-C, shutting down gracefully...");
}
