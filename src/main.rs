use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use ttweet::broker::Broker;
use ttweet::config::{Settings, load_config};
use ttweet::transport::websocket::{bind, start_websocket_server};
use ttweet::utils::error::ServerError;
use ttweet::utils::logging;

/// Tagged message broker server
#[derive(Parser)]
#[command(name = "ttweet")]
struct Cli {
    /// Port to listen on (defaults to the configured port)
    port: Option<u16>,

    /// Interface to bind (defaults to the configured host)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", ServerError::from(e));
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(host) = cli.host {
        settings.server.host = host;
    }

    logging::init(&settings.server.log_level);

    match run_server(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(settings: Settings) -> Result<(), ServerError> {
    let listener = bind(&settings.addr()).await?;
    let broker = Broker::from_settings(&settings.broker).into_shared();

    tokio::select! {
        _ = start_websocket_server(listener, broker) => {
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}
