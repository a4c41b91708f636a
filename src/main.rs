use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use geoweather::geolocation::{CachingSource, StaticLocationSource};
use geoweather::{
    Coordinates, CycleOutcome, GeoWeatherConfig, GeolocationProvider, LookupMode, ProxyClient,
    WeatherDataOrchestrator, render, telemetry, web,
};

/// Current weather for wherever you are
#[derive(Parser)]
#[command(name = "geoweather", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the proxy API and static file server
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one lookup cycle against a running server
    Lookup {
        /// Device latitude; without coordinates no location is available
        #[arg(long, requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,
        /// Device longitude
        #[arg(long, requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
        /// Override the configured server URL
        #[arg(long)]
        server: Option<String>,
        /// Resolve place name and weather at the same time
        #[arg(long)]
        concurrent: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = GeoWeatherConfig::load_from_path(cli.config)?;
    telemetry::init(&config.logging, cli.verbose)?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            web::run(&config).await
        }
        Command::Lookup {
            latitude,
            longitude,
            server,
            concurrent,
        } => {
            if let Some(server) = server {
                config.client.server_url = server;
            }
            let concurrent = concurrent || config.client.concurrent_lookups;

            let geolocation = match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => GeolocationProvider::new(CachingSource::new(
                    StaticLocationSource::new(Coordinates::new(latitude, longitude)),
                )),
                _ => GeolocationProvider::unsupported(),
            };
            let client = Arc::new(ProxyClient::from_config(&config.client)?);
            let mode = if concurrent {
                LookupMode::Concurrent
            } else {
                LookupMode::Sequential
            };

            let orchestrator =
                WeatherDataOrchestrator::new(geolocation, client.clone(), client).with_mode(mode);

            match orchestrator.fetch().await {
                CycleOutcome::Completed(state) => println!("{}", render::render(&state)),
                CycleOutcome::AlreadyInFlight => tracing::warn!("A lookup is already running"),
            }
            Ok(())
        }
    }
}
