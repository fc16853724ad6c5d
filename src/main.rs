mod config;
mod http_server;
mod logging;
mod ports;
mod quality;
mod query;
mod selection;
mod services;
#[cfg(test)]
mod test_utils;
mod upstream;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, Section, eyre::Context};

use crate::{
    config::Config,
    http_server::{app::HttpServerConfig, error::status_for, state::AppState},
    logging::init_tracing,
    services::pipeline_from_config,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "TRACK_PROXY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `track_proxy=debug,tower_http=info`
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// OTLP gRPC endpoint to export traces to
    #[arg(long, env = "OTLP_ENDPOINT", global = true)]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP lookup endpoint
    Serve {
        /// The port to run the server on
        #[arg(short, long, default_value = "8080", env = "PORT")]
        port: u16,

        /// Catalog search endpoint, overrides the config file
        #[arg(long, env = "CATALOG_URL")]
        catalog_url: Option<String>,

        /// Resolution endpoint, overrides the config file
        #[arg(long, env = "RESOLVER_URL")]
        resolver_url: Option<String>,
    },
    /// Resolve a single query and print the URL
    Resolve {
        query: String,

        /// One of 5, 6, 7, 27 (default 27)
        #[arg(short, long)]
        quality: Option<String>,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = init_tracing(
        env!("CARGO_PKG_NAME"),
        args.otlp_endpoint.as_deref(),
        &args.log_level,
    )?;

    let result = run(args).await;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!("Failed to flush traces: {}", e);
        }
    }

    result
}

async fn run(args: Args) -> Result<()> {
    tracing::debug!("Loading configuration");
    let mut config = match &args.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .wrap_err("Failed to load track-proxy config")?;

    match args.command {
        Commands::Serve {
            port,
            catalog_url,
            resolver_url,
        } => {
            if let Some(url) = catalog_url {
                config.catalog.base_url = url;
            }
            if let Some(url) = resolver_url {
                config.resolver.base_url = url;
            }
            config.validate()?;

            let app_state = Arc::new(AppState {
                pipeline: pipeline_from_config(&config)?,
                response_field: config.server.response_field,
                expose_upstream_details: config.server.expose_upstream_details,
            });

            tracing::info!(
                catalog = %config.catalog.base_url,
                resolver = %config.resolver.base_url,
                "Starting HTTP server on port: {}",
                port
            );
            http_server::app::start(HttpServerConfig { port, app_state }).await?;
        }
        Commands::Resolve { query, quality } => {
            let pipeline = pipeline_from_config(&config)?;
            match pipeline.run(&query, quality.as_deref()).await {
                Ok(resolved) => println!("{}", resolved.url),
                Err(e) => {
                    let status = status_for(e.kind());
                    let report = color_eyre::eyre::eyre!("{e} ({status})");
                    return Err(match e.detail() {
                        Some(detail) => report.with_note(|| detail.to_string()),
                        None => report,
                    });
                }
            }
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}
