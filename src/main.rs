use std::env;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::chart::HelmChartLoader;
use crate::commands::{AttachCommand, DownloadArgs, ProductCommand};
use crate::config::{Config, OutputFormat};
use crate::marketplace::MarketplaceClient;

mod assets;
mod attach;
mod chart;
mod commands;
mod config;
mod hashing;
mod marketplace;
mod output;
mod versions;

/// Manage products and their assets on the Marketplace.
#[derive(Parser)]
#[clap(version)]
struct Args {
    /// Marketplace API host
    #[clap(
        long,
        env = "MKPCLI_HOST",
        default_value = "gtw.marketplace.cloud.vmware.com",
        global = true
    )]
    marketplace_host: String,

    /// Path to a file containing an API token.
    /// You can also pass a token verbatim via the CSP_API_TOKEN env variable.
    #[clap(long, global = true)]
    csp_api_token: Option<String>,

    /// Output format (text, json or yaml)
    #[clap(long, short, default_value = "text", global = true)]
    output: OutputFormat,

    /// Make logging more verbose.
    /// You can also specify the log level via the RUST_LOG env variable.
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up and update products
    #[clap(subcommand)]
    Product(ProductCommand),

    /// Attach assets to a product version
    #[clap(subcommand)]
    Attach(AttachCommand),

    /// Download an asset of a product version
    Download(DownloadArgs),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if env::var("RUST_LOG").is_err() {
        let level = match args.verbose {
            true => "debug",
            false => "info",
        };
        env::set_var("RUST_LOG", format!("{}={}", env!("CARGO_PKG_NAME"), level));
    }
    env_logger::init();

    log::debug!(
        "Starting {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );
    log::debug!("With arguments {:?}", env::args().collect::<Vec<_>>());

    if let Err(error) = run(args).await {
        log::error!("{:?}", error);
        eprintln!("{}", error_message(&error));
        std::process::exit(1);
    }
}

/// The one-line report printed on failure, whatever the log filter.
fn error_message(error: &anyhow::Error) -> String {
    format!("Error: {:#}", error)
}

async fn run(args: Args) -> Result<()> {
    let config = Config::resolve(args.marketplace_host, args.csp_api_token, args.output).await?;
    let client = MarketplaceClient::new(&config.host, &config.token)
        .context("Failed to create marketplace client")?;

    match args.command {
        Command::Product(command) => {
            commands::run_product(&config, &client, &client, command).await
        }
        Command::Attach(command) => {
            let charts = HelmChartLoader::new();
            commands::run_attach(&config, &client, &client, &charts, command).await
        }
        Command::Download(download) => commands::run_download(&config, &client, download)
            .await
            .map(|_| ()),
    }
}
