//! Network crawler daemon.
//!
//! Walks a Bitcoin-style P2P network starting from known peers (or a
//! bootstrap endpoint), recording every peer and the directed
//! "A knows B" relation into SQLite.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod connector;
mod pipeline;
mod source;
mod stats;
mod updater;
mod writer;

use config::CrawlerConfig;

/// Crawl a Bitcoin-style P2P network and record who knows whom.
#[derive(Parser, Debug)]
#[command(name = "crawler-node")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Node to bootstrap from if none are known
    #[arg(long)]
    pub bootstrap: Option<String>,

    /// Connect only to the given node, then exit
    #[arg(long)]
    pub connect: Option<String>,

    /// Path to configuration file
    #[arg(long, default_value = "crawler.toml")]
    pub config: PathBuf,

    /// Database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Network to crawl (main, testnet, testnet3, namecoin)
    #[arg(long)]
    pub network: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = CrawlerConfig::load(&args)?;

    info!(
        network = %config.network,
        db = %config.db_path.display(),
        "starting crawler v{}",
        env!("CARGO_PKG_VERSION")
    );

    tokio::select! {
        result = pipeline::run(config) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    info!("crawler stopped");
    Ok(())
}
