//! Crawler configuration.

use crate::Args;
use anyhow::{anyhow, Context, Result};
use crawler_protocol::{
    Endpoint, MAINNET_MAGIC, NAMECOIN_MAGIC, TESTNET3_MAGIC, TESTNET_MAGIC,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The network to crawl, selecting the frame magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Testnet,
    #[default]
    Testnet3,
    Namecoin,
}

impl Network {
    /// The 4-byte frame magic for this network.
    pub fn magic(self) -> [u8; 4] {
        match self {
            Network::Main => MAINNET_MAGIC,
            Network::Testnet => TESTNET_MAGIC,
            Network::Testnet3 => TESTNET3_MAGIC,
            Network::Namecoin => NAMECOIN_MAGIC,
        }
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "main" | "mainnet" => Ok(Network::Main),
            "testnet" => Ok(Network::Testnet),
            "testnet3" => Ok(Network::Testnet3),
            "namecoin" => Ok(Network::Namecoin),
            other => Err(anyhow!("unknown network: {other}")),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Main => "main",
            Network::Testnet => "testnet",
            Network::Testnet3 => "testnet3",
            Network::Namecoin => "namecoin",
        };
        f.write_str(name)
    }
}

/// On-disk configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileConfig {
    /// Network to crawl.
    #[serde(default)]
    network: Network,
    /// Database path.
    #[serde(default = "default_db_path")]
    db_path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("crawler.db")
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Network to crawl.
    pub network: Network,
    /// Database path.
    pub db_path: PathBuf,
    /// Seed endpoint for a store with no known peers.
    pub bootstrap: Option<Endpoint>,
    /// Single-endpoint mode: crawl this peer and exit.
    pub connect: Option<Endpoint>,
}

impl CrawlerConfig {
    /// Load the configuration file, if present, and apply CLI
    /// overrides. Endpoint flags that do not parse are fatal here.
    pub fn load(args: &Args) -> Result<Self> {
        let file = if args.config.exists() {
            let content = std::fs::read_to_string(&args.config)
                .context("failed to read config file")?;
            toml::from_str(&content).context("failed to parse config file")?
        } else {
            FileConfig::default()
        };

        let network = match &args.network {
            Some(name) => name.parse()?,
            None => file.network,
        };

        let bootstrap = args
            .bootstrap
            .as_deref()
            .map(Endpoint::from_host_port)
            .transpose()
            .context("could not parse address to bootstrap from")?;

        let connect = args
            .connect
            .as_deref()
            .map(Endpoint::from_host_port)
            .transpose()
            .context("could not parse address to connect to")?;

        Ok(Self {
            network,
            db_path: args.db.clone().unwrap_or(file.db_path),
            bootstrap,
            connect,
        })
    }
}
