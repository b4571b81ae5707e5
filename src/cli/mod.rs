// CLI module for kegama-offline
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;

/// kegama-offline - Offline-first caching proxy for the Kegama web app
#[derive(Parser, Debug)]
#[command(name = "kegama-offline", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.kegama-offline/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Upstream origin to front, e.g. http://127.0.0.1:8000
    #[arg(long, env = "KEGAMA_OFFLINE_UPSTREAM")]
    pub upstream: Option<String>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}
