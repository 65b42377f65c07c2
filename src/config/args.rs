//! Command-line argument parsing

use clap::{Parser, Subcommand};

/// clickledger 命令行
#[derive(Parser, Debug)]
#[command(name = "clickledger")]
#[command(version)]
#[command(about = "Durable per-product affiliate click counter", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    /// Override server.host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Override server.port
    #[arg(long, short = 'p', global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Print a sample configuration file, or write it to OUTPUT
    GenerateConfig {
        /// Destination file; prints to stdout when omitted
        output: Option<String>,
    },
}
