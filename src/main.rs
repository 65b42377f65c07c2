use anyhow::{Context, Result};
use clap::Parser;

use clickledger::config::{Cli, Commands, StaticConfig, init_config, update_config};
use clickledger::runtime::modes::run_server;
use clickledger::system::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Some(Commands::GenerateConfig { output }) = &cli.command {
        let sample = StaticConfig::generate_sample_config();
        match output {
            Some(path) => {
                std::fs::write(path, sample)
                    .with_context(|| format!("Failed to write {}", path))?;
                println!("Sample configuration written to {}", path);
            }
            None => print!("{}", sample),
        }
        return Ok(());
    }

    if let Err(e) = init_config(&cli.config) {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }
    let config = update_config(|c| {
        if let Some(host) = &cli.host {
            c.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            c.server.port = port;
        }
    });

    let _guard = init_logging(&config.logging).context("Failed to initialize logging")?;

    run_server(&config).await
}
