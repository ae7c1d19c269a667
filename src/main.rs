//! metric-cache CLI entry point.

use anyhow::Result;
use clap::Parser;

use metric_cache::cli::{commands, handle_error, Cli, Commands};
use metric_cache::domain::models::Config;
use metric_cache::infrastructure::config::ConfigLoader;
use metric_cache::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli.command, cli.config.as_deref(), cli.json).await {
        handle_error(err, cli.json);
    }
}

async fn run(command: Commands, config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config: Config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    match command {
        Commands::Fetch(args) => commands::fetch::execute(args, &config, json).await,
        Commands::Partitions(args) => commands::partitions::execute(args, &config, json).await,
        Commands::Records(args) => commands::records::execute(args, &config, json).await,
    }
}
