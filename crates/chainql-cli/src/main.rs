//! chainql entry point

use chainql_cli::{run, CliConfig, Command};
use clap::Parser;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chainql", version, about = "Compile query chains to SQL")]
struct Cli {
    /// JSON configuration file; defaults to a blog schema
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();

    let config = cli.config.as_deref().map(CliConfig::load).transpose();
    let level = match &config {
        Ok(Some(config)) => config.log_level.clone(),
        _ => "info".to_string(),
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = match config {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match run(&cli.command, &config) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
