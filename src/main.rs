// src/main.rs — dossier entry point

use clap::Parser;

use dossier::cli::{run, Cli, Commands};
use dossier::infra::config::Config;
use dossier::infra::logger;

#[tokio::main]
async fn main() {
    // Respects RUST_LOG; logs go to stderr
    logger::init_logging("info");

    if let Err(e) = run_cli().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match &cli.command {
        Some(Commands::Check) => run::run_check(&config).await,
        None => run::run_research(&cli, &config).await,
    }
}
