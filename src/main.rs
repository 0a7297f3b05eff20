mod cli;

use clap::Parser;
use cli::{Cli, Command};
use prodrag::config::Config;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() {
    // RUST_LOG wins, then LOG_LEVEL, then info
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            std::env::var("LOG_LEVEL")
                .ok()
                .filter(|level| !level.trim().is_empty())
                .and_then(|level| EnvFilter::try_new(level.trim().to_lowercase()).ok())
        })
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::run(cli.command.unwrap_or(Command::Serve), config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
