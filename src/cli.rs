use clap::{Parser, Subcommand};
use prodrag::config::Config;
use prodrag::server::{self, AppState};

#[derive(Parser)]
#[command(name = "prodrag", about = "Semantic product search service", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP service (the default)
    Serve,
    /// Fetch products from the configured source and index them
    Index {
        /// Only these product ids; all products when omitted
        ids: Vec<String>,
    },
    /// Search the index
    Search {
        query: String,
        /// Number of results (defaults to DEFAULT_TOP_K)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        top_k: Option<u64>,
    },
    /// Print index statistics
    Stats,
    /// Remove every indexed product
    Clear,
}

/// Runs one command against the configured store.
pub async fn run(command: Command, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_config(config)?;

    match command {
        Command::Serve => server::serve(state).await?,

        Command::Index { ids } => {
            let ids = if ids.is_empty() { None } else { Some(ids) };
            let products = state.source.get_products(ids.as_deref()).await?;
            if products.is_empty() {
                println!("No products to index");
            } else {
                let count = state.store.index_products(&products).await?;
                println!("Indexed {count} products");
            }
        }

        Command::Search { query, top_k } => {
            let top_k = match top_k {
                Some(k) => usize::try_from(k)?,
                None => state.config.default_top_k,
            };
            let hits = state.store.search(&query, top_k).await?;
            if hits.is_empty() {
                println!("No results found");
            } else {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            }
        }

        Command::Stats => {
            let stats = state.store.stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Command::Clear => {
            state.store.clear().await?;
            println!("Index cleared");
        }
    }

    Ok(())
}
