//! Text embedding backends.
//!
//! The store only depends on the [`Embedder`] trait. Which backend runs is
//! decided once at startup from configuration.

pub mod hashing;
pub mod http;

use crate::config::Config;
use crate::error::StoreError;
use std::sync::Arc;

pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;

#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Encodes every text into one vector, in input order.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError>;

    /// Number of components in every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Model identifier reported in store statistics.
    fn model(&self) -> &str;
}

/// Picks the configured backend: a remote endpoint when `EMBEDDER_URL` is set,
/// the offline hashing embedder otherwise.
pub fn from_config(config: &Config) -> Arc<dyn Embedder> {
    match &config.embedder_url {
        Some(url) => {
            tracing::info!("Using embedding endpoint {} with model {}", url, config.embedding_model);
            Arc::new(HttpEmbedder::new(
                url.clone(),
                config.embedding_model.clone(),
                config.embedding_dimension,
                config.embedder_api_key.clone(),
            ))
        }
        None => {
            tracing::info!(
                "No embedding endpoint configured, using hashing embedder ({} dimensions)",
                config.embedding_dimension
            );
            Arc::new(HashingEmbedder::with_model(
                config.embedding_dimension,
                config.embedding_model.clone(),
            ))
        }
    }
}
