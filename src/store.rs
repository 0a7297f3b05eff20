//! The vector store module
//! Ties the embedder, flat index, metadata store and persistence together

use crate::embedder::Embedder;
use crate::error::StoreError;
use crate::index::FlatIndex;
use crate::metadata::{MetadataStore, ProductRecord};
use crate::persistence::Persistence;
use crate::vector::similarity_from_distance;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One search result: the stored product and its similarity in `(0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub product: ProductRecord,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_products: usize,
    pub dimension: usize,
    pub model: String,
    pub data_directory: String,
}

/// Index and records always change together under the write guard.
struct StoreState {
    index: FlatIndex,
    records: MetadataStore,
}

pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    persistence: Persistence,
    state: RwLock<StoreState>,
}

impl VectorStore {
    /// Opens the store rooted at `data_dir`, restoring the last snapshot.
    ///
    /// The vector dimension is taken from the embedder. A missing or unreadable
    /// snapshot gives an empty store rather than an error.
    pub fn open(data_dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> VectorStore {
        let persistence = Persistence::new(data_dir);
        let loaded = persistence.load(embedder.dimension());
        tracing::info!(
            "Vector store ready at {} with {} products (model {}, {} dimensions)",
            persistence.root().display(),
            loaded.index.count(),
            embedder.model(),
            embedder.dimension()
        );

        VectorStore {
            embedder,
            persistence,
            state: RwLock::new(StoreState {
                index: loaded.index,
                records: loaded.records,
            }),
        }
    }

    /// Embeds and appends `products`, then snapshots the store.
    ///
    /// Returns how many products were indexed. An empty batch is a no-op that
    /// neither embeds nor saves. Any failure is logged and reported as a single
    /// `Operation` error; a failed batch never leaves half of itself behind in
    /// memory.
    pub async fn index_products(&self, products: &[ProductRecord]) -> Result<usize, StoreError> {
        if products.is_empty() {
            return Ok(0);
        }

        tracing::info!("Creating embeddings for {} products...", products.len());
        match self.try_index(products).await {
            Ok(count) => {
                tracing::info!("Successfully indexed {} products", count);
                Ok(count)
            }
            Err(e) => {
                tracing::error!("Error indexing products: {}", e);
                Err(StoreError::operation("index_products", e))
            }
        }
    }

    async fn try_index(&self, products: &[ProductRecord]) -> Result<usize, StoreError> {
        let texts: Vec<String> = products.iter().map(ProductRecord::searchable_text).collect();
        let vectors = self.embedder.encode(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(StoreError::Embedder(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        let mut state = self.state.write().await;
        // Validates every vector before touching anything, keeping both sides aligned
        state.index.append(&vectors)?;
        state.records.append(products);
        self.persistence.save(&state.index, &state.records)?;

        Ok(products.len())
    }

    /// Returns up to `top_k` products closest to `query`, best first.
    ///
    /// An empty store answers immediately without calling the embedder.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, StoreError> {
        let state = self.state.read().await;
        if state.index.count() == 0 {
            return Ok(Vec::new());
        }

        self.rank(&state, query, top_k).await.map_err(|e| {
            tracing::error!("Error searching products: {}", e);
            StoreError::operation("search", e)
        })
    }

    async fn rank(&self, state: &StoreState, query: &str, top_k: usize) -> Result<Vec<SearchHit>, StoreError> {
        let mut vectors = self.embedder.encode(&[query.to_string()]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| StoreError::Embedder("No embedding returned for query".to_string()))?;

        state
            .index
            .search(&query_vector, top_k)?
            .into_iter()
            .map(|(position, distance)| {
                Ok(SearchHit {
                    product: state.records.get(position)?.clone(),
                    score: similarity_from_distance(distance),
                })
            })
            .collect()
    }

    /// Empties the store and persists the empty state.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.index.clear();
        state.records.clear();

        self.persistence
            .save(&state.index, &state.records)
            .map_err(|e| {
                tracing::error!("Error clearing index: {}", e);
                StoreError::operation("clear", e)
            })
    }

    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        StoreStats {
            total_products: state.index.count(),
            dimension: state.index.dimension(),
            model: self.embedder.model().to_string(),
            data_directory: self.persistence.root().display().to_string(),
        }
    }

    /// Returns the number of indexed products.
    pub async fn count(&self) -> usize {
        self.state.read().await.index.count()
    }
}
