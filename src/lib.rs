//! # prodrag - Semantic Product Search
//!
//! prodrag turns catalog products into embedding vectors, keeps them in an
//! exact flat index next to the product records, and answers free-text
//! queries with the nearest products and a similarity score in `(0, 1]`.
//! The index and records are snapshotted to disk after every change and
//! restored on startup.
//!
//! ## Example
//!
//! ```
//! use prodrag::{HashingEmbedder, ProductRecord, VectorStore};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dir = tempfile::tempdir().unwrap();
//! let store = VectorStore::open(dir.path(), Arc::new(HashingEmbedder::new(64)));
//!
//! let lamp = ProductRecord {
//!     id: "1".to_string(),
//!     name: "Desk lamp".to_string(),
//!     description: "Adjustable LED lamp".to_string(),
//!     price: 24.0,
//!     category: Some("Lighting".to_string()),
//!     category_description: None,
//!     stock: Some(10),
//! };
//! store.index_products(&[lamp]).await.unwrap();
//!
//! let hits = store.search("led lamp", 3).await.unwrap();
//! assert_eq!(hits[0].product.id, "1"); // Only product in the store
//! # }
//! ```

pub mod config;
pub mod embedder;
pub mod error;
pub mod index;
pub mod metadata;
pub mod persistence;
pub mod server;
pub mod source;
pub mod store;
pub mod vector;

// Re-export the main types as the primary public API
pub use embedder::{Embedder, HashingEmbedder, HttpEmbedder};
pub use error::StoreError;
pub use index::FlatIndex;
pub use metadata::{MetadataStore, ProductRecord};
pub use source::{LocalStoreFetcher, ProductSource, RemoteServiceFetcher};
pub use store::{SearchHit, StoreStats, VectorStore};
