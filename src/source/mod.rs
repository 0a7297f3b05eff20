//! Where product rows come from.
//!
//! Two interchangeable sources implement [`ProductSource`]: the catalog's own
//! relational database and the product service's REST API. One is chosen at
//! startup and shared by every request.

pub mod local;
pub mod remote;

use crate::config::Config;
use crate::error::StoreError;
use crate::metadata::ProductRecord;
use std::sync::Arc;

pub use local::LocalStoreFetcher;
pub use remote::RemoteServiceFetcher;

#[async_trait::async_trait]
pub trait ProductSource: Send + Sync {
    /// Fetches every product when `ids` is `None`, otherwise the given subset.
    /// Ids that cannot be resolved are skipped, not reported.
    async fn get_products(&self, ids: Option<&[String]>) -> Result<Vec<ProductRecord>, StoreError>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Builds the configured source: the REST API when `PRODUCT_SERVICE_URL` is
/// set, the database at `DATABASE_URL` otherwise.
pub fn from_config(config: &Config) -> Result<Arc<dyn ProductSource>, StoreError> {
    match &config.product_service_url {
        Some(url) => {
            tracing::info!("Fetching products from product service at {}", url);
            Ok(Arc::new(RemoteServiceFetcher::new(url.clone())))
        }
        None => {
            tracing::info!("Fetching products from database {}", config.database_url);
            Ok(Arc::new(LocalStoreFetcher::open(&config.database_url)?))
        }
    }
}
