//! REST API for the product index.
//!
//! One [`AppState`] is built at startup and shared by every handler. Handlers
//! never touch the flat index directly; everything goes through the
//! [`VectorStore`].
//!
//! ## Endpoints
//!
//! - `GET /` - Service banner
//! - `GET /health` - Liveness check
//! - `POST /query` - Semantic product search
//! - `POST /index` - Fetch products from the source and index them
//! - `DELETE /index` - Clear the index
//! - `GET /stats` - Index statistics
//!
//! ## Usage
//!
//! ```rust,no_run
//! use actix_web::{web, App, HttpServer};
//! use prodrag::config::Config;
//! use prodrag::server::AppState;
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = Config::default();
//!     let state = web::Data::new(AppState::from_config(config).unwrap());
//!     HttpServer::new(move || App::new().app_data(state.clone()).configure(prodrag::server::config))
//!         .bind("0.0.0.0:8000")?
//!         .run()
//!         .await
//! }
//! ```

use crate::config::Config;
use crate::embedder;
use crate::error::StoreError;
use crate::source::{self, ProductSource};
use crate::store::{StoreStats, VectorStore};
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a request handler needs, constructed once per process.
pub struct AppState {
    pub store: Arc<VectorStore>,
    pub source: Arc<dyn ProductSource>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<VectorStore>, source: Arc<dyn ProductSource>, config: Config) -> Self {
        Self { store, source, config }
    }

    /// Wires the configured embedder, product source and store together.
    pub fn from_config(config: Config) -> Result<Self, StoreError> {
        tracing::info!(
            "Initializing {} in {} mode...",
            config.service_name,
            config.environment
        );
        let embedder = embedder::from_config(&config);
        let store = Arc::new(VectorStore::open(config.data_dir.clone(), embedder));
        let source = source::from_config(&config)?;
        tracing::info!("Services initialized successfully");

        Ok(Self::new(store, source, config))
    }
}

// --- Request structs ---

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    top_k: Option<usize>,
}

#[derive(Deserialize, Default)]
struct IndexRequest {
    product_ids: Option<Vec<String>>,
}

// --- Response structs ---

#[derive(Serialize)]
struct ServiceInfo<'a> {
    service: &'a str,
    status: &'a str,
    version: &'a str,
    environment: &'a str,
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'a str,
    service: &'a str,
    environment: &'a str,
}

#[derive(Serialize)]
struct ProductContext {
    id: String,
    name: String,
    description: String,
    price: f64,
    category: Option<String>,
    score: f32,
}

#[derive(Serialize)]
struct QueryResponse {
    query: String,
    context: Vec<ProductContext>,
    total_results: usize,
}

#[derive(Serialize)]
struct IndexResponse {
    message: String,
    count: usize,
}

#[derive(Serialize)]
struct StatsResponse<'a> {
    #[serde(flatten)]
    stats: StoreStats,
    service: &'a str,
    environment: &'a str,
}

fn failure(e: &StoreError) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({"detail": e.to_string()}))
}

// --- Handlers ---

async fn root_handler(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ServiceInfo {
        service: &state.config.service_name,
        status: "running",
        version: VERSION,
        environment: &state.config.environment,
    })
}

async fn health_handler(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        service: &state.config.service_name,
        environment: &state.config.environment,
    })
}

async fn query_handler(state: web::Data<AppState>, body: web::Json<QueryRequest>) -> impl Responder {
    let top_k = body.top_k.unwrap_or(state.config.default_top_k);
    if top_k == 0 {
        return HttpResponse::BadRequest().json(serde_json::json!({"detail": "top_k must be positive"}));
    }

    tracing::info!("Querying products: '{}' (top_k={})", body.query, top_k);
    let hits = match state.store.search(&body.query, top_k).await {
        Ok(hits) => hits,
        Err(e) => return failure(&e),
    };

    let context: Vec<ProductContext> = hits
        .into_iter()
        .map(|hit| ProductContext {
            id: hit.product.id,
            name: hit.product.name,
            description: hit.product.description,
            price: hit.product.price,
            category: hit.product.category,
            score: hit.score,
        })
        .collect();

    tracing::info!("Found {} products for query: '{}'", context.len(), body.query);
    let total_results = context.len();
    HttpResponse::Ok().json(QueryResponse {
        query: body.into_inner().query,
        context,
        total_results,
    })
}

/// The body is optional, but one that is present must parse.
fn parse_index_request(body: &[u8]) -> Result<IndexRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(IndexRequest::default());
    }
    serde_json::from_slice(body)
}

async fn index_handler(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let request = match parse_index_request(&body) {
        Ok(request) => request,
        Err(e) => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"detail": format!("Invalid index request: {}", e)}));
        }
    };

    tracing::info!("Starting product indexing from {}...", state.source.name());
    let products = match state.source.get_products(request.product_ids.as_deref()).await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!("Error fetching products: {}", e);
            return failure(&e);
        }
    };

    if products.is_empty() {
        tracing::warn!("No products to index");
        return HttpResponse::Ok().json(IndexResponse {
            message: "No products to index".to_string(),
            count: 0,
        });
    }

    match state.store.index_products(&products).await {
        Ok(count) => HttpResponse::Ok().json(IndexResponse {
            message: "Products indexed successfully".to_string(),
            count,
        }),
        Err(e) => failure(&e),
    }
}

async fn clear_handler(state: web::Data<AppState>) -> impl Responder {
    tracing::warn!("Clearing vector store index...");
    match state.store.clear().await {
        Ok(()) => {
            tracing::info!("Vector store cleared successfully");
            HttpResponse::Ok().json(serde_json::json!({"message": "Index cleared successfully"}))
        }
        Err(e) => failure(&e),
    }
}

async fn stats_handler(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(StatsResponse {
        stats: state.store.stats().await,
        service: &state.config.service_name,
        environment: &state.config.environment,
    })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(root_handler)))
       .service(web::resource("/health").route(web::get().to(health_handler)))
       .service(web::resource("/query").route(web::post().to(query_handler)))
       .service(
           web::resource("/index")
               .route(web::post().to(index_handler))
               .route(web::delete().to(clear_handler)),
       )
       .service(web::resource("/stats").route(web::get().to(stats_handler)));
}

/// Runs the HTTP server until it is shut down.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let address = state.config.bind_address();
    let state = web::Data::new(state);

    tracing::info!("Starting {} on {}", state.config.service_name, address);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(config)
    })
    .bind(address)?
    .run()
    .await
}
