//! Inventory Service
//!
//! Multi-tenant warehouse inventory core: stock counters per (warehouse,
//! product, variant), purchase order receiving, inter-warehouse transfers,
//! order reservations and low-stock alerting.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod jobs;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use cache::TwoTierCache;
use events::EventDispatcher;
use services::{ProductLookup, Services};
use store::InventoryStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InventoryStore>,
    pub cache: Arc<TwoTierCache>,
    pub services: Services,
}

impl AppState {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        cache: Arc<TwoTierCache>,
        events: EventDispatcher,
        products: Arc<dyn ProductLookup>,
        reservation_ttl_secs: i64,
    ) -> Self {
        let services = Services::new(
            store.clone(),
            cache.clone(),
            events,
            products,
            reservation_ttl_secs,
        );
        Self {
            store,
            cache,
            services,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route("/health/cache", get(handlers::health::cache_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
