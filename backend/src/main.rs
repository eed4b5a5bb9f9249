//! Inventory Service - Backend Server
//!
//! Tracks on-hand, reserved and available stock across warehouses for every
//! tenant of the marketplace.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use inventory_service::{
    cache::{RedisTier, TwoTierCache},
    create_app,
    events::EventDispatcher,
    jobs,
    services::NoProductLookup,
    store::{InventoryStore, PgStore},
    AppState, Config,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "inventory_server=debug,inventory_service=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Inventory Service");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.is_development() {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    // Distributed cache tier is optional; fall back to the local tier alone
    let distributed = match &config.redis.url {
        Some(url) => match RedisTier::connect(url, &config.cache.key_prefix).await {
            Ok(tier) => {
                tracing::info!("Redis cache tier connected");
                Some(tier)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, using local cache only");
                None
            }
        },
        None => None,
    };
    let cache = Arc::new(TwoTierCache::new(&config.cache, distributed));

    let events = EventDispatcher::from_config(&config.events)?;
    let store: Arc<dyn InventoryStore> = Arc::new(PgStore::new(db_pool));

    // Create application state
    let state = AppState::new(
        store.clone(),
        cache,
        events,
        Arc::new(NoProductLookup),
        config.reservations.default_ttl_secs,
    );

    let _jobs = jobs::spawn(
        store,
        state.services.reservations.clone(),
        state.services.alerts.clone(),
        &config.jobs,
    );

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
