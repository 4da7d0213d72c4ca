//! Storefront API - products, reviews, orders, collections and favorites

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_api::api::{self, AppState, SERVICE_NAME};
use storefront_api::config::Config;
use storefront_api::publisher::EventPublisher;
use storefront_api::store::{MemoryStore, PgStore, Store};
use storefront_api::Shop;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(config.max_connections).connect(url).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = ?e, "could not reach NATS, domain events will only be logged");
                None
            }
        },
        None => None,
    };

    let shop = Shop::new(store, EventPublisher::new(nats));
    let app = api::router(AppState::new(shop));

    let addr = config.bind_addr();
    tracing::info!("🚀 {} listening on {}", SERVICE_NAME, addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
