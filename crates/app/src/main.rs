use std::{net::SocketAddr, sync::Arc, time::Duration};

use engine::{CacheStore, CacheTtl, MemoryCache, RedisCache};
use migration::{Migrator, MigratorTrait};
use settings::{CacheBackend, Database};

mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spendwise={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;
    let cache = parse_cache(&settings.cache.backend)?;
    let ttl = CacheTtl {
        report: Duration::from_secs(settings.cache.report_ttl_secs),
        alert: Duration::from_secs(settings.cache.alert_ttl_secs),
    };

    let engine = engine::Engine::builder()
        .database(db)
        .cache_store(cache.clone())
        .ttl(ttl)
        .build()
        .await?;

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, settings.server.port).parse()?;
    server::run(engine, addr, shutdown_signal()).await;

    tracing::info!("closing cache client");
    cache.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn parse_database(config: &Database) -> Result<sea_orm::DatabaseConnection, BoxError> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

fn parse_cache(config: &CacheBackend) -> Result<Arc<dyn CacheStore>, BoxError> {
    let store: Arc<dyn CacheStore> = match config {
        CacheBackend::Memory => {
            tracing::info!("using in-process cache");
            Arc::new(MemoryCache::new())
        }
        CacheBackend::Redis(url) => {
            tracing::info!("using redis cache");
            Arc::new(RedisCache::connect(url)?)
        }
    };
    Ok(store)
}
