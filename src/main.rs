use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use lume_discovery::config::{Settings, StorageBackend};
use lume_discovery::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState};
use lume_discovery::services::{
    CacheManager, CachedPhotoStore, DiscoveryService, HttpNotifier, LogNotifier, MemoryStore,
    Notifier, PgStore, Stores,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(settings: &Settings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn io_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

async fn build_cache(settings: &Settings) -> Arc<CacheManager> {
    let ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let Some(redis_url) = &settings.cache.redis_url else {
        info!("Cache manager initialized without Redis (L1: {} entries, TTL: {}s)", l1_size, ttl);
        return Arc::new(CacheManager::local(l1_size, ttl));
    };

    match CacheManager::new(redis_url, l1_size, ttl).await {
        Ok(cache) => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s, Redis L2)", l1_size, ttl);
            Arc::new(cache)
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), running with in-process cache only", e);
            Arc::new(CacheManager::local(l1_size, ttl))
        }
    }
}

fn build_notifier(settings: &Settings) -> std::io::Result<Arc<dyn Notifier>> {
    match &settings.notifications.endpoint {
        Some(endpoint) => {
            let notifier = HttpNotifier::new(
                endpoint,
                settings.notifications.api_key.clone(),
                Duration::from_secs(settings.notifications.timeout_secs),
            )
            .map_err(|e| io_error("Notifier setup failed", e))?;
            info!("Notifications go to {}", endpoint);
            Ok(Arc::new(notifier))
        }
        None => {
            info!("No notification endpoint configured, notifications are logged only");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| io_error("Configuration error", e))?;
    init_tracing(&settings);

    info!("Starting Lume discovery service...");

    let notifier = build_notifier(&settings)?;
    let cache = build_cache(&settings).await;

    let (stores, database) = match settings.storage.backend {
        StorageBackend::Postgres => {
            let max_conn = settings.database.max_connections.unwrap_or(10);
            let min_conn = settings.database.min_connections.unwrap_or(1);
            let store = PgStore::connect(
                &settings.database.url,
                max_conn,
                min_conn,
                settings.database.acquire_timeout(),
                settings.database.idle_timeout(),
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                io_error("PostgreSQL connection error", e)
            })?;
            info!("PostgreSQL store initialized (max: {} connections)", max_conn);

            let store = Arc::new(store);
            (Stores::from_store(store.clone(), notifier), Some(store))
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store, data is lost on restart");
            (Stores::from_store(Arc::new(MemoryStore::new()), notifier), None)
        }
    };

    let photos = Arc::new(CachedPhotoStore::new(stores.photos.clone(), cache));
    let stores = stores.with_photos(photos);

    let options = settings.discovery_options();
    info!("Discovery initialized with weights: {:?}", options.weights);

    let app_state = AppState {
        service: Arc::new(DiscoveryService::new(stores, options)),
        database,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
