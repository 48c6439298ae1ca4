//! PlayVault Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playvault_engine::api;
use playvault_engine::app::App;
use playvault_engine::infrastructure::levelup::ResilientLevelUp;
use playvault_engine::infrastructure::memory_store::InMemoryVersionStore;
use playvault_engine::infrastructure::ports::VersionStore;
use playvault_engine::infrastructure::redis_store::RedisVersionStore;
use playvault_engine::infrastructure::settings::{Settings, StoreBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playvault_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PlayVault Engine");

    let settings = Settings::from_env();
    tracing::info!(
        max_attempts = settings.retry.max_attempts,
        base_delay_ms = settings.retry.base_delay_ms,
        jitter_ceiling_ms = settings.retry.jitter_ceiling_ms,
        "Conditional-write retry configured"
    );

    let store: Arc<dyn VersionStore> = match settings.store_backend {
        StoreBackend::Redis => {
            tracing::info!("Connecting to Redis at {}", settings.redis_url);
            let manager = bb8_redis::RedisConnectionManager::new(settings.redis_url.as_str())?;
            let pool = bb8_redis::bb8::Pool::builder()
                .max_size(16)
                .build(manager)
                .await?;
            Arc::new(RedisVersionStore::new(pool, settings.namespace.clone()))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data will not survive a restart");
            Arc::new(InMemoryVersionStore::new())
        }
    };

    // No native level-up module is wired in yet; the local formula answers.
    let levelup = Arc::new(ResilientLevelUp::new(None));
    let app = Arc::new(App::new(store, levelup, settings.retry.clone()));

    let router = api::rpc::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", settings.server_host, settings.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
