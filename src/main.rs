use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use xigi_core::config::Settings;
use xigi_core::http::{build_router, AppState};
use xigi_core::llm::{HttpLlmProvider, LlmProvider, NullLlmProvider};
use xigi_core::orchestrator::Orchestrator;
use xigi_core::profiler::{GoogleMapsClient, LlmProfilerRouter, MapsProvider, NullMapsProvider, ProfilerMode, ProfilerTables, RingEngine};
use xigi_core::store::{Cache, MemoryCache, PgInventoryStore, PgSessionStore, ScreenInventoryStore, SessionStore};
use xigi_core::telemetry;

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let settings = Settings::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await
        .expect("Failed to create database pool");

    let tables = Arc::new(ProfilerTables::load(settings.profiler_tables_path.as_deref()).expect("failed to load profiler tables"));
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());

    let maps: Arc<dyn MapsProvider> = if settings.maps_configured() {
        Arc::new(GoogleMapsClient::new(
            settings.maps_api_key.clone().unwrap(),
            settings.maps_api_base_url.clone(),
            cache.clone(),
            tables.clone(),
        ))
    } else {
        Arc::new(NullMapsProvider)
    };

    let llm: Arc<dyn LlmProvider> = if settings.llm_configured() {
        Arc::new(HttpLlmProvider::new(
            settings.llm_api_key.clone().unwrap(),
            settings.llm_api_base_url.clone(),
            Some(settings.llm_fallback_model.clone()),
        ))
    } else {
        Arc::new(NullLlmProvider)
    };

    let inventory: Arc<dyn ScreenInventoryStore> = Arc::new(PgInventoryStore::new(pool.clone()));
    let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool.clone()));

    let ring_engine = Arc::new(RingEngine::new(maps.clone(), tables.clone()));
    let profiler_router = Arc::new(LlmProfilerRouter::new(Some(llm.clone()), maps.clone(), tables.clone(), settings.llm_model.clone()));

    let orchestrator = Arc::new(Orchestrator {
        sessions: sessions.clone(),
        inventory: inventory.clone(),
        cache: cache.clone(),
        llm: llm.clone(),
        model: settings.llm_model.clone(),
        hold_expiry: chrono::Duration::from_std(settings.hold_expiry).unwrap(),
        session_ttl: chrono::Duration::from_std(settings.session_ttl).unwrap(),
        rate_limit_max: settings.rate_limit_max_messages,
        rate_limit_window: chrono::Duration::from_std(settings.rate_limit_window).unwrap(),
        noise_terms: tables.location_noise_terms.clone(),
        turn_locks: dashmap::DashMap::new(),
    });

    let state = AppState {
        orchestrator,
        ring_engine,
        profiler_router,
        profiler_mode: ProfilerMode::Hybrid,
        inventory,
        llm,
        llm_model: settings.llm_model.clone(),
        maps,
        cache,
        sessions,
        tables,
    };

    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    info!("Starting server on {}", addr);
    info!("Server ready: http://{}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
