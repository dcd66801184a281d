use std::sync::Arc;

use xigi_core::config::Settings;
use xigi_core::llm::{HttpLlmProvider, LlmProvider, NullLlmProvider};
use xigi_core::profiler::{GoogleMapsClient, LlmProfilerRouter, MapsProvider, NullMapsProvider, ProfilerMode, ProfilerTables, RingEngine};
use xigi_core::store::{Cache, MemoryCache};
use xigi_core::telemetry;

/// Standalone profiler entrypoint: `profiler-cli <lat> <lng> [mode]`, grounded on the
/// same Ring Engine + LLM Profiler Router the HTTP server uses, against an in-process
/// maps client rather than a running database.
#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: profiler-cli <latitude> <longitude> [rules|hybrid|full_llm|research_agent]");
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("latitude must be a number");
    let lng: f64 = args[2].parse().expect("longitude must be a number");
    let mode = args.get(3).map(|m| ProfilerMode::parse(m)).unwrap_or(ProfilerMode::Hybrid);

    let settings = Settings::from_env();
    let tables = Arc::new(ProfilerTables::load(settings.profiler_tables_path.as_deref()).expect("failed to load profiler tables"));
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());

    let maps: Arc<dyn MapsProvider> = if settings.maps_configured() {
        Arc::new(GoogleMapsClient::new(settings.maps_api_key.clone().unwrap(), settings.maps_api_base_url.clone(), cache.clone(), tables.clone()))
    } else {
        Arc::new(NullMapsProvider)
    };

    let llm: Option<Arc<dyn LlmProvider>> = if settings.llm_configured() {
        Some(Arc::new(HttpLlmProvider::new(settings.llm_api_key.clone().unwrap(), settings.llm_api_base_url.clone(), Some(settings.llm_fallback_model.clone()))))
    } else {
        Some(Arc::new(NullLlmProvider))
    };

    let ring_engine = RingEngine::new(maps.clone(), tables.clone());
    let router = LlmProfilerRouter::new(llm, maps, tables, settings.llm_model.clone());

    let (profile, ring1_places) = ring_engine.profile(lat, lng).await;
    let profile = router.apply(mode, profile, &ring1_places).await;

    println!("{}", serde_json::to_string_pretty(&profile).expect("AreaProfile must serialize"));
}
