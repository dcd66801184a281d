//! End-to-end HTTP smoke tests against the real router, wired to in-memory stores and
//! `Null*` providers so no network or database is required.

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;

use xigi_core::domain::screen::{ProfileStatus, Screen, ScreenHardware, ScreenLocation, ScreenStatus, SlotBooking, SlotEconomics};
use xigi_core::http::{build_router, AppState};
use xigi_core::llm::NullLlmProvider;
use xigi_core::orchestrator::Orchestrator;
use xigi_core::profiler::{LlmProfilerRouter, NullMapsProvider, ProfilerMode, ProfilerTables, RingEngine};
use xigi_core::store::{Cache, MemoryCache, MemoryInventoryStore, MemorySessionStore, ScreenInventoryStore, SessionStore};

fn sample_screen() -> Screen {
    Screen {
        id: Uuid::new_v4(),
        name: "Anna Salai LED".to_string(),
        location: ScreenLocation {
            city: "Chennai".to_string(),
            full_address: "Anna Salai, Chennai".to_string(),
            nearest_landmark: "Gemini Flyover".to_string(),
            latitude: 13.0604,
            longitude: 80.2496,
        },
        hardware: ScreenHardware {
            environment: "Outdoor".to_string(),
            orientation: "Landscape".to_string(),
            resolution_width: Some(1920),
            resolution_height: Some(1080),
            brightness_nits: Some(5000),
            screen_width: None,
            screen_height: None,
            pixel_pitch_mm: None,
            supported_formats: vec!["mp4".to_string()],
            audio_supported: false,
            technology: "LED".to_string(),
        },
        base_price_per_slot: 1200.0,
        slots: SlotEconomics { total_slots_per_loop: 20, reserved_slots: 2 },
        status: ScreenStatus::Verified,
        scheduled_block_date: None,
        profile_status: ProfileStatus::Profiled,
        area_profile: None,
        restricted_ad_categories: vec![],
    }
}

fn test_server() -> TestServer {
    let tables = Arc::new(ProfilerTables::load(None).expect("bundled profiler tables must parse"));
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
    let maps = Arc::new(NullMapsProvider);
    let llm: Arc<dyn xigi_core::llm::provider::LlmProvider> = Arc::new(NullLlmProvider);

    let screens = vec![sample_screen()];
    let bookings: Vec<SlotBooking> = Vec::new();
    let inventory: Arc<dyn ScreenInventoryStore> = Arc::new(MemoryInventoryStore::new(screens, bookings));
    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());

    let ring_engine = Arc::new(RingEngine::new(maps.clone(), tables.clone()));
    let profiler_router = Arc::new(LlmProfilerRouter::new(Some(llm.clone()), maps.clone(), tables.clone(), "test-model".to_string()));

    let orchestrator = Arc::new(Orchestrator {
        sessions: sessions.clone(),
        inventory: inventory.clone(),
        cache: cache.clone(),
        llm: llm.clone(),
        model: "test-model".to_string(),
        hold_expiry: chrono::Duration::minutes(10),
        session_ttl: chrono::Duration::hours(24),
        rate_limit_max: 50,
        rate_limit_window: chrono::Duration::minutes(15),
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
        llm_model: "test-model".to_string(),
        maps,
        cache,
        sessions,
        tables,
    };

    TestServer::new(build_router(state)).expect("test server must build")
}

#[tokio::test]
async fn healthz_reports_healthy() {
    let server = test_server();
    let response = server.get("/healthz").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn discover_returns_the_seeded_screen_with_no_filters() {
    let server = test_server();
    let response = server
        .post("/discover")
        .json(&json!({
            "locations": [],
            "start": "2026-08-01",
            "end": "2026-08-31",
            "budget": 100000.0,
            "xia_filters": {},
            "excludes": {},
            "text_search": null,
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["screens"].as_array().map(|s| !s.is_empty()).unwrap_or(false), "seeded screen must come back: {body}");
}

#[tokio::test]
async fn discover_flags_screens_outside_the_budget_as_unavailable() {
    let server = test_server();
    let response = server
        .post("/discover")
        .json(&json!({
            "locations": [],
            "start": "2026-08-01",
            "end": "2026-08-31",
            "budget": 1.0,
            "xia_filters": {},
            "excludes": {},
            "text_search": null,
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["available_screens"], 0, "a 1-rupee budget must leave nothing available: {body}");
    let screens = body["screens"].as_array().expect("screens array");
    assert_eq!(screens.len(), 1, "the screen itself is still reported, just flagged unavailable: {body}");
    assert_eq!(screens[0]["availability"]["is_available"], false);
}

#[tokio::test]
async fn screen_profile_returns_a_profile_for_a_coordinate() {
    let server = test_server();
    let response = server
        .post("/screen-profile")
        .json(&json!({ "latitude": 13.06, "longitude": 80.25, "mode": "rules" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body.get("metadata").is_some(), "AreaProfile must carry its ProfileMetadata: {body}");
}

#[tokio::test]
async fn screen_profile_by_id_404s_for_an_unknown_screen() {
    let server = test_server();
    let response = server.get(&format!("/screen-profile/{}", Uuid::new_v4())).await;
    response.assert_status_not_found();
}
