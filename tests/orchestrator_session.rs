//! Scripted multi-turn tests driving `Orchestrator::handle_turn` directly, covering
//! filter stacking (P3), revert (P4), gateway approval (P5) and persona stability (P9).

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use xigi_core::domain::screen::{ProfileStatus, Screen, ScreenHardware, ScreenLocation, ScreenStatus, SlotBooking, SlotEconomics};
use xigi_core::domain::session::Gateway;
use xigi_core::llm::provider::{JsonCompletionRequest, JsonCompletionResponse, LlmProvider};
use xigi_core::orchestrator::{Orchestrator, TurnRequest};
use xigi_core::store::{Cache, MemoryCache, MemoryInventoryStore, MemorySessionStore, ScreenInventoryStore, SessionStore};

fn sample_gateway() -> Gateway {
    Gateway {
        location: vec!["Chennai".to_string()],
        start_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        end_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 31).unwrap(),
        budget_range: "50000".to_string(),
    }
}

/// Inspects the system prompt to route to the right canned response, with a
/// per-call-site override queue for Call-1 so each test controls intent/filters/
/// personas turn by turn. Call-2 and Call-3 get fixed, content-agnostic replies since
/// no test here asserts on ranking scores or reply text.
struct ScriptedLlm {
    call1_queue: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    fn new(call1_responses: Vec<&str>) -> Self {
        Self { call1_queue: Mutex::new(call1_responses.into_iter().map(|s| s.to_string()).collect()) }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete_json(&self, request: JsonCompletionRequest) -> anyhow::Result<JsonCompletionResponse> {
        let system = request.messages.first().map(|m| m.content.as_str()).unwrap_or_default();
        let raw = if system.contains("FILTER MENU:") {
            let mut queue = self.call1_queue.lock().unwrap();
            queue.pop_front().expect("scripted Call-1 response exhausted")
        } else if system.contains("SCREENS:") {
            r#"{"scores":{}}"#.to_string()
        } else {
            r#"{"reply":"noted","quick_replies":["Show me screens","Change location","Start over"]}"#.to_string()
        };
        Ok(JsonCompletionResponse { raw, model_used: request.model, latency_ms: 1 })
    }
}

fn sample_screen(id: Uuid, environment: &str, orientation: &str, city: &str) -> Screen {
    Screen {
        id,
        name: "Test Screen".to_string(),
        location: ScreenLocation {
            city: city.to_string(),
            full_address: format!("Main Road, {city}"),
            nearest_landmark: "City Center".to_string(),
            latitude: 13.04,
            longitude: 80.23,
        },
        hardware: ScreenHardware {
            environment: environment.to_string(),
            orientation: orientation.to_string(),
            resolution_width: None,
            resolution_height: None,
            brightness_nits: None,
            screen_width: None,
            screen_height: None,
            pixel_pitch_mm: None,
            supported_formats: vec![],
            audio_supported: false,
            technology: "LED".to_string(),
        },
        base_price_per_slot: 500.0,
        slots: SlotEconomics { total_slots_per_loop: 20, reserved_slots: 0 },
        status: ScreenStatus::Verified,
        scheduled_block_date: None,
        profile_status: ProfileStatus::Profiled,
        area_profile: None,
        restricted_ad_categories: vec![],
    }
}

fn make_orchestrator(llm: ScriptedLlm, screens: Vec<Screen>) -> Orchestrator {
    let bookings: Vec<SlotBooking> = Vec::new();

    let inventory: std::sync::Arc<dyn ScreenInventoryStore> = std::sync::Arc::new(MemoryInventoryStore::new(screens, bookings));
    let sessions: std::sync::Arc<dyn SessionStore> = std::sync::Arc::new(MemorySessionStore::new());
    let cache: std::sync::Arc<dyn Cache> = std::sync::Arc::new(MemoryCache::new());

    Orchestrator {
        sessions,
        inventory,
        cache,
        llm: std::sync::Arc::new(llm),
        model: "test-model".to_string(),
        hold_expiry: chrono::Duration::minutes(10),
        session_ttl: chrono::Duration::hours(24),
        rate_limit_max: 50,
        rate_limit_window: chrono::Duration::minutes(15),
        noise_terms: vec!["near".to_string(), "city".to_string()],
        turn_locks: dashmap::DashMap::new(),
    }
}

fn call1_json(intent: &str, filters: &str, remove_filters: &str) -> String {
    format!(
        r#"{{"intent":"{intent}","detected_persona":null,"persona_confidence":0.0,"ad_category":null,
           "product_category":null,"brand_objective":null,"target_audience":null,
           "filters":{filters},"exclude":{{}},"text_search":null,"gateway_edits":null,
           "gateway_edit_pending":false,"remove_filters":{remove_filters},"question_to_ask":null,
           "pending_questions":[]}}"#
    )
}

#[tokio::test]
async fn filters_stack_across_turns() {
    let screen = sample_screen(Uuid::new_v4(), "Mall", "Landscape", "Chennai");
    let llm = ScriptedLlm::new(vec![
        &call1_json("screen_search", r#"{"environment":["Mall"]}"#, "[]"),
        &call1_json("refinement", r#"{"orientation":["Landscape"]}"#, "[]"),
    ]);
    let orchestrator = make_orchestrator(llm, vec![screen]);

    let first = orchestrator
        .handle_turn(TurnRequest { session_id: None, user_id: None, campaign_id: "camp-1".to_string(), gateway: Some(sample_gateway()), message: "malls please".to_string(), debug: false })
        .await
        .expect("first turn succeeds");

    let second = orchestrator
        .handle_turn(TurnRequest {
            session_id: Some(first.session_id),
            user_id: None,
            campaign_id: "camp-1".to_string(),
            gateway: None,
            message: "landscape only".to_string(),
            debug: false,
        })
        .await
        .expect("second turn succeeds");

    let session = orchestrator.sessions.load(second.session_id).await.unwrap().expect("session persisted");
    assert!(session.active_filters.contains_key("environment"), "earlier filter must still be stacked");
    assert!(session.active_filters.contains_key("orientation"), "new filter must be stacked alongside it");
}

#[tokio::test]
async fn revert_restores_previous_filter_snapshot() {
    let screen = sample_screen(Uuid::new_v4(), "Mall", "Landscape", "Chennai");
    let llm = ScriptedLlm::new(vec![
        &call1_json("screen_search", r#"{"environment":["Mall"]}"#, "[]"),
        &call1_json("refinement", r#"{"orientation":["Landscape"]}"#, r#"["environment"]"#),
        &call1_json("revert", "{}", "[]"),
    ]);
    let orchestrator = make_orchestrator(llm, vec![screen]);

    let t1 = orchestrator
        .handle_turn(TurnRequest { session_id: None, user_id: None, campaign_id: "camp-1".to_string(), gateway: Some(sample_gateway()), message: "malls".to_string(), debug: false })
        .await
        .unwrap();
    let t2 = orchestrator
        .handle_turn(TurnRequest {
            session_id: Some(t1.session_id),
            user_id: None,
            campaign_id: "camp-1".to_string(),
            gateway: None,
            message: "drop the environment filter, go landscape".to_string(),
            debug: false,
        })
        .await
        .unwrap();

    let mid_session = orchestrator.sessions.load(t2.session_id).await.unwrap().unwrap();
    assert!(!mid_session.active_filters.contains_key("environment"));
    assert!(mid_session.active_filters.contains_key("orientation"));

    orchestrator
        .handle_turn(TurnRequest { session_id: Some(t2.session_id), user_id: None, campaign_id: "camp-1".to_string(), gateway: None, message: "actually revert that".to_string(), debug: false })
        .await
        .unwrap();

    let reverted = orchestrator.sessions.load(t2.session_id).await.unwrap().unwrap();
    assert!(reverted.active_filters.contains_key("environment"), "revert must restore the pre-removal snapshot");
}

#[tokio::test]
async fn gateway_city_requires_confirmation_before_it_becomes_a_target_city() {
    let screen = sample_screen(Uuid::new_v4(), "Mall", "Landscape", "Chennai");
    let llm = ScriptedLlm::new(vec![
        &call1_json("screen_search", r#"{"spec_city":"Chennai"}"#, "[]"),
        &call1_json("screen_search", "{}", "[]"),
    ]);
    let orchestrator = make_orchestrator(llm, vec![screen]);

    let t1 = orchestrator
        .handle_turn(TurnRequest { session_id: None, user_id: None, campaign_id: "camp-1".to_string(), gateway: Some(sample_gateway()), message: "Chennai screens".to_string(), debug: false })
        .await
        .unwrap();

    let after_propose = orchestrator.sessions.load(t1.session_id).await.unwrap().unwrap();
    assert!(after_propose.pending_gateway_edit.is_some(), "a new city must go through the pending-edit gate, not straight into filters");
    assert!(after_propose.campaign_context.target_cities.is_empty());

    orchestrator
        .handle_turn(TurnRequest { session_id: Some(t1.session_id), user_id: None, campaign_id: "camp-1".to_string(), gateway: None, message: "yes, Chennai is right".to_string(), debug: false })
        .await
        .unwrap();

    let approved = orchestrator.sessions.load(t1.session_id).await.unwrap().unwrap();
    assert!(approved.pending_gateway_edit.is_none());
    assert!(approved.campaign_context.target_cities.iter().any(|c| c.eq_ignore_ascii_case("Chennai")));
}

#[tokio::test]
async fn persona_does_not_flip_on_a_single_low_confidence_turn() {
    let screen = sample_screen(Uuid::new_v4(), "Mall", "Landscape", "Chennai");
    let turn1 = r#"{"intent":"screen_search","detected_persona":"agency","persona_confidence":0.9,
        "ad_category":null,"product_category":null,"brand_objective":null,"target_audience":null,
        "filters":{},"exclude":{},"text_search":null,"gateway_edits":null,"gateway_edit_pending":false,
        "remove_filters":[],"question_to_ask":null,"pending_questions":[]}"#;
    let turn2 = r#"{"intent":"screen_search","detected_persona":"business_owner","persona_confidence":0.3,
        "ad_category":null,"product_category":null,"brand_objective":null,"target_audience":null,
        "filters":{},"exclude":{},"text_search":null,"gateway_edits":null,"gateway_edit_pending":false,
        "remove_filters":[],"question_to_ask":null,"pending_questions":[]}"#;
    let llm = ScriptedLlm::new(vec![turn1, turn2]);
    let orchestrator = make_orchestrator(llm, vec![screen]);

    let t1 = orchestrator
        .handle_turn(TurnRequest { session_id: None, user_id: None, campaign_id: "camp-1".to_string(), gateway: Some(sample_gateway()), message: "hello".to_string(), debug: false })
        .await
        .unwrap();
    orchestrator
        .handle_turn(TurnRequest { session_id: Some(t1.session_id), user_id: None, campaign_id: "camp-1".to_string(), gateway: None, message: "still here".to_string(), debug: false })
        .await
        .unwrap();

    let session = orchestrator.sessions.load(t1.session_id).await.unwrap().unwrap();
    assert_eq!(session.persona, Some(xigi_core::domain::intent::Persona::Agency), "a weak, different-persona signal must not flip an established persona");
}

#[tokio::test]
async fn new_session_requires_a_campaign_id() {
    let orchestrator = make_orchestrator(ScriptedLlm::new(vec![]), vec![]);
    let result = orchestrator
        .handle_turn(TurnRequest { session_id: None, user_id: None, campaign_id: "".to_string(), gateway: None, message: "hi".to_string(), debug: false })
        .await;
    assert!(result.is_err());
}
