use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::filters::{is_placeholder, FilterValue};
use crate::domain::intent::{Intent, Persona};
use crate::domain::screen::Screen;
use crate::domain::session::{ChatSession, Gateway, GatewayEdits, GatewaySnapshot, MessageLogEntry, PendingGatewayEdit};
use crate::discovery::{self, discover_engine::DiscoverParams, DiscoverResult};
use crate::error::CoreError;
use crate::llm::call1_understanding::{self, Call1Result};
use crate::llm::call2_ranking::{self, RankedScreen};
use crate::llm::call3_response::{self, Call3Result, ResponseInput};
use crate::llm::provider::LlmProvider;
use crate::store::{Cache, ScreenInventoryStore, SessionStore};

use super::rate_limit;

const MAX_MESSAGE_CHARS: usize = 2000;
const PERSONA_SWITCH_CONFIDENCE_GAP: f32 = 0.20;
const PERSONA_SWITCH_ABSOLUTE: f32 = 0.80;
const PERSONA_CONFIDENCE_BOOST: f32 = 0.05;
const QUESTION_ATTEMPT_CAP: u32 = 2;

const BUDGET_KEYWORDS: &[&str] = &["my budget", "i have", "can spend", "budget is", "spending"];
const PRICE_KEYWORDS: &[&str] = &["per slot", "slot price", "per screen"];
const REJECTION_SIGNALS: &[&str] = &["no", "don't", "dont", "cancel", "keep current", "skip", "remove"];

pub struct Orchestrator {
    pub sessions: Arc<dyn SessionStore>,
    pub inventory: Arc<dyn ScreenInventoryStore>,
    pub cache: Arc<dyn Cache>,
    pub llm: Arc<dyn LlmProvider>,
    pub model: String,
    pub hold_expiry: chrono::Duration,
    pub session_ttl: chrono::Duration,
    pub rate_limit_max: u32,
    pub rate_limit_window: chrono::Duration,
    pub noise_terms: Vec<String>,
    /// Per-session turn lock (spec.md §5: "a session's turns must be serialized").
    /// Keyed by session id so unrelated sessions never contend; entries are cheap
    /// `Mutex<()>` handles cloned out from behind a `DashMap`, same shape the teacher
    /// uses for its own process-local keyed state.
    pub turn_locks: dashmap::DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>,
}

pub struct TurnRequest {
    pub session_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub campaign_id: String,
    pub gateway: Option<Gateway>,
    pub message: String,
    pub debug: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TurnResult {
    pub session_id: Uuid,
    pub reply: String,
    pub quick_replies: Vec<String>,
    pub intent: Intent,
    pub screens: Vec<RankedScreenView>,
    pub discovery_complete: bool,
    pub pending_gateway_edit: Option<PendingGatewayEdit>,
    pub total_screens_found: u32,
    pub available_screens: u32,
    pub debug: Option<serde_json::Value>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedScreenView {
    pub screen: Screen,
    pub available_slots: i32,
    pub is_available: bool,
    pub relevance_score: f32,
    pub score_rubric: call2_ranking::ScoreBreakdown,
}

impl Orchestrator {
    /// Runs the full per-turn pipeline (C12, spec.md §4.12). Serializes turns for a
    /// single session behind a keyed lock (spec.md §5) so two concurrent `/chat` calls
    /// for the same session can never load-mutate-save independently of each other.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResult, CoreError> {
        let now = Utc::now();
        let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);

        let lock = self.turn_locks.entry(session_id).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone();
        let _turn_guard = lock.lock().await;

        let mut session = match self.sessions.load_if_fresh(session_id, self.session_ttl).await.map_err(CoreError::Internal)? {
            Some(existing) => existing,
            None => {
                if request.campaign_id.trim().is_empty() {
                    return Err(CoreError::InputInvalid("campaign_id is required to start a new session".to_string()));
                }
                let gateway = request.gateway.as_ref().ok_or_else(|| {
                    CoreError::InputInvalid("a complete gateway (location, start_date, end_date, budget_range) is required to start a new session".to_string())
                })?;
                if gateway.location.is_empty() {
                    return Err(CoreError::InputInvalid("gateway.location must name at least one city".to_string()));
                }
                if gateway.end_date < gateway.start_date {
                    return Err(CoreError::InputInvalid("gateway.end_date must not precede gateway.start_date".to_string()));
                }

                let mut session = ChatSession::new(session_id, now);
                session.user_id = request.user_id.clone();
                session.campaign_context.target_cities = gateway.location.clone();
                session.campaign_context.start_date = Some(gateway.start_date);
                session.campaign_context.end_date = Some(gateway.end_date);
                session.campaign_context.budget_range = Some(gateway.budget_range.clone());
                session
            }
        };

        rate_limit::check_and_record(&mut session, now, self.rate_limit_max, self.rate_limit_window)?;

        let sanitized_message = sanitize_input(&request.message);

        let menu = discovery::filter_menu::build(&self.inventory, &self.cache).await.map_err(CoreError::Internal)?;

        let hint = call1_understanding::next_question_topic(&session);
        let (mut call1, used_fallback) = call1_understanding::run(
            self.llm.as_ref(),
            &self.model,
            &session,
            &menu.to_json(),
            &session.active_filters,
            hint,
            &sanitized_message,
        )
        .await;

        // Step 1: placeholder cleanup.
        strip_placeholders(&mut call1);

        // Step 2: revert handling.
        if matches!(call1.intent, Intent::Revert) {
            session.revert_filters();
            call1.filters = serde_json::Value::Object(Default::default());
            call1.exclude = serde_json::Value::Object(Default::default());
        }

        // Step 3: show-all safety net.
        if matches!(call1.intent, Intent::ShowAll) && !call1.remove_filters.iter().any(|f| f == "__all__") {
            call1.remove_filters.push("__all__".to_string());
        }

        // Step 4: filter removal (snapshot first).
        if !call1.remove_filters.is_empty() {
            session.snapshot_filters();
            if call1.remove_filters.iter().any(|f| f == "__all__") {
                session.active_filters.clear();
            } else {
                for key in &call1.remove_filters {
                    session.active_filters.remove(key);
                }
            }
        }

        let mut new_filters = crate::domain::filters::strip_placeholder_filters(&call1.filters);
        let excludes = crate::domain::filters::strip_placeholder_filters(&call1.exclude);

        // Step 5: non-gateway city interceptor.
        if let Some(FilterValue::Scalar(city)) = new_filters.get("spec_city").cloned() {
            let already_gateway = session.campaign_context.target_cities.iter().any(|c| c.eq_ignore_ascii_case(&city));
            if !already_gateway {
                new_filters.remove("spec_city");
                let edits = call1.gateway_edits.get_or_insert_with(GatewayEdits::default);
                edits.gateway_location_add = Some(city);
                call1.gateway_edit_pending = true;
            }
        }

        // Step 6: enum validity check.
        for field in discovery::filter_menu::ENUM_FIELDS {
            if let Some(FilterValue::EnumList(values)) = new_filters.get(*field).cloned() {
                let kept: Vec<String> = values.into_iter().filter(|v| menu.enum_contains(field, v)).collect();
                if kept.is_empty() {
                    new_filters.remove(*field);
                } else {
                    new_filters.insert(field.to_string(), FilterValue::EnumList(kept));
                }
            }
        }

        // Step 7: budget interceptor.
        if let Some(value) = new_filters.get("base_price_per_slot_inr").cloned() {
            let lower_message = sanitized_message.to_lowercase();
            let has_budget_kw = BUDGET_KEYWORDS.iter().any(|k| lower_message.contains(k));
            let has_price_kw = PRICE_KEYWORDS.iter().any(|k| lower_message.contains(k));

            if has_budget_kw && !has_price_kw {
                new_filters.remove("base_price_per_slot_inr");
                if let FilterValue::Numeric(op) = value {
                    let edits = call1.gateway_edits.get_or_insert_with(GatewayEdits::default);
                    edits.gateway_budget_range = Some(op.value().to_string());
                }
            } else if !has_price_kw {
                new_filters.remove("base_price_per_slot_inr");
                call1.intent = Intent::NeedsMoreInfo;
                call1.question_to_ask =
                    Some("Is that your total campaign budget, or the price you're willing to pay per slot?".to_string());
            }
        }

        // Step 8: filter stacking.
        for (key, value) in new_filters {
            session.active_filters.insert(key, value);
        }

        // Step 9: gateway-edit state machine.
        let lower_message = sanitized_message.to_lowercase();
        if let Some(pending) = session.pending_gateway_edit.clone() {
            let rejected = REJECTION_SIGNALS.iter().any(|s| lower_message.contains(s)) || matches!(call1.intent, Intent::StartOver);
            if rejected {
                session.pending_gateway_edit = None;
            } else if let Some(edits) = &call1.gateway_edits {
                apply_gateway_edits(&mut session, edits);
                session.pending_gateway_edit = None;
                call1.intent = Intent::ScreenSearch;
            } else {
                apply_gateway_edits(&mut session, &pending.edits);
                session.pending_gateway_edit = None;
                call1.intent = Intent::ScreenSearch;
            }
        } else if let Some(edits) = &call1.gateway_edits {
            // Drop a proposed `gateway_location_add` that's already in the gateway
            // before deciding whether there's anything left to propose.
            let mut filtered = edits.clone();
            if let Some(city) = &filtered.gateway_location_add {
                if session.campaign_context.target_cities.iter().any(|c| c.eq_ignore_ascii_case(city)) {
                    filtered.gateway_location_add = None;
                }
            }
            if !filtered.is_empty() {
                session.pending_gateway_edit = Some(PendingGatewayEdit { edits: filtered, proposed_at: now });
                call1.gateway_edit_pending = true;
            }
        }

        // Step 10: pipeline flags.
        let skip_ranking = call1.intent.skips_ranking();
        let suppress_screens = call1.intent.suppresses_screens();

        // Step 11: campaign-context accumulation.
        if let Some(v) = &call1.ad_category {
            if !is_placeholder(v) {
                session.campaign_context.ad_category = Some(v.clone());
            }
        }
        if let Some(v) = &call1.product_category {
            if !is_placeholder(v) {
                session.campaign_context.product_category = Some(v.clone());
            }
        }
        if let Some(v) = &call1.brand_objective {
            if !is_placeholder(v) {
                session.campaign_context.brand_objective = parse_brand_objective(v);
            }
        }
        if let Some(v) = &call1.target_audience {
            if !is_placeholder(v) {
                session.campaign_context.target_audience = Some(v.clone());
            }
        }
        // The three-topic gate (spec.md §8 P8) deliberately excludes product_category:
        // it accumulates alongside the gate but never blocks it.
        let core_complete = session.campaign_context.ad_category.is_some()
            && session.campaign_context.brand_objective.is_some()
            && session.campaign_context.target_audience.is_some();
        if core_complete {
            session.discovery_complete = true;
            call1.question_to_ask = None;
        }

        // Step 12: persona anti-flicker.
        if let Some(candidate) = call1.detected_persona {
            apply_persona(&mut session, candidate, call1.persona_confidence);
        }

        // Step 13: question-attempt throttle.
        let question_to_ask = throttle_question(&mut session, call1.question_to_ask.take(), &call1.pending_questions);

        // Step 14: start-over.
        if matches!(call1.intent, Intent::StartOver) {
            session.start_over();
        }

        // Discover always runs.
        let locations = session.campaign_context.target_cities.clone();
        let start = session.campaign_context.start_date.unwrap_or_else(|| (now + chrono::Duration::days(1)).date_naive());
        let end = session.campaign_context.end_date.unwrap_or_else(|| (now + chrono::Duration::days(8)).date_naive());
        let budget = session
            .campaign_context
            .budget_range
            .as_deref()
            .and_then(parse_budget_to_amount)
            .unwrap_or(50_000.0);

        let discover_result = discovery::discover(
            &self.inventory,
            &menu,
            &self.noise_terms,
            self.hold_expiry,
            DiscoverParams {
                locations,
                start,
                end,
                budget,
                xia_filters: &session.active_filters,
                excludes: &excludes,
                text_search: call1.text_search.as_deref(),
            },
        )
        .await
        .map_err(CoreError::Internal)?;

        // Rank runs iff not skipped and >=2 screens.
        let ranked: Vec<RankedScreen> = if !skip_ranking && discover_result.screens.len() >= 2 {
            let campaign_json = serde_json::to_string(&session.campaign_context).unwrap_or_default();
            let screens: Vec<Screen> = discover_result.screens.iter().map(|d| d.screen.clone()).collect();
            call2_ranking::run(self.llm.as_ref(), &self.model, &campaign_json, &screens).await
        } else {
            Vec::new()
        };

        let views = merge_ranking(&discover_result, &ranked);

        let recent_history: Vec<String> = session.messages.iter().rev().take(10).rev().map(|m| m.content.clone()).collect();
        let campaign_state_json = serde_json::to_string(&session.campaign_context).unwrap_or_default();
        let gateway_json = serde_json::to_string(&session.pending_gateway_edit).unwrap_or_default();
        let unavailability_json = serde_json::to_string(&discover_result.unavailability_breakdown).unwrap_or_default();

        let response_input = ResponseInput {
            intent: call1.intent,
            persona: session.persona,
            suppress_screens,
            user_message: &sanitized_message,
            recent_history: &recent_history,
            campaign_state_json: &campaign_state_json,
            question_to_ask: question_to_ask.as_deref(),
            discovery_complete: session.discovery_complete,
            total_screens_found: discover_result.total_screens_found,
            available_screens: discover_result.available_screens,
            gateway_json: &gateway_json,
            unavailability_breakdown_json: &unavailability_json,
        };
        let response: Call3Result = call3_response::run(self.llm.as_ref(), &self.model, &response_input).await;

        // Append the turn to the message log and persist.
        session.messages.push(MessageLogEntry { role: "user".to_string(), content: sanitized_message.clone(), at: now });
        session.messages.push(MessageLogEntry { role: "assistant".to_string(), content: response.reply.clone(), at: now });
        session.updated_at = now;

        let debug = request.debug.then(|| {
            serde_json::json!({
                "usedLlmFallback": used_fallback,
                "intent": call1.intent,
                "skipRanking": skip_ranking,
                "suppressScreens": suppress_screens,
            })
        });

        let pending_gateway_edit = session.pending_gateway_edit.clone();
        self.sessions.save(&session).await.map_err(CoreError::Internal)?;

        Ok(TurnResult {
            session_id: session.id,
            reply: response.reply,
            quick_replies: response.quick_replies,
            intent: call1.intent,
            screens: if suppress_screens { Vec::new() } else { views },
            discovery_complete: session.discovery_complete,
            pending_gateway_edit,
            total_screens_found: discover_result.total_screens_found,
            available_screens: discover_result.available_screens,
            debug,
        })
    }
}

static HTML_TAG: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

/// Strips HTML-like tags and truncates to 2000 chars (spec §4.12 input sanitization).
fn sanitize_input(raw: &str) -> String {
    let re = HTML_TAG.get_or_init(|| regex::Regex::new(r"</?[a-zA-Z!][^>]*>").expect("static pattern compiles"));
    let stripped = re.replace_all(raw, "");
    stripped.chars().take(MAX_MESSAGE_CHARS).collect()
}

fn strip_placeholders(call1: &mut Call1Result) {
    if let Some(v) = &call1.ad_category {
        if is_placeholder(v) {
            call1.ad_category = None;
        }
    }
    if let Some(v) = &call1.product_category {
        if is_placeholder(v) {
            call1.product_category = None;
        }
    }
    if let Some(v) = &call1.brand_objective {
        if is_placeholder(v) {
            call1.brand_objective = None;
        }
    }
    if let Some(v) = &call1.target_audience {
        if is_placeholder(v) {
            call1.target_audience = None;
        }
    }
    if let Some(v) = &call1.text_search {
        if is_placeholder(v) {
            call1.text_search = None;
        }
    }
}

fn apply_gateway_edits(session: &mut ChatSession, edits: &GatewayEdits) {
    if let Some(city) = &edits.gateway_location_add {
        if !session.campaign_context.target_cities.iter().any(|c| c.eq_ignore_ascii_case(city)) {
            session.campaign_context.target_cities.push(city.clone());
        }
    }
    if let Some(cities) = &edits.gateway_location {
        session.campaign_context.target_cities = cities.clone();
    }
    if let Some(start) = &edits.gateway_start_date {
        if let Ok(parsed) = NaiveDate::parse_from_str(start, "%Y-%m-%d") {
            session.campaign_context.start_date = Some(parsed);
        }
    }
    if let Some(end) = &edits.gateway_end_date {
        if let Ok(parsed) = NaiveDate::parse_from_str(end, "%Y-%m-%d") {
            session.campaign_context.end_date = Some(parsed);
        }
    }
    if let Some(budget) = &edits.gateway_budget_range {
        session.campaign_context.budget_range = Some(budget.clone());
    }
    session.gateways_answered.push(GatewaySnapshot {
        topic: "gateway".to_string(),
        question: "gateway edit".to_string(),
        answer: serde_json::to_string(edits).unwrap_or_default(),
        asked_at: Utc::now(),
    });
}

fn parse_brand_objective(raw: &str) -> Option<crate::domain::intent::BrandObjective> {
    use crate::domain::intent::BrandObjective;
    let normalized = raw.to_lowercase();
    if normalized.contains("launch") {
        Some(BrandObjective::ProductLaunch)
    } else if normalized.contains("visit") || normalized.contains("footfall") {
        Some(BrandObjective::StoreVisit)
    } else if normalized.contains("offer") || normalized.contains("sale") || normalized.contains("discount") {
        Some(BrandObjective::OfferBased)
    } else {
        Some(BrandObjective::Awareness)
    }
}

fn apply_persona(session: &mut ChatSession, candidate: Persona, confidence: f32) {
    match session.persona {
        None => session.maybe_update_persona(candidate, confidence, 0.0),
        Some(current) if current == candidate => {
            let boosted = (session.persona_confidence + PERSONA_CONFIDENCE_BOOST).min(1.0);
            session.persona_confidence = boosted;
        }
        Some(_) => {
            if confidence - session.persona_confidence >= PERSONA_SWITCH_CONFIDENCE_GAP || confidence >= PERSONA_SWITCH_ABSOLUTE {
                session.persona = Some(candidate);
                session.persona_confidence = confidence;
            }
        }
    }
}

fn throttle_question(session: &mut ChatSession, question: Option<String>, pending: &[String]) -> Option<String> {
    let mut candidate = question;
    loop {
        let Some(q) = candidate.clone() else { return None };
        let normalized = q.trim().to_lowercase();
        let attempts = session.question_attempts.entry(normalized.clone()).or_insert(0);
        if *attempts < QUESTION_ATTEMPT_CAP {
            *attempts += 1;
            return Some(q);
        }
        candidate = pending.iter().find(|p| {
            let n = p.trim().to_lowercase();
            session.question_attempts.get(&n).copied().unwrap_or(0) < QUESTION_ATTEMPT_CAP
        }).cloned();
        if candidate.is_none() {
            return None;
        }
    }
}

fn parse_budget_to_amount(raw: &str) -> Option<f64> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    digits.parse::<f64>().ok()
}

fn merge_ranking(discover: &DiscoverResult, ranked: &[RankedScreen]) -> Vec<RankedScreenView> {
    let score_by_id: BTreeMap<Uuid, &RankedScreen> = ranked.iter().map(|r| (r.screen_id, r)).collect();

    let mut views: Vec<RankedScreenView> = discover
        .screens
        .iter()
        .map(|d| {
            let score = score_by_id.get(&d.screen.id).map(|r| r.score.clone()).unwrap_or_else(|| {
                call2_ranking::ScoreBreakdown {
                    total: 0.0,
                    area_match: 0.0,
                    audience_fit: 0.0,
                    screen_quality: 0.0,
                    context_bonus: 0.0,
                    eligibility: 0.0,
                    summary: if ranked.is_empty() { "not ranked this turn".to_string() } else { "not scored".to_string() },
                }
            });
            RankedScreenView {
                screen: d.screen.clone(),
                available_slots: d.available_slots,
                is_available: d.availability.is_available,
                relevance_score: score.total,
                score_rubric: score,
            }
        })
        .collect();

    if !ranked.is_empty() {
        views.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap_or(std::cmp::Ordering::Equal));
    }
    views
}
