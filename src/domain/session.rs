use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::filters::FilterMap;
use super::intent::{BrandObjective, Persona};

/// The complete gateway supplied on session creation (spec §6 `POST /chat`
/// `gateway?{start_date, end_date, location[], budget_range}`). All four fields are
/// mandatory here — partial collection is `GatewayDraft`'s job (§4.6/§10), not this
/// type's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub location: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget_range: String,
}

/// The gateway values (location, dates, budget) plus the four core discovery topics.
/// Gateway fields only ever change through the pending-edit state machine (spec §4.12
/// step 9); the core topics accumulate directly from Call-1 (step 11). Of the four,
/// `{ad_category, brand_objective, target_audience}` gate the question pipeline and
/// `discovery_complete` (spec §4.12 step 11, §8 P8); `product_category` accumulates
/// alongside them but is not itself part of that gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignContext {
    pub ad_category: Option<String>,
    pub product_category: Option<String>,
    pub brand_objective: Option<BrandObjective>,
    pub budget_range: Option<String>,
    pub target_cities: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub target_audience: Option<String>,
}

/// A gateway is a screen-category question the assistant asked and the user
/// answered (spec §4.6). Editing one re-runs ranking from that point forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySnapshot {
    pub topic: String,
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// A gateway edit proposed by Call-1 (spec §4.9 output contract's `gateway_edits`);
/// shared between the LLM's strict-JSON parse and the pending-edit state machine so
/// both sides agree on all five fields.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayEdits {
    #[serde(default)]
    pub gateway_location_add: Option<String>,
    #[serde(default)]
    pub gateway_location: Option<Vec<String>>,
    #[serde(default)]
    pub gateway_start_date: Option<String>,
    #[serde(default)]
    pub gateway_end_date: Option<String>,
    #[serde(default)]
    pub gateway_budget_range: Option<String>,
}

impl GatewayEdits {
    pub fn is_empty(&self) -> bool {
        self.gateway_location_add.is_none()
            && self.gateway_location.is_none()
            && self.gateway_start_date.is_none()
            && self.gateway_end_date.is_none()
            && self.gateway_budget_range.is_none()
    }
}

/// A proposed edit to the gateway, awaiting user confirmation before it is applied
/// (spec §4.12 step 9, "pending gateway edit"). Carries every field Call-1 proposed,
/// not just one topic, so a multi-field edit (e.g. budget and dates in the same
/// message) survives the approval round-trip intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingGatewayEdit {
    pub edits: GatewayEdits,
    pub proposed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub role: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Last screen list shown, kept so Live Mode follow-up questions ("what about
/// the third one?") can resolve without re-ranking (spec §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    pub screen_ids: Vec<Uuid>,
    pub shown_at: DateTime<Utc>,
}

/// One full conversation's mutable state (spec §3 ChatSession). Persisted between
/// turns; every mutation in the per-turn pipeline (spec §4.12) acts on a clone of
/// this and is saved back atomically at the end of the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub active_filters: FilterMap,
    pub previous_filters: Option<FilterMap>,

    pub gateways_answered: Vec<GatewaySnapshot>,
    pub pending_gateway_edit: Option<PendingGatewayEdit>,

    pub pending_questions: Vec<String>,
    pub question_attempts: std::collections::BTreeMap<String, u32>,

    pub persona: Option<Persona>,
    pub persona_confidence: f32,

    pub campaign_context: CampaignContext,
    pub discovery_complete: bool,

    pub messages: Vec<MessageLogEntry>,
    pub last_page_context: Option<PageContext>,

    pub message_count_in_window: u32,
    pub window_started_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        ChatSession {
            id,
            user_id: None,
            created_at: now,
            updated_at: now,
            active_filters: FilterMap::new(),
            previous_filters: None,
            gateways_answered: Vec::new(),
            pending_gateway_edit: None,
            pending_questions: Vec::new(),
            question_attempts: std::collections::BTreeMap::new(),
            persona: None,
            persona_confidence: 0.0,
            campaign_context: CampaignContext {
                ad_category: None,
                product_category: None,
                brand_objective: None,
                budget_range: None,
                target_cities: Vec::new(),
                start_date: None,
                end_date: None,
                target_audience: None,
            },
            discovery_complete: false,
            messages: Vec::new(),
            last_page_context: None,
            message_count_in_window: 0,
            window_started_at: now,
        }
    }

    /// Spec §4.12 step 3: snapshot the current filter stack before applying a
    /// revertible mutation (refinement, gateway edit approval).
    pub fn snapshot_filters(&mut self) {
        self.previous_filters = Some(self.active_filters.clone());
    }

    /// Spec §4.12 step 9, Revert intent: restore the last snapshot if one exists.
    pub fn revert_filters(&mut self) -> bool {
        if let Some(prev) = self.previous_filters.take() {
            self.active_filters = prev;
            true
        } else {
            false
        }
    }

    pub fn start_over(&mut self) {
        self.active_filters = FilterMap::new();
        self.previous_filters = None;
        self.gateways_answered.clear();
        self.pending_gateway_edit = None;
        self.pending_questions.clear();
        self.question_attempts.clear();
        self.discovery_complete = false;
        self.last_page_context = None;
    }

    /// Persona is only updated once confidence clears the anti-flicker bar
    /// (spec §4.9: persona should not oscillate turn to turn).
    pub fn maybe_update_persona(&mut self, candidate: Persona, confidence: f32, threshold: f32) {
        if confidence < threshold {
            return;
        }
        if self.persona != Some(candidate) && confidence <= self.persona_confidence {
            return;
        }
        self.persona = Some(candidate);
        self.persona_confidence = confidence;
    }
}
