use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::http::state::AppState;
use crate::llm::gateway_collection::{self, GatewayDraft};
use crate::llm::live_help;

/// `POST /chat-open` request. `page_path` present => Live Mode (context-help call
/// only); absent => normal mode (gateway collection one field at a time), per
/// SPEC_FULL §10.
#[derive(Debug, Deserialize)]
pub struct ChatOpenRequest {
    pub session_id: Option<Uuid>,
    pub message: String,
    #[serde(default)]
    pub gateway_draft: GatewayDraftInput,
    pub page_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct GatewayDraftInput {
    #[serde(default)]
    pub location: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub budget_range: Option<String>,
}

impl From<GatewayDraftInput> for GatewayDraft {
    fn from(input: GatewayDraftInput) -> Self {
        GatewayDraft {
            location: input.location,
            start_date: input.start_date,
            end_date: input.end_date,
            budget_range: input.budget_range,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatOpenResponse {
    pub reply: String,
    pub gateway_complete: Option<bool>,
    pub redirect_path: Option<String>,
    pub redirect_label: Option<String>,
}

/// `POST /chat-open` — Live Mode context help when `page_path` is set, else the
/// single-field-at-a-time gateway collection pipeline.
pub async fn post_chat_open(State(state): State<AppState>, Json(request): Json<ChatOpenRequest>) -> CoreResult<Json<ChatOpenResponse>> {
    if let Some(page_path) = &request.page_path {
        let result = live_help::run(state.llm.as_ref(), &state.llm_model, page_path, &request.message).await;
        let redirect = result.redirect();
        return Ok(Json(ChatOpenResponse {
            reply: result.reply,
            gateway_complete: None,
            redirect_path: redirect.as_ref().map(|r| r.path.clone()),
            redirect_label: redirect.as_ref().map(|r| r.label.clone()),
        }));
    }

    let draft: GatewayDraft = request.gateway_draft.into();
    let (updated, ask) = gateway_collection::collect_next(state.llm.as_ref(), &state.llm_model, &draft, &request.message).await;

    Ok(Json(ChatOpenResponse {
        reply: ask,
        gateway_complete: Some(updated.is_complete()),
        redirect_path: None,
        redirect_label: None,
    }))
}
