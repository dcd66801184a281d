use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::session::Gateway;
use crate::error::{CoreError, CoreResult};
use crate::http::state::AppState;
use crate::orchestrator::{TurnRequest, TurnResult};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub campaign_id: String,
    #[serde(default)]
    pub gateway: Option<Gateway>,
    pub message: String,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub turn: TurnResult,
}

/// `POST /chat` — runs the full per-turn pipeline (C12, spec.md §4.12).
pub async fn post_chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> CoreResult<Json<ChatResponse>> {
    let turn = state
        .orchestrator
        .handle_turn(TurnRequest {
            session_id: request.session_id,
            user_id: request.user_id,
            campaign_id: request.campaign_id,
            gateway: request.gateway,
            message: request.message,
            debug: request.debug,
        })
        .await?;

    Ok(Json(ChatResponse { turn }))
}

/// `GET /chat/{session_id}` — fetches the persisted session state for a client reload.
pub async fn get_session(State(state): State<AppState>, Path(session_id): Path<Uuid>) -> CoreResult<Json<serde_json::Value>> {
    let session = state
        .orchestrator
        .sessions
        .load(session_id)
        .await
        .map_err(CoreError::Internal)?
        .ok_or_else(|| CoreError::NotFound { kind: "session", id: session_id.to_string() })?;

    Ok(Json(serde_json::to_value(session).map_err(|e| CoreError::Internal(e.into()))?))
}
