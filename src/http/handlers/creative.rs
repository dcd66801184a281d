use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::screen::CreativeBrief;
use crate::domain::session::CampaignContext;
use crate::error::{CoreError, CoreResult};
use crate::http::state::AppState;
use crate::llm::creative;

#[derive(Debug, Deserialize)]
pub struct CreativeRequest {
    pub campaign: CampaignContext,
    pub screen_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CreativeResponse {
    pub briefs: Vec<CreativeBrief>,
}

/// `POST /creative-suggestion` — one creative brief per requested screen.
pub async fn post_creative_suggestion(
    State(state): State<AppState>,
    Json(request): Json<CreativeRequest>,
) -> CoreResult<Json<CreativeResponse>> {
    let mut briefs = Vec::with_capacity(request.screen_ids.len());

    for screen_id in request.screen_ids {
        let screen = state
            .inventory
            .screen_by_id(screen_id)
            .await
            .map_err(CoreError::Internal)?
            .ok_or_else(|| CoreError::NotFound { kind: "screen", id: screen_id.to_string() })?;

        let brief = creative::suggest(state.llm.as_ref(), &state.llm_model, &request.campaign, &screen).await;
        briefs.push(brief);
    }

    Ok(Json(CreativeResponse { briefs }))
}
