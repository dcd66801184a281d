use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::area_profile::AreaProfile;
use crate::error::{CoreError, CoreResult};
use crate::http::state::AppState;
use crate::profiler::ProfilerMode;

#[derive(Debug, Deserialize)]
pub struct ScreenProfileRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub mode: Option<String>,
}

/// `POST /screen-profile` — runs the Ring Engine (C4) and, per the resolved mode, the
/// LLM Profiler Router (C6) over an arbitrary coordinate. Stateless: the caller owns
/// persisting the result against a screen record.
pub async fn post_screen_profile(State(state): State<AppState>, Json(request): Json<ScreenProfileRequest>) -> CoreResult<Json<AreaProfile>> {
    let mode = request.mode.as_deref().map(ProfilerMode::parse).unwrap_or(state.profiler_mode);

    let (profile, ring1_places) = state.ring_engine.profile(request.latitude, request.longitude).await;
    let profile = state.profiler_router.apply(mode, profile, &ring1_places).await;

    Ok(Json(profile))
}

/// `GET /screen-profile/{id}` — the canonical `AreaProfile` already on file for a screen.
pub async fn get_screen_profile(State(state): State<AppState>, Path(screen_id): Path<Uuid>) -> CoreResult<Json<AreaProfile>> {
    let screen = state
        .inventory
        .screen_by_id(screen_id)
        .await
        .map_err(CoreError::Internal)?
        .ok_or_else(|| CoreError::NotFound { kind: "screen", id: screen_id.to_string() })?;

    screen
        .area_profile
        .map(Json)
        .ok_or_else(|| CoreError::NotFound { kind: "area_profile", id: screen_id.to_string() })
}
