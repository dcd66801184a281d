use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{chat, chat_open, creative, discover, screen_profile};
use super::state::AppState;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Assembles the full HTTP surface (spec.md §6) over one `AppState`, grounded on the
/// teacher's `configure_app` / `routes::health_check` pattern.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/chat", post(chat::post_chat))
        .route("/chat/:session_id", get(chat::get_session))
        .route("/chat-open", post(chat_open::post_chat_open))
        .route("/discover", post(discover::post_discover))
        .route("/screen-profile", post(screen_profile::post_screen_profile))
        .route("/screen-profile/:id", get(screen_profile::get_screen_profile))
        .route("/creative-suggestion", post(creative::post_creative_suggestion))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
