use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::discovery::{self, DiscoverParams, DiscoverResult};
use crate::domain::filters::FilterMap;
use crate::error::CoreResult;
use crate::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DiscoverRequest {
    pub locations: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub budget: f64,
    #[serde(default)]
    pub xia_filters: FilterMap,
    #[serde(default)]
    pub excludes: FilterMap,
    pub text_search: Option<String>,
}

/// `POST /discover` — stateless invocation of the Discover Engine (C8), used by the
/// web app's own filter UI outside of a chat turn.
pub async fn post_discover(State(state): State<AppState>, Json(request): Json<DiscoverRequest>) -> CoreResult<Json<DiscoverResult>> {
    let menu = discovery::filter_menu::build(&state.inventory, &state.cache).await.map_err(crate::error::CoreError::Internal)?;

    let result = discovery::discover(
        &state.inventory,
        &menu,
        &state.tables.location_noise_terms,
        chrono::Duration::minutes(10),
        DiscoverParams {
            locations: request.locations,
            start: request.start,
            end: request.end,
            budget: request.budget,
            xia_filters: &request.xia_filters,
            excludes: &request.excludes,
            text_search: request.text_search.as_deref(),
        },
    )
    .await
    .map_err(crate::error::CoreError::Internal)?;

    Ok(Json(result))
}
