use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::store::{Cache, ScreenInventoryStore};

/// A fixed set of screen attributes queryable by enum value (spec.md §4.7).
pub const ENUM_FIELDS: &[&str] = &["primaryType", "movementType", "dwellCategory", "environment", "technology", "orientation", "city"];

/// A static list of numeric fields usable with `{eq, gt, lt, gte, lte}` (spec.md §4.7).
pub const NUMERIC_FIELDS: &[&str] = &["base_price_per_slot_inr", "brightness_nits", "screen_width", "screen_height", "recommended_duration_sec"];

/// A static list of free-text-matched columns (spec.md §4.7).
pub const TEXT_SEARCH_FIELDS: &[&str] = &["spec_city", "spec_full_address", "spec_nearest_landmark", "profiled_full_address", "profiled_city"];

/// Gateway fields, editable only via explicit user confirmation (spec.md §4.7).
pub const GATEWAY_FIELDS: &[&str] = &["location", "start_date", "end_date", "budget_range"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterMenu {
    pub enum_values: std::collections::BTreeMap<String, Vec<String>>,
    pub numeric_fields: Vec<&'static str>,
    pub text_search_fields: Vec<&'static str>,
    pub gateway_fields: Vec<&'static str>,
}

impl FilterMenu {
    pub fn enum_contains(&self, field: &str, value: &str) -> bool {
        self.enum_values.get(field).map(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value))).unwrap_or(false)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_KEY: &str = "filter_menu:v1";

/// Builds the dynamic enum/numeric filter catalog from live inventory statistics
/// (C7, spec.md §4.7). The source of truth for Call-1; a short cache TTL avoids
/// hammering the inventory store on every turn.
pub async fn build(store: &Arc<dyn ScreenInventoryStore>, cache: &Arc<dyn Cache>) -> anyhow::Result<FilterMenu> {
    if let Some(cached) = cache.get(CACHE_KEY).await {
        if let Ok(menu) = serde_json::from_str::<FilterMenu>(&cached) {
            return Ok(menu);
        }
    }

    let mut enum_values = std::collections::BTreeMap::new();
    for field in ENUM_FIELDS {
        let values = store.distinct_values(field).await?;
        enum_values.insert(field.to_string(), values);
    }

    let menu = FilterMenu {
        enum_values,
        numeric_fields: NUMERIC_FIELDS.to_vec(),
        text_search_fields: TEXT_SEARCH_FIELDS.to_vec(),
        gateway_fields: GATEWAY_FIELDS.to_vec(),
    };

    if let Ok(json) = serde_json::to_string(&menu) {
        cache.put(CACHE_KEY, json, CACHE_TTL).await;
    }

    Ok(menu)
}
