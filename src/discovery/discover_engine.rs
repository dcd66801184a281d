use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::filters::{FilterMap, FilterValue};
use crate::domain::screen::Screen;
use crate::store::ScreenInventoryStore;

use super::filter_menu::FilterMenu;
use super::tokenize::{fuzzy_contains, tokenize_location};

#[derive(Debug, Clone, Serialize)]
pub struct ScreenAvailability {
    pub is_available: bool,
    pub reason: Option<String>,
    pub next_available_date: Option<NaiveDate>,
    pub slots_freeing: Option<i32>,
    pub available_until: Option<NaiveDate>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredScreen {
    pub screen: Screen,
    pub available_slots: i32,
    pub availability: ScreenAvailability,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverResult {
    pub locations: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub budget: f64,
    pub total_screens_found: u32,
    pub available_screens: u32,
    pub unavailable_screens: u32,
    pub screens: Vec<DiscoveredScreen>,
    pub unavailability_breakdown: BTreeMap<String, u32>,
    pub not_available_locations: Vec<String>,
}

impl DiscoverResult {
    fn empty(locations: Vec<String>, start: NaiveDate, end: NaiveDate, budget: f64) -> Self {
        DiscoverResult {
            locations,
            start,
            end,
            budget,
            total_screens_found: 0,
            available_screens: 0,
            unavailable_screens: 0,
            screens: Vec::new(),
            unavailability_breakdown: BTreeMap::new(),
            not_available_locations: Vec::new(),
        }
    }
}

pub struct DiscoverParams<'a> {
    pub locations: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub budget: f64,
    pub xia_filters: &'a FilterMap,
    pub excludes: &'a FilterMap,
    pub text_search: Option<&'a str>,
}

/// `discover(locations, start, end, budget, xia_filters, excludes, text_search)` (C8,
/// spec.md §4.8).
pub async fn discover(
    store: &Arc<dyn ScreenInventoryStore>,
    menu: &FilterMenu,
    noise_terms: &[String],
    hold_expiry: chrono::Duration,
    params: DiscoverParams<'_>,
) -> anyhow::Result<DiscoverResult> {
    let DiscoverParams { locations, start, end, budget, xia_filters, excludes, text_search } = params;

    // Step 1: validate dates.
    let num_days = (end - start).num_days();
    if num_days <= 0 {
        return Ok(DiscoverResult::empty(locations, start, end, budget));
    }

    // Step 2.
    let daily_budget = budget / num_days as f64;

    // Step 3: auto-expire stale HOLDs.
    store.expire_stale_holds(hold_expiry).await?;

    // Step 4: tokenize each location.
    let tokenized: Vec<Vec<String>> = locations.iter().map(|l| tokenize_location(l, noise_terms)).collect();
    let all_tokens: Vec<&str> = tokenized.iter().flatten().map(|s| s.as_str()).collect();

    let screens = store.discoverable_screens().await?;

    // Step 5-6: location predicate + eligibility filter.
    let mut matched: Vec<Screen> = screens
        .into_iter()
        .filter(|s| location_matches(s, &all_tokens))
        .collect();
    dedup_by_id(&mut matched);

    // Step 7: apply xia_filters.
    matched.retain(|s| passes_filters(s, xia_filters, menu, false));

    // Step 8: apply excludes (negation).
    matched.retain(|s| passes_filters(s, excludes, menu, true));

    // Step 9: text_search disjunction across text fields.
    if let Some(query) = text_search {
        if !query.trim().is_empty() {
            matched.retain(|s| text_search_matches(s, query));
        }
    }

    let total_screens_found = matched.len() as u32;

    let mut discovered = Vec::with_capacity(matched.len());
    let mut breakdown: BTreeMap<String, u32> = BTreeMap::new();
    let mut available_count = 0u32;

    for screen in matched {
        let bookings = store.bookings_for_screen(screen.id).await?;
        let availability = compute_availability(&screen, &bookings, start, end, daily_budget);

        if availability.is_available {
            available_count += 1;
        } else if let Some(reason) = &availability.reason {
            *breakdown.entry(reason.clone()).or_insert(0) += 1;
        }

        let available_slots = compute_available_slots(&screen, &bookings, start, end);
        discovered.push(DiscoveredScreen { screen, available_slots, availability });
    }

    // Step 13: not_available_locations — input locations with no matching screen.
    let not_available_locations: Vec<String> = locations
        .iter()
        .zip(tokenized.iter())
        .filter(|(_, toks)| {
            !discovered.iter().any(|d| toks.iter().any(|t| location_token_matches_screen(&d.screen, t)))
        })
        .map(|(raw, _)| raw.clone())
        .collect();

    let unavailable_screens = total_screens_found.saturating_sub(available_count);

    Ok(DiscoverResult {
        locations,
        start,
        end,
        budget,
        total_screens_found,
        available_screens: available_count,
        unavailable_screens,
        screens: discovered,
        unavailability_breakdown: breakdown,
        not_available_locations,
    })
}

fn dedup_by_id(screens: &mut Vec<Screen>) {
    let mut seen = std::collections::HashSet::new();
    screens.retain(|s| seen.insert(s.id));
}

fn location_token_matches_screen(screen: &Screen, token: &str) -> bool {
    fuzzy_contains(&screen.location.city, token)
        || fuzzy_contains(&screen.location.full_address, token)
        || fuzzy_contains(&screen.location.nearest_landmark, token)
        || screen
            .area_profile
            .as_ref()
            .map(|p| fuzzy_contains(&p.geo_context.formatted_address, token) || fuzzy_contains(&p.geo_context.city, token))
            .unwrap_or(false)
}

fn location_matches(screen: &Screen, tokens: &[&str]) -> bool {
    if tokens.is_empty() {
        return true;
    }
    tokens.iter().any(|t| location_token_matches_screen(screen, t))
}

fn field_value_str(screen: &Screen, field: &str) -> Option<String> {
    match field {
        "city" | "spec_city" => Some(screen.location.city.clone()),
        "environment" => Some(screen.hardware.environment.clone()),
        "technology" => Some(screen.hardware.technology.clone()),
        "orientation" => Some(screen.hardware.orientation.clone()),
        "primaryType" => screen.area_profile.as_ref().map(|p| p.area.primary_type.clone()),
        "movementType" => screen.area_profile.as_ref().map(|p| p.movement.movement_type.as_str().to_string()),
        "dwellCategory" => screen.area_profile.as_ref().map(|p| p.dwell_category.as_str().to_string()),
        _ => None,
    }
}

fn field_value_num(screen: &Screen, field: &str) -> Option<f64> {
    match field {
        "base_price_per_slot_inr" => Some(screen.base_price_per_slot),
        "brightness_nits" => screen.hardware.brightness_nits.map(|v| v as f64),
        "screen_width" => screen.hardware.screen_width,
        "screen_height" => screen.hardware.screen_height,
        _ => None,
    }
}

/// Applies a single filter/exclude map. `negate=true` implements "excludes" as the
/// symmetric negation of the same matching logic (spec.md §4.8 step 8).
fn passes_filters(screen: &Screen, filters: &FilterMap, menu: &FilterMenu, negate: bool) -> bool {
    for (field, value) in filters {
        let matched = match value {
            FilterValue::EnumList(values) => {
                let field_value = field_value_str(screen, field);
                match field_value {
                    Some(fv) => values.iter().any(|v| v.eq_ignore_ascii_case(&fv)),
                    None => false,
                }
            }
            FilterValue::Scalar(scalar) => {
                if field == "spec_city" {
                    field_value_str(screen, field).map(|fv| fv.eq_ignore_ascii_case(scalar)).unwrap_or(false)
                } else {
                    field_value_str(screen, field).map(|fv| fv == *scalar).unwrap_or(false)
                }
            }
            FilterValue::Numeric(op) => field_value_num(screen, field).map(|fv| op.matches(fv)).unwrap_or(false),
        };

        let _ = menu; // menu enum-validity enforcement happens upstream (orchestrator step 6)

        if negate {
            if matched {
                return false;
            }
        } else if !matched {
            return false;
        }
    }
    true
}

fn text_search_matches(screen: &Screen, query: &str) -> bool {
    let fields = [
        screen.location.city.as_str(),
        screen.location.full_address.as_str(),
        screen.location.nearest_landmark.as_str(),
        screen.area_profile.as_ref().map(|p| p.geo_context.formatted_address.as_str()).unwrap_or(""),
        screen.area_profile.as_ref().map(|p| p.geo_context.city.as_str()).unwrap_or(""),
    ];
    fields.iter().any(|f| fuzzy_contains(f, query))
}

fn compute_available_slots(screen: &Screen, bookings: &[crate::domain::screen::SlotBooking], start: NaiveDate, end: NaiveDate) -> i32 {
    let booked: i32 = bookings
        .iter()
        .filter(|b| b.counts_against_availability() && b.overlaps(start, end))
        .map(|b| b.num_slots)
        .sum();
    screen.slots.total_slots_per_loop - screen.slots.reserved_slots - booked
}

fn compute_availability(
    screen: &Screen,
    bookings: &[crate::domain::screen::SlotBooking],
    start: NaiveDate,
    end: NaiveDate,
    daily_budget: f64,
) -> ScreenAvailability {
    let available_slots = compute_available_slots(screen, bookings, start, end);

    let mut availability = if available_slots <= 0 {
        let earliest_overlap = bookings
            .iter()
            .filter(|b| b.counts_against_availability() && b.overlaps(start, end))
            .min_by_key(|b| b.end_date);

        ScreenAvailability {
            is_available: false,
            reason: Some("No slots available for the selected dates".to_string()),
            next_available_date: earliest_overlap.map(|b| b.end_date.succ_opt().unwrap_or(b.end_date)),
            slots_freeing: earliest_overlap.map(|b| b.num_slots),
            available_until: None,
            warning: None,
        }
    } else if daily_budget < screen.base_price_per_slot {
        ScreenAvailability {
            is_available: false,
            reason: Some("Exceeds budget".to_string()),
            next_available_date: None,
            slots_freeing: None,
            available_until: None,
            warning: None,
        }
    } else {
        ScreenAvailability {
            is_available: true,
            reason: None,
            next_available_date: None,
            slots_freeing: None,
            available_until: None,
            warning: None,
        }
    };

    if let Some(block_date) = screen.scheduled_block_date {
        availability.available_until = Some(block_date);
        if end > block_date {
            availability.warning = Some(format!("This screen is only confirmed available until {block_date}"));
        }
    }

    availability
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::screen::{BookingSource, PaymentStatus, ProfileStatus, ScreenHardware, ScreenLocation, ScreenStatus, SlotBooking, SlotEconomics};
    use chrono::Utc;

    fn sample_screen(id: Uuid, total: i32, reserved: i32) -> Screen {
        Screen {
            id,
            name: "Test Screen".to_string(),
            location: ScreenLocation {
                city: "Chennai".to_string(),
                full_address: "T Nagar, Chennai".to_string(),
                nearest_landmark: "Panagal Park".to_string(),
                latitude: 13.04,
                longitude: 80.23,
            },
            hardware: ScreenHardware {
                environment: "Outdoor".to_string(),
                orientation: "Landscape".to_string(),
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
            slots: SlotEconomics { total_slots_per_loop: total, reserved_slots: reserved },
            status: ScreenStatus::Verified,
            scheduled_block_date: None,
            profile_status: ProfileStatus::Profiled,
            area_profile: None,
            restricted_ad_categories: vec![],
        }
    }

    #[test]
    fn availability_arithmetic_balances() {
        let id = Uuid::new_v4();
        let screen = sample_screen(id, 20, 2);
        let booking = SlotBooking {
            id: Uuid::new_v4(),
            screen_id: id,
            num_slots: 5,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            source: BookingSource::Xigi,
            status: BookingStatus::Active,
            payment: PaymentStatus::Paid,
            created_at: Utc::now(),
        };
        let start = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let available = compute_available_slots(&screen, &[booking], start, end);
        assert_eq!(available + 5 + 2, 20);
    }

    #[test]
    fn location_predicate_matches_city_case_insensitively() {
        let screen = sample_screen(Uuid::new_v4(), 10, 0);
        assert!(location_matches(&screen, &["chennai"]));
        assert!(!location_matches(&screen, &["mumbai"]));
    }
}
