use std::sync::Arc;

use crate::domain::area_profile::{
    AreaProfile, Coordinates, GeoContext, Movement, MovementType, ProfileMetadata, RingAnalysis, RingSummary,
};
use crate::domain::place::Place;

use super::authority_detector::AuthorityDetector;
use super::classification::ClassificationEngine;
use super::maps_client::MapsProvider;
use super::place_normalizer::PlaceNormalizer;
use super::tables::ProfilerTables;

pub const PROFILER_VERSION: &str = "2.0";

/// Orchestrates reverse-geocode -> ring 1 -> optional ring 1.5 -> ring 2 -> ring 3 ->
/// classification -> dwell (C4, spec.md §4.4).
pub struct RingEngine {
    maps: Arc<dyn MapsProvider>,
    tables: Arc<ProfilerTables>,
}

impl RingEngine {
    pub fn new(maps: Arc<dyn MapsProvider>, tables: Arc<ProfilerTables>) -> Self {
        Self { maps, tables }
    }

    /// Returns the rules-based profile alongside the deduped Ring-1 places, so a
    /// caller can hand both to `LlmProfilerRouter::apply` for optional refinement.
    pub async fn profile(&self, lat: f64, lng: f64) -> (AreaProfile, Vec<Place>) {
        let started = std::time::Instant::now();
        let mut network_calls = 0u32;
        let mut cached_any = false;
        let mut reasoning = Vec::new();

        let (geo, meta) = self.maps.reverse_geocode(lat, lng).await;
        network_calls += meta.network_calls;
        cached_any |= meta.cached;
        reasoning.push(format!("Reverse-geocoded to {} ({:?} tier)", geo.formatted_address, geo.city_tier));

        let radii = &self.tables.ring_radii;
        let (ring1_raw, meta) = self.maps.places_nearby(lat, lng, radii.ring1_m, 20).await;
        network_calls += meta.network_calls;
        cached_any |= meta.cached;

        let normalizer = PlaceNormalizer::new(&self.tables);
        let ring1_places = normalizer.dedupe(&ring1_raw);
        let detector = AuthorityDetector::new(&self.tables);
        let (mut authority, rejection) = detector.detect(&ring1_places);

        if let Some(rejection) = &rejection {
            reasoning.push(format!(
                "Ring 1: rejected candidate '{}' for {} ({})",
                rejection.place_name, rejection.attempted_group, rejection.reason
            ));
        }

        let mut ring1_summary = ring_summary(radii.ring1_m, &ring1_places, &normalizer);
        let mut extended_label: Option<String> = None;

        let ring1_5_summary = if authority.is_none() {
            reasoning.push("Ring 1: no authority anchor found, attempting Ring 1.5 extended search".to_string());
            let mut places_by_radius = Vec::new();
            for &radius in &radii.ring1_5_radii_m {
                let (raw, meta) = self.maps.places_nearby(lat, lng, radius, 20).await;
                network_calls += meta.network_calls;
                cached_any |= meta.cached;
                places_by_radius.push((radius, normalizer.dedupe(&raw)));
            }
            let extended = detector.detect_extended(&places_by_radius);
            let summary = extended_ring1_5_summary(&places_by_radius);
            if let Some(found) = extended {
                reasoning.push(format!(
                    "Ring 1.5: found extended anchor '{}' ({})",
                    found.source_place_name, found.context_label
                ));
                extended_label = Some(format!("Near {} (Local: {})", found.source_place_name, found.context_label));
                authority = Some(found);
            } else {
                reasoning.push("Ring 1.5: no extended anchor found".to_string());
            }
            Some(summary)
        } else {
            reasoning.push(format!(
                "Ring 1: authority override '{}' ({})",
                authority.as_ref().unwrap().source_place_name,
                authority.as_ref().unwrap().context_label
            ));
            None
        };

        // A Ring 1.5 find only ever rewrites the context label (spec.md §4.3); it must
        // not itself trigger AUTHORITY_OVERRIDE or skip ring-2 classification.
        let ring1_5_is_extended_only = extended_label.is_some();

        let (ring2_summary, group_counts, unique_place_count, expansion_steps) = if authority.is_some()
            && !ring1_5_is_extended_only
        {
            ring1_summary.skipped = false;
            reasoning.push("Ring 2: skipped (authority override)".to_string());
            (
                RingSummary { skipped: true, skip_reason: Some("AUTHORITY_OVERRIDE".to_string()), ..Default::default() },
                std::collections::BTreeMap::new(),
                0,
                0,
            )
        } else {
            let tier_key = self.tables.city_tiers.get(&geo.city).map(String::as_str).unwrap_or("TIER_3");
            let multiplier = self.tables.tier_multiplier(tier_key);
            let base_radius = (radii.ring2_base_m as f64 * multiplier).round() as u32;

            let mut radius = base_radius;
            let mut expansion_steps = 0u32;
            let mut places;
            let mut unique;
            loop {
                let (raw, meta) = self.maps.places_nearby(lat, lng, radius, 60).await;
                network_calls += meta.network_calls;
                cached_any |= meta.cached;
                places = normalizer.dedupe(&raw);
                unique = places.len() as u32;
                if unique >= radii.ring2_min_unique || expansion_steps >= 3 || radius >= radii.ring2_expansion_cap_m {
                    break;
                }
                radius = (radius + radii.ring2_expansion_step_m).min(radii.ring2_expansion_cap_m);
                expansion_steps += 1;
            }

            if expansion_steps > 0 {
                reasoning.push(format!("Ring 2: expanded {} time(s) to radius {}m", expansion_steps, radius));
            }

            let (counts, unique_count) = normalizer.count_by_group(&places, true);
            let summary = RingSummary {
                radius_m: radius,
                unique_place_count: unique_count,
                group_counts: counts.iter().map(|(g, c)| (g.as_str().to_string(), *c)).collect(),
                expanded: expansion_steps > 0,
                skipped: false,
                skip_reason: None,
            };
            (summary, counts, unique_count, expansion_steps)
        };

        let (ring3_raw, meta) = self.maps.places_nearby(lat, lng, radii.ring3_m, 20).await;
        network_calls += meta.network_calls;
        cached_any |= meta.cached;
        let ring3_places = normalizer.dedupe(&ring3_raw);
        let ring3_summary = ring_summary(radii.ring3_m, &ring3_places, &normalizer);

        let (movement_ctx, meta) = self.maps.movement_context(lat, lng, Some(&geo.formatted_address)).await;
        network_calls += meta.network_calls;
        cached_any |= meta.cached;

        let movement_type = classify_movement(&movement_ctx);
        reasoning.push(format!("Ring 3: movement classified as {}", movement_type.as_str()));

        // A Ring 1.5 extended anchor earns the context-label rewrite above but must not
        // force AUTHORITY_OVERRIDE itself — only a true Ring-1 anchor does that.
        let override_authority = if ring1_5_is_extended_only { None } else { authority.as_ref() };

        let classifier = ClassificationEngine::new(&self.tables);
        let mut classification = classifier.classify(&group_counts, unique_place_count, override_authority, expansion_steps);

        if let Some(label) = &extended_label {
            classification.area.context = format!("{} — {}", classification.area.context, label);
        }

        let dwell = classifier.dwell(&group_counts, unique_place_count, authority.as_ref(), movement_type);

        let profile = AreaProfile {
            coordinates: Coordinates { latitude: lat, longitude: lng },
            geo_context: GeoContext {
                city: geo.city,
                state: geo.state,
                country: geo.country,
                city_tier: geo.city_tier,
                formatted_address: geo.formatted_address,
            },
            area: classification.area,
            movement: Movement {
                movement_type,
                context: describe_movement(movement_type),
                road_type: movement_ctx.road_type,
                near_junction: movement_ctx.near_junction,
                pedestrian_friendly: movement_ctx.pedestrian_friendly,
            },
            dwell_category: dwell.category,
            dwell_confidence: dwell.confidence,
            dwell_score: dwell.score,
            dominance_ratio: classification.dominance_ratio,
            ring_analysis: RingAnalysis { ring1: ring1_summary, ring2: ring2_summary, ring3: ring3_summary, ring1_5: ring1_5_summary },
            reasoning,
            metadata: ProfileMetadata {
                computed_at: chrono::Utc::now(),
                api_calls_made: network_calls,
                cached: cached_any,
                processing_time_ms: started.elapsed().as_millis() as u64,
                version: PROFILER_VERSION.to_string(),
                error: None,
                fallback: false,
            },
        };

        (profile, ring1_places)
    }
}

fn ring_summary(radius_m: u32, places: &[Place], normalizer: &PlaceNormalizer<'_>) -> RingSummary {
    let (counts, unique) = normalizer.count_by_group(places, false);
    RingSummary {
        radius_m,
        unique_place_count: unique,
        group_counts: counts.iter().map(|(g, c)| (g.as_str().to_string(), *c)).collect(),
        expanded: false,
        skipped: false,
        skip_reason: None,
    }
}

fn extended_ring1_5_summary(places_by_radius: &[(u32, Vec<Place>)]) -> RingSummary {
    let last_radius = places_by_radius.last().map(|(r, _)| *r).unwrap_or(0);
    let total_unique: u32 = places_by_radius.iter().map(|(_, p)| p.len() as u32).sum();
    RingSummary {
        radius_m: last_radius,
        unique_place_count: total_unique,
        group_counts: std::collections::BTreeMap::new(),
        expanded: places_by_radius.len() > 1,
        skipped: false,
        skip_reason: None,
    }
}

fn classify_movement(ctx: &super::maps_client::MovementContextResult) -> MovementType {
    match (ctx.road_type.as_str(), ctx.pedestrian_friendly, ctx.near_junction) {
        (_, true, _) => MovementType::Pedestrian,
        (_, _, true) => MovementType::StopAndGo,
        ("arterial", _, _) => MovementType::SlowFlow,
        ("highway", _, _) => MovementType::PassBy,
        _ => MovementType::SlowFlow,
    }
}

fn describe_movement(movement_type: MovementType) -> String {
    match movement_type {
        MovementType::Pedestrian => "High foot traffic, pedestrian-friendly surroundings".to_string(),
        MovementType::StopAndGo => "Stop-and-go traffic near a junction".to_string(),
        MovementType::SlowFlow => "Slow, steady traffic flow along an arterial road".to_string(),
        MovementType::PassBy => "Fast-moving pass-by traffic along a major road".to_string(),
    }
}
