use serde::Deserialize;
use std::collections::BTreeMap;

use crate::domain::place::PlaceGroup;

/// Declarative tuning tables loaded from `config/area_profiler.toml` (spec.md §9: "keep
/// ... in a single declarative configuration file so they can be tuned without
/// recompilation"). Parsed once at startup and held behind an `Arc` by every profiler
/// component that needs it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfilerTables {
    pub dominance_thresholds: DominanceThresholds,
    pub ring_radii: RingRadii,
    pub ring2_tier_multiplier: BTreeMap<String, f64>,
    pub confidence_thresholds: ConfidenceThresholds,
    pub movement_modifier: BTreeMap<String, f32>,
    pub dwell_score_bounds: DwellScoreBounds,
    pub city_tiers: BTreeMap<String, String>,
    pub generic_types: Vec<String>,
    pub place_groups: BTreeMap<String, String>,
    pub group_priority: Vec<String>,
    pub authority_anchors: Vec<AuthorityAnchorRule>,
    pub dwell_group_weight: BTreeMap<String, f32>,
    pub medical_institute_name_patterns: Vec<String>,
    pub location_noise_terms: Vec<String>,
    pub generic_transit_name_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DominanceThresholds {
    pub dominant: f64,
    pub strong_bias: f64,
    pub moderate_bias: f64,
    pub weak_bias: f64,
    pub co_dominant_gap: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RingRadii {
    pub ring1_m: u32,
    pub ring3_m: u32,
    pub ring2_base_m: u32,
    pub ring2_expansion_step_m: u32,
    pub ring2_expansion_cap_m: u32,
    pub ring2_min_unique: u32,
    pub ring1_5_radii_m: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfidenceThresholds {
    pub high_unique: u32,
    pub high_groups: u32,
    pub medium_unique: u32,
    pub medium_groups: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DwellScoreBounds {
    pub long_wait: f32,
    pub medium_wait: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityAnchorRule {
    pub place_type: String,
    pub group: String,
    pub context_label: String,
    pub significance: u32,
    pub major_significance: u32,
    pub name_patterns: Vec<String>,
}

impl ProfilerTables {
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let raw = match path {
            Some(p) => std::fs::read_to_string(p)
                .map_err(|e| anyhow::anyhow!("reading profiler tables at {p}: {e}"))?,
            None => include_str!("../../config/area_profiler.toml").to_string(),
        };
        Ok(toml::from_str(&raw)?)
    }

    pub fn group_of_type(&self, place_type: &str) -> Option<PlaceGroup> {
        self.place_groups
            .get(place_type)
            .and_then(|g| PlaceGroup::from_str(g))
    }

    pub fn tier_multiplier(&self, tier: &str) -> f64 {
        self.ring2_tier_multiplier.get(tier).copied().unwrap_or(1.0)
    }

    pub fn dwell_weight(&self, group: PlaceGroup) -> f32 {
        self.dwell_group_weight.get(group.as_str()).copied().unwrap_or(0.3)
    }

    pub fn movement_modifier(&self, movement: &str) -> f32 {
        self.movement_modifier.get(movement).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_embedded_defaults() {
        let tables = ProfilerTables::load(None).expect("embedded table parses");
        assert_eq!(tables.dominance_thresholds.dominant, 0.55);
        assert_eq!(tables.group_of_type("hospital"), Some(PlaceGroup::Healthcare));
        assert!(tables.group_priority.contains(&"TRANSIT".to_string()));
    }
}
