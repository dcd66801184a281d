use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::place::PlaceGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementType {
    Pedestrian,
    StopAndGo,
    SlowFlow,
    PassBy,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Pedestrian => "PEDESTRIAN",
            MovementType::StopAndGo => "STOP_AND_GO",
            MovementType::SlowFlow => "SLOW_FLOW",
            MovementType::PassBy => "PASS_BY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DwellCategory {
    LongWait,
    MediumWait,
    ShortWait,
}

impl DwellCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DwellCategory::LongWait => "LONG_WAIT",
            DwellCategory::MediumWait => "MEDIUM_WAIT",
            DwellCategory::ShortWait => "SHORT_WAIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CityTier {
    Tier1,
    Tier2,
    Tier3,
}

impl CityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CityTier::Tier1 => "TIER_1",
            CityTier::Tier2 => "TIER_2",
            CityTier::Tier3 => "TIER_3",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoContext {
    pub city: String,
    pub state: String,
    pub country: String,
    pub city_tier: CityTier,
    pub formatted_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaBlock {
    pub primary_type: String,
    pub context: String,
    pub confidence: Confidence,
    pub classification_detail: String,
    pub dominant_group: Option<PlaceGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub context: String,
    pub road_type: String,
    pub near_junction: bool,
    pub pedestrian_friendly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dwell {
    pub category: DwellCategory,
    pub confidence: f32,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingSummary {
    pub radius_m: u32,
    pub unique_place_count: u32,
    pub group_counts: std::collections::BTreeMap<String, u32>,
    pub expanded: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RingAnalysis {
    pub ring1: RingSummary,
    pub ring2: RingSummary,
    pub ring3: RingSummary,
    #[serde(rename = "ring1_5", skip_serializing_if = "Option::is_none")]
    pub ring1_5: Option<RingSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    pub computed_at: DateTime<Utc>,
    pub api_calls_made: u32,
    pub cached: bool,
    pub processing_time_ms: u64,
    pub version: String,
    pub error: Option<String>,
    pub fallback: bool,
}

/// Canonical output of the profiler (spec §3, §6 "Area profile canonical JSON").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaProfile {
    pub coordinates: Coordinates,
    pub geo_context: GeoContext,
    pub area: AreaBlock,
    pub movement: Movement,
    pub dwell_category: DwellCategory,
    pub dwell_confidence: f32,
    pub dwell_score: f32,
    pub dominance_ratio: f32,
    pub ring_analysis: RingAnalysis,
    pub reasoning: Vec<String>,
    pub metadata: ProfileMetadata,
}

impl AreaProfile {
    /// Top-level aliases preserved for backward compatibility, per spec §6.
    pub fn to_canonical_json(&self) -> serde_json::Value {
        let mut v = serde_json::to_value(self).expect("AreaProfile always serializes");
        if let Some(obj) = v.as_object_mut() {
            obj.insert("primaryType".to_string(), serde_json::json!(self.area.primary_type));
            obj.insert("areaContext".to_string(), serde_json::json!(self.area.context));
            obj.insert(
                "movementType".to_string(),
                serde_json::json!(self.movement.movement_type.as_str()),
            );
        }
        v
    }
}
