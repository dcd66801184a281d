use std::collections::BTreeMap;

use crate::domain::area_profile::{AreaBlock, Confidence, Dwell, DwellCategory, MovementType};
use crate::domain::place::{AuthorityAnchor, PlaceGroup};

use super::tables::ProfilerTables;

pub struct ClassificationResult {
    pub area: AreaBlock,
    pub dominance_ratio: f32,
}

/// Combines group counts + optional authority into primary type, confidence, and
/// human-readable context (C5, spec.md §4.5).
pub struct ClassificationEngine<'a> {
    tables: &'a ProfilerTables,
}

impl<'a> ClassificationEngine<'a> {
    pub fn new(tables: &'a ProfilerTables) -> Self {
        Self { tables }
    }

    pub fn classify(
        &self,
        group_counts: &BTreeMap<PlaceGroup, u32>,
        unique_place_count: u32,
        authority: Option<&AuthorityAnchor>,
        ring2_expansion_steps: u32,
    ) -> ClassificationResult {
        if let Some(authority) = authority {
            return ClassificationResult {
                area: AreaBlock {
                    primary_type: authority.group.as_str().to_string(),
                    context: human_context(authority.group.as_str(), "AUTHORITY_OVERRIDE"),
                    confidence: Confidence::High,
                    classification_detail: "AUTHORITY_OVERRIDE".to_string(),
                    dominant_group: Some(authority.group),
                },
                dominance_ratio: 1.0,
            };
        }

        let total: u32 = group_counts.values().sum();
        if total == 0 {
            return ClassificationResult {
                area: AreaBlock {
                    primary_type: "MIXED".to_string(),
                    context: "Diverse Mixed Use".to_string(),
                    confidence: Confidence::Low,
                    classification_detail: "DIVERSE".to_string(),
                    dominant_group: None,
                },
                dominance_ratio: 0.0,
            };
        }

        let mut ranked: Vec<(PlaceGroup, u32)> = group_counts.iter().map(|(g, c)| (*g, *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| {
            let pa = self.priority_index(a.0);
            let pb = self.priority_index(b.0);
            pa.cmp(&pb)
        }));

        let (top_group, top_count) = ranked[0];
        let dominance = top_count as f64 / total as f64;
        let thresholds = &self.tables.dominance_thresholds;

        let (primary_type, detail) = if dominance >= thresholds.dominant {
            (top_group.as_str().to_string(), "DOMINANT".to_string())
        } else if dominance >= thresholds.strong_bias {
            ("MIXED_BIASED".to_string(), format!("STRONG_BIAS_TOWARD_{}", top_group.as_str()))
        } else if dominance >= thresholds.moderate_bias {
            ("MIXED_BIASED".to_string(), format!("MODERATE_BIAS_TOWARD_{}", top_group.as_str()))
        } else if dominance >= thresholds.weak_bias {
            ("MIXED".to_string(), format!("WEAK_BIAS_TOWARD_{}", top_group.as_str()))
        } else if ranked.len() >= 2 {
            let second_ratio = ranked[1].1 as f64 / total as f64;
            if (dominance - second_ratio).abs() < thresholds.co_dominant_gap {
                (
                    "MIXED".to_string(),
                    format!("CO_DOMINANT_{}_{}", top_group.as_str(), ranked[1].0.as_str()),
                )
            } else {
                ("MIXED".to_string(), "DIVERSE".to_string())
            }
        } else {
            ("MIXED".to_string(), "DIVERSE".to_string())
        };

        let effective_unique = unique_place_count.saturating_sub(5 * ring2_expansion_steps);
        let distinct_groups = group_counts.len() as u32;
        let confidence_thresholds = &self.tables.confidence_thresholds;
        let confidence = if effective_unique >= confidence_thresholds.high_unique || distinct_groups >= confidence_thresholds.high_groups {
            Confidence::High
        } else if effective_unique >= confidence_thresholds.medium_unique || distinct_groups >= confidence_thresholds.medium_groups {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        ClassificationResult {
            area: AreaBlock {
                context: human_context(&primary_type, &detail),
                confidence,
                classification_detail: detail,
                dominant_group: Some(top_group),
                primary_type,
            },
            dominance_ratio: dominance as f32,
        }
    }

    fn priority_index(&self, group: PlaceGroup) -> usize {
        self.tables
            .group_priority
            .iter()
            .position(|p| p == group.as_str())
            .unwrap_or(usize::MAX)
    }

    /// Weighted-average dwell score over ring-2 composition, or the authority's sole
    /// group weight if an authority is present (spec.md §4.5).
    pub fn dwell(
        &self,
        group_counts: &BTreeMap<PlaceGroup, u32>,
        unique_place_count: u32,
        authority: Option<&AuthorityAnchor>,
        movement: MovementType,
    ) -> Dwell {
        let modifier = self.tables.movement_modifier(movement.as_str());

        let (base_weight, confidence) = if let Some(authority) = authority {
            let weight = self.tables.dwell_weight(authority.group);
            let tier_confidence = 0.85 + 0.10 * weight.min(1.0);
            (weight, tier_confidence.clamp(0.85, 0.95))
        } else {
            let total: u32 = group_counts.values().sum();
            if total == 0 {
                (0.3, (unique_place_count as f32 / 25.0).min(1.0))
            } else {
                let weighted: f32 = group_counts
                    .iter()
                    .map(|(g, c)| self.tables.dwell_weight(*g) * (*c as f32 / total as f32))
                    .sum();
                (weighted, (unique_place_count as f32 / 25.0).min(1.0))
            }
        };

        let score = (base_weight + modifier).clamp(0.0, 1.0);
        let bounds = &self.tables.dwell_score_bounds;
        let category = if score >= bounds.long_wait {
            DwellCategory::LongWait
        } else if score >= bounds.medium_wait {
            DwellCategory::MediumWait
        } else {
            DwellCategory::ShortWait
        };

        Dwell { category, confidence, score }
    }
}

/// Fixed lookup for human-readable context strings; `MIXED_BIASED` details expand per
/// spec.md §4.5.
fn human_context(primary_type: &str, detail: &str) -> String {
    if detail == "AUTHORITY_OVERRIDE" {
        return format!("{} Zone", title_case(primary_type));
    }
    if detail == "DOMINANT" {
        return format!("{} Zone", title_case(primary_type));
    }
    if let Some(base) = detail.strip_prefix("STRONG_BIAS_TOWARD_") {
        return format!("Mixed Use (primarily {})", title_case(base));
    }
    if let Some(base) = detail.strip_prefix("MODERATE_BIAS_TOWARD_") {
        return format!("Mixed Use (leaning {})", title_case(base));
    }
    if let Some(base) = detail.strip_prefix("WEAK_BIAS_TOWARD_") {
        return format!("Diverse Mixed Use (slight {})", title_case(base));
    }
    if detail.starts_with("CO_DOMINANT_") {
        return "Diverse Commercial Hub".to_string();
    }
    "Diverse Commercial Hub".to_string()
}

fn title_case(group: &str) -> String {
    group
        .split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(PlaceGroup, u32)]) -> BTreeMap<PlaceGroup, u32> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn dominant_group_wins_above_threshold() {
        let tables = ProfilerTables::load(None).unwrap();
        let engine = ClassificationEngine::new(&tables);
        let group_counts = counts(&[(PlaceGroup::Retail, 60), (PlaceGroup::FoodBeverage, 40)]);
        let result = engine.classify(&group_counts, 100, None, 0);
        assert_eq!(result.area.primary_type, "RETAIL");
        assert_eq!(result.area.classification_detail, "DOMINANT");
    }

    #[test]
    fn authority_present_forces_override() {
        let tables = ProfilerTables::load(None).unwrap();
        let engine = ClassificationEngine::new(&tables);
        let anchor = crate::domain::place::AuthorityAnchor {
            group: PlaceGroup::Healthcare,
            context_label: "Hospital Entrance Zone".to_string(),
            source_place_id: "x".to_string(),
            source_place_name: "X".to_string(),
            rating_count: 200,
            passed_significance: true,
            passed_name_pattern: true,
            extended_ring1_5: false,
        };
        let result = engine.classify(&BTreeMap::new(), 0, Some(&anchor), 0);
        assert_eq!(result.area.primary_type, "HEALTHCARE");
        assert_eq!(result.area.classification_detail, "AUTHORITY_OVERRIDE");
    }

    #[test]
    fn dwell_score_is_clamped_to_unit_interval() {
        let tables = ProfilerTables::load(None).unwrap();
        let engine = ClassificationEngine::new(&tables);
        let group_counts = counts(&[(PlaceGroup::Healthcare, 10)]);
        let dwell = engine.dwell(&group_counts, 10, None, MovementType::Pedestrian);
        assert!(dwell.score >= 0.0 && dwell.score <= 1.0);
    }
}
