use crate::domain::place::{AuthorityAnchor, AuthorityRejection, Place, PlaceGroup};

use super::tables::ProfilerTables;

/// Detects a dominant anchor within a near radius (C3, spec.md §4.3). Decision order,
/// first match wins.
pub struct AuthorityDetector<'a> {
    tables: &'a ProfilerTables,
}

impl<'a> AuthorityDetector<'a> {
    pub fn new(tables: &'a ProfilerTables) -> Self {
        Self { tables }
    }

    /// Ring-1 authority detection over a deduplicated place list.
    pub fn detect(&self, places: &[Place]) -> (Option<AuthorityAnchor>, Option<AuthorityRejection>) {
        if let Some(anchor) = self.medical_institute_override(places) {
            return (Some(anchor), None);
        }
        if let Some(anchor) = self.hospital_precedence(places) {
            return (Some(anchor), None);
        }
        self.standard_anchors(places, false)
    }

    /// Ring 1.5: only called when ring-1 found nothing. Searches each radius in
    /// order, stopping at the first hit; unlike ring-1 this never checks the
    /// medical-institute or hospital-precedence shortcuts — only major anchors and
    /// the generic-transit name match (spec.md §4.3 step 4).
    pub fn detect_extended(&self, places_by_radius: &[(u32, Vec<Place>)]) -> Option<AuthorityAnchor> {
        for (_, places) in places_by_radius {
            if let (Some(mut anchor), _) = self.standard_anchors(places, true) {
                anchor.extended_ring1_5 = true;
                return Some(anchor);
            }
            if let Some(anchor) = self.generic_transit_match(places) {
                return Some(anchor);
            }
        }
        None
    }

    fn medical_institute_override(&self, places: &[Place]) -> Option<AuthorityAnchor> {
        const HOSPITAL_RATING_THRESHOLD: u32 = 100;

        places.iter().find_map(|place| {
            let types = place.types_lower();
            let has_institute_type = types.iter().any(|t| t == "university" || t == "college");
            if !has_institute_type {
                return None;
            }

            let name = place.name_lower();
            let has_health_signal = types.iter().any(|t| t == "hospital" || t == "doctor")
                || self.tables.medical_institute_name_patterns.iter().any(|p| name.contains(p.as_str()));
            if !has_health_signal {
                return None;
            }

            if place.user_ratings_total < HOSPITAL_RATING_THRESHOLD {
                return None;
            }

            Some(AuthorityAnchor {
                group: PlaceGroup::Healthcare,
                context_label: "Medical Institute Zone".to_string(),
                source_place_id: place.place_id.clone(),
                source_place_name: place.name.clone(),
                rating_count: place.user_ratings_total,
                passed_significance: true,
                passed_name_pattern: true,
                extended_ring1_5: false,
            })
        })
    }

    fn hospital_precedence(&self, places: &[Place]) -> Option<AuthorityAnchor> {
        const HOSPITAL_RATING_THRESHOLD: u32 = 100;

        places.iter().find_map(|place| {
            if !place.types_lower().iter().any(|t| t == "hospital") {
                return None;
            }
            if place.user_ratings_total < HOSPITAL_RATING_THRESHOLD {
                return None;
            }
            Some(AuthorityAnchor {
                group: PlaceGroup::Healthcare,
                context_label: "Hospital Entrance Zone".to_string(),
                source_place_id: place.place_id.clone(),
                source_place_name: place.name.clone(),
                rating_count: place.user_ratings_total,
                passed_significance: true,
                passed_name_pattern: true,
                extended_ring1_5: false,
            })
        })
    }

    fn standard_anchors(&self, places: &[Place], major: bool) -> (Option<AuthorityAnchor>, Option<AuthorityRejection>) {
        let mut rejection = None;

        for rule in &self.tables.authority_anchors {
            let threshold = if major { rule.major_significance } else { rule.significance };
            for place in places {
                if !place.types_lower().iter().any(|t| t == &rule.place_type) {
                    continue;
                }

                let Some(group) = PlaceGroup::from_str(&rule.group) else { continue };

                if place.user_ratings_total < threshold {
                    if rejection.is_none() {
                        rejection = Some(AuthorityRejection {
                            place_name: place.name.clone(),
                            attempted_group: group,
                            reason: "below significance threshold".to_string(),
                        });
                    }
                    continue;
                }

                let name_pattern_required = place.user_ratings_total < threshold * 2;
                let name_matches = rule.name_patterns.iter().any(|p| place.name_lower().contains(p.as_str()));

                if name_pattern_required && !name_matches {
                    if rejection.is_none() {
                        rejection = Some(AuthorityRejection {
                            place_name: place.name.clone(),
                            attempted_group: group,
                            reason: "failed name-pattern validation".to_string(),
                        });
                    }
                    continue;
                }

                return (
                    Some(AuthorityAnchor {
                        group,
                        context_label: rule.context_label.clone(),
                        source_place_id: place.place_id.clone(),
                        source_place_name: place.name.clone(),
                        rating_count: place.user_ratings_total,
                        passed_significance: true,
                        passed_name_pattern: name_matches || !name_pattern_required,
                        extended_ring1_5: false,
                    }),
                    None,
                );
            }
        }

        (None, rejection)
    }

    fn generic_transit_match(&self, places: &[Place]) -> Option<AuthorityAnchor> {
        const TRANSIT_RATING_THRESHOLD: u32 = 150;

        places.iter().find_map(|place| {
            let types = place.types_lower();
            if !types.iter().any(|t| t == "transit_station" || t == "bus_station") {
                return None;
            }
            if place.user_ratings_total < TRANSIT_RATING_THRESHOLD {
                return None;
            }
            let name = place.name_lower();
            if !self.tables.generic_transit_name_patterns.iter().any(|p| name.contains(p.as_str())) {
                return None;
            }
            Some(AuthorityAnchor {
                group: PlaceGroup::Transit,
                context_label: "Transit Hub".to_string(),
                source_place_id: place.place_id.clone(),
                source_place_name: place.name.clone(),
                rating_count: place.user_ratings_total,
                passed_significance: true,
                passed_name_pattern: true,
                extended_ring1_5: true,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, rating: u32, types: &[&str]) -> Place {
        Place {
            place_id: name.to_string(),
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
            latitude: 0.0,
            longitude: 0.0,
            user_ratings_total: rating,
            editorial_summary: None,
            rating: None,
        }
    }

    #[test]
    fn hospital_precedence_wins_over_standard_anchor() {
        let tables = ProfilerTables::load(None).unwrap();
        let detector = AuthorityDetector::new(&tables);
        let places = vec![place("City General Hospital", 250, &["hospital"])];
        let (anchor, _) = detector.detect(&places);
        let anchor = anchor.expect("anchor found");
        assert_eq!(anchor.group, PlaceGroup::Healthcare);
        assert_eq!(anchor.context_label, "Hospital Entrance Zone");
    }

    #[test]
    fn low_rating_hospital_falls_through_to_standard_anchor_rejection() {
        let tables = ProfilerTables::load(None).unwrap();
        let detector = AuthorityDetector::new(&tables);
        let places = vec![place("Tiny Clinic", 10, &["hospital"])];
        let (anchor, rejection) = detector.detect(&places);
        assert!(anchor.is_none());
        assert!(rejection.is_some());
    }

    #[test]
    fn medical_institute_override_requires_both_signals() {
        let tables = ProfilerTables::load(None).unwrap();
        let detector = AuthorityDetector::new(&tables);
        let places = vec![place("AIIMS Medical College", 500, &["university"])];
        let (anchor, _) = detector.detect(&places);
        let anchor = anchor.expect("override applies via name pattern");
        assert_eq!(anchor.context_label, "Medical Institute Zone");
    }
}
