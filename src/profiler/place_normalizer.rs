use std::collections::BTreeMap;

use crate::domain::place::{Place, PlaceGroup};

use super::tables::ProfilerTables;

/// Maps raw place records to the fixed taxonomy; deduplicates; counts by group (C2,
/// spec.md §4.2).
pub struct PlaceNormalizer<'a> {
    tables: &'a ProfilerTables,
}

impl<'a> PlaceNormalizer<'a> {
    pub fn new(tables: &'a ProfilerTables) -> Self {
        Self { tables }
    }

    /// Intersects a place's types with the group table; ties broken by `GROUP_PRIORITY`.
    pub fn group_of(&self, place: &Place) -> Option<PlaceGroup> {
        let mut candidates: Vec<PlaceGroup> = place
            .types_lower()
            .iter()
            .filter(|t| !self.tables.generic_types.contains(t))
            .filter_map(|t| self.tables.group_of_type(t))
            .collect();
        candidates.dedup();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by_key(|g| {
            self.tables
                .group_priority
                .iter()
                .position(|p| p == g.as_str())
                .unwrap_or(usize::MAX)
        });
        candidates.into_iter().next()
    }

    /// (1) unique by place id; (2) among places sharing a rounded-coordinate key, drop
    /// any whose normalized name matches an already-kept name at or above the
    /// similarity threshold.
    pub fn dedupe(&self, places: &[Place]) -> Vec<Place> {
        const COORD_PRECISION: u32 = 5;
        const NAME_SIMILARITY_THRESHOLD: f64 = 0.85;

        let mut seen_ids = std::collections::HashSet::new();
        let mut by_coord: BTreeMap<(i64, i64), Vec<String>> = BTreeMap::new();
        let mut kept = Vec::with_capacity(places.len());

        for place in places {
            if !seen_ids.insert(place.place_id.clone()) {
                continue;
            }

            let coord_key = round_coord_key(place.latitude, place.longitude, COORD_PRECISION);
            let normalized = normalize_name(&place.name);

            let bucket = by_coord.entry(coord_key).or_default();
            let is_dup = bucket
                .iter()
                .any(|existing| name_similarity(existing, &normalized) >= NAME_SIMILARITY_THRESHOLD);

            if is_dup {
                continue;
            }

            bucket.push(normalized);
            kept.push(place.clone());
        }

        kept
    }

    /// `(group -> count, unique_place_count)`. Stable under permutation of input (P2).
    pub fn count_by_group(&self, places: &[Place], dedupe: bool) -> (BTreeMap<PlaceGroup, u32>, u32) {
        let working = if dedupe { self.dedupe(places) } else { places.to_vec() };
        let mut counts: BTreeMap<PlaceGroup, u32> = BTreeMap::new();
        for place in &working {
            if let Some(group) = self.group_of(place) {
                *counts.entry(group).or_insert(0) += 1;
            }
        }
        (counts, working.len() as u32)
    }
}

fn round_coord_key(lat: f64, lng: f64, precision: u32) -> (i64, i64) {
    let scale = 10f64.powi(precision as i32);
    ((lat * scale).round() as i64, (lng * scale).round() as i64)
}

/// Lowercases, strips punctuation, and removes common legal suffixes.
fn normalize_name(name: &str) -> String {
    const SUFFIXES: &[&str] = &["pvt ltd", "private limited", "ltd", "llp", "inc", "co"];
    let lowered = name.to_lowercase();
    let stripped: String = lowered.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace()).collect();
    let mut normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    for suffix in SUFFIXES {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.trim().to_string();
        }
    }
    normalized
}

/// Longest-common-subsequence ratio, used as the name-similarity metric (spec.md §4.2).
fn name_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let lcs = longest_common_subsequence_len(a, b);
    let longest = a.len().max(b.len());
    if longest == 0 {
        0.0
    } else {
        lcs as f64 / longest as f64
    }
}

fn longest_common_subsequence_len(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: &str, name: &str, lat: f64, lng: f64, types: &[&str]) -> Place {
        Place {
            place_id: id.to_string(),
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
            latitude: lat,
            longitude: lng,
            user_ratings_total: 0,
            editorial_summary: None,
            rating: None,
        }
    }

    #[test]
    fn group_of_picks_priority_winner_on_conflict() {
        let tables = ProfilerTables::load(None).unwrap();
        let normalizer = PlaceNormalizer::new(&tables);
        let p = place("1", "X", 0.0, 0.0, &["hospital", "restaurant"]);
        assert_eq!(normalizer.group_of(&p), Some(PlaceGroup::Healthcare));
    }

    #[test]
    fn dedupe_is_idempotent() {
        let tables = ProfilerTables::load(None).unwrap();
        let normalizer = PlaceNormalizer::new(&tables);
        let places = vec![
            place("1", "Apollo Hospital", 13.0827, 80.2707, &["hospital"]),
            place("2", "Apollo Hospitals Pvt Ltd", 13.08271, 80.27071, &["hospital"]),
            place("3", "Another Place", 13.2, 80.3, &["restaurant"]),
        ];
        let once = normalizer.dedupe(&places);
        let twice = normalizer.dedupe(&once);
        assert_eq!(once.len(), twice.len());
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn count_by_group_is_permutation_stable() {
        let tables = ProfilerTables::load(None).unwrap();
        let normalizer = PlaceNormalizer::new(&tables);
        let mut places = vec![
            place("1", "A", 0.0, 0.0, &["hospital"]),
            place("2", "B", 1.0, 1.0, &["restaurant"]),
            place("3", "C", 2.0, 2.0, &["bank"]),
        ];
        let (counts_a, unique_a) = normalizer.count_by_group(&places, true);
        places.reverse();
        let (counts_b, unique_b) = normalizer.count_by_group(&places, true);
        assert_eq!(counts_a, counts_b);
        assert_eq!(unique_a, unique_b);
    }
}
