use serde::{Deserialize, Serialize};

/// A raw record from the maps provider. Immutable; lives only within a single
/// profiler invocation (never persisted on its own).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub types: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub user_ratings_total: u32,
    pub editorial_summary: Option<String>,
    pub rating: Option<f32>,
}

impl Place {
    pub fn types_lower(&self) -> Vec<String> {
        self.types.iter().map(|t| t.to_lowercase()).collect()
    }

    pub fn name_lower(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Fixed enumeration of place-groups. `GROUP_PRIORITY` (declared in the profiler
/// config table) breaks ties when a place maps to more than one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceGroup {
    Transit,
    Healthcare,
    Religious,
    Education,
    Government,
    Finance,
    Office,
    Retail,
    FoodBeverage,
    Entertainment,
    Sports,
    Hospitality,
    Tourism,
    Industrial,
    Residential,
}

impl PlaceGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceGroup::Transit => "TRANSIT",
            PlaceGroup::Healthcare => "HEALTHCARE",
            PlaceGroup::Religious => "RELIGIOUS",
            PlaceGroup::Education => "EDUCATION",
            PlaceGroup::Government => "GOVERNMENT",
            PlaceGroup::Finance => "FINANCE",
            PlaceGroup::Office => "OFFICE",
            PlaceGroup::Retail => "RETAIL",
            PlaceGroup::FoodBeverage => "FOOD_BEVERAGE",
            PlaceGroup::Entertainment => "ENTERTAINMENT",
            PlaceGroup::Sports => "SPORTS",
            PlaceGroup::Hospitality => "HOSPITALITY",
            PlaceGroup::Tourism => "TOURISM",
            PlaceGroup::Industrial => "INDUSTRIAL",
            PlaceGroup::Residential => "RESIDENTIAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "TRANSIT" => PlaceGroup::Transit,
            "HEALTHCARE" => PlaceGroup::Healthcare,
            "RELIGIOUS" => PlaceGroup::Religious,
            "EDUCATION" => PlaceGroup::Education,
            "GOVERNMENT" => PlaceGroup::Government,
            "FINANCE" => PlaceGroup::Finance,
            "OFFICE" => PlaceGroup::Office,
            "RETAIL" => PlaceGroup::Retail,
            "FOOD_BEVERAGE" => PlaceGroup::FoodBeverage,
            "ENTERTAINMENT" => PlaceGroup::Entertainment,
            "SPORTS" => PlaceGroup::Sports,
            "HOSPITALITY" => PlaceGroup::Hospitality,
            "TOURISM" => PlaceGroup::Tourism,
            "INDUSTRIAL" => PlaceGroup::Industrial,
            "RESIDENTIAL" => PlaceGroup::Residential,
            _ => return None,
        })
    }
}

impl std::fmt::Display for PlaceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated significant landmark produced by the Authority Detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityAnchor {
    pub group: PlaceGroup,
    pub context_label: String,
    pub source_place_id: String,
    pub source_place_name: String,
    pub rating_count: u32,
    pub passed_significance: bool,
    pub passed_name_pattern: bool,
    /// Set when the anchor was found only in the Ring 1.5 extended search.
    pub extended_ring1_5: bool,
}

/// Diagnostic record of a candidate that failed significance or name validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityRejection {
    pub place_name: String,
    pub attempted_group: PlaceGroup,
    pub reason: String,
}
