use serde::{Deserialize, Serialize};

/// The discrete category of what the user just asked for (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    BrandAwareness,
    ScreenSearch,
    Refinement,
    NeedsMoreInfo,
    GatewayEditPending,
    Greeting,
    Clarification,
    ShowAll,
    Revert,
    StartOver,
}

impl Intent {
    /// Call-2 (ranking) is skipped for these intents (spec §4.12 step 10).
    pub fn skips_ranking(&self) -> bool {
        matches!(
            self,
            Intent::GatewayEditPending
                | Intent::Greeting
                | Intent::Clarification
                | Intent::StartOver
                | Intent::NeedsMoreInfo
        )
    }

    /// Screens are suppressed from the reply for these intents (spec §4.12 step 10).
    pub fn suppresses_screens(&self) -> bool {
        matches!(self, Intent::GatewayEditPending | Intent::Greeting | Intent::StartOver)
    }
}

/// Persona inferred from language style; steers reply tone (spec glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Agency,
    BusinessOwner,
}

/// One of 12 master product categories (spec §3 ChatSession.campaign context).
pub const PRODUCT_CATEGORIES: &[&str] = &[
    "FMCG",
    "Automotive",
    "Real Estate",
    "Retail & E-commerce",
    "BFSI",
    "Healthcare & Pharma",
    "Education",
    "Entertainment & Media",
    "Travel & Hospitality",
    "Technology",
    "Food & Beverage",
    "Government & Public Sector",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandObjective {
    Awareness,
    StoreVisit,
    ProductLaunch,
    OfferBased,
}
