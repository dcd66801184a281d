use serde::Deserialize;
use uuid::Uuid;

use crate::domain::screen::{CreativeBrief, Screen};
use crate::domain::session::CampaignContext;

use super::provider::{JsonCompletionRequest, LlmMessage, LlmProvider};

#[derive(Debug, Deserialize)]
struct CreativeResponse {
    headline: String,
    body_copy: String,
    visual_direction: String,
    recommended_duration_sec: u32,
    #[serde(default)]
    compliance_notes: Vec<String>,
}

fn fallback(screen_id: Uuid) -> CreativeBrief {
    CreativeBrief {
        screen_id,
        headline: "Your brand, front and center.".to_string(),
        body_copy: "A clean, high-contrast layout suited to this screen's environment.".to_string(),
        visual_direction: "Bold typography, brand colors, minimal copy.".to_string(),
        recommended_duration_sec: 10,
        compliance_notes: Vec::new(),
    }
}

/// One creative brief per requested screen, seeded with campaign context + screen
/// spec + area profile (SPEC_FULL §3/§10, grounded on
/// `original_source/.../prompts/creative_prompt.py`).
pub async fn suggest(llm: &dyn LlmProvider, model: &str, campaign: &CampaignContext, screen: &Screen) -> CreativeBrief {
    let restricted = screen.restricted_ad_categories.join(", ");
    let area = screen
        .area_profile
        .as_ref()
        .map(|p| format!("{} ({})", p.area.context, p.movement.context))
        .unwrap_or_else(|| "unprofiled area".to_string());

    let system = format!(
        "RULES: produce a creative brief appropriate to the screen's environment and any restricted ad categories. \
         Never suggest content in a restricted category.\n\
         CAMPAIGN: product_category={:?}, brand_objective={:?}\n\
         SCREEN: environment={}, area={}, restricted_categories=[{}]\n\
         OUTPUT SCHEMA (strict JSON): {{\"headline\": string, \"body_copy\": string, \"visual_direction\": string, \
         \"recommended_duration_sec\": number, \"compliance_notes\": string[]}}",
        campaign.product_category, campaign.brand_objective, screen.hardware.environment, area, restricted,
    );

    let request = JsonCompletionRequest {
        messages: vec![LlmMessage::system(system)],
        temperature: 0.6,
        model: model.to_string(),
        allow_web_search: false,
    };

    match llm.complete_json(request).await {
        Ok(response) => match serde_json::from_str::<CreativeResponse>(&response.raw) {
            Ok(parsed) => CreativeBrief {
                screen_id: screen.id,
                headline: parsed.headline,
                body_copy: parsed.body_copy,
                visual_direction: parsed.visual_direction,
                recommended_duration_sec: parsed.recommended_duration_sec,
                compliance_notes: parsed.compliance_notes,
            },
            Err(_) => fallback(screen.id),
        },
        Err(_) => fallback(screen.id),
    }
}
