use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::screen::Screen;

use super::provider::{JsonCompletionRequest, LlmMessage, LlmProvider};

pub const RANKING_BATCH_SIZE: usize = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total: f32,
    pub area_match: f32,
    pub audience_fit: f32,
    pub screen_quality: f32,
    pub context_bonus: f32,
    pub eligibility: f32,
    pub summary: String,
}

impl ScoreBreakdown {
    fn not_scored() -> Self {
        ScoreBreakdown {
            total: 0.0,
            area_match: 0.0,
            audience_fit: 0.0,
            screen_quality: 0.0,
            context_bonus: 0.0,
            eligibility: 0.0,
            summary: "not scored".to_string(),
        }
    }

    fn error() -> Self {
        ScoreBreakdown {
            total: 0.0,
            area_match: 0.0,
            audience_fit: 0.0,
            screen_quality: 0.0,
            context_bonus: 0.0,
            eligibility: 0.0,
            summary: "ranking batch failed".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankedScreen {
    pub screen_id: Uuid,
    pub score: ScoreBreakdown,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    scores: BTreeMap<Uuid, ScoreBreakdown>,
}

/// Compact feature view sent to the ranking prompt: raw scoring fields plus
/// pre-digested "speak" phrases. Never the raw nearby-place counts, so the LLM can't
/// hallucinate specifics from them (spec.md §4.10).
fn describe_screen(screen: &Screen) -> serde_json::Value {
    let profile = screen.area_profile.as_ref();
    serde_json::json!({
        "id": screen.id,
        "city": screen.location.city,
        "environment": screen.hardware.environment,
        "pricePerSlot": screen.base_price_per_slot,
        "areaSpeak": profile.map(|p| p.area.context.clone()).unwrap_or_default(),
        "movementSpeak": profile.map(|p| p.movement.context.clone()).unwrap_or_default(),
        "dwellSpeak": profile.map(|p| format!("{:?} dwell", p.dwell_category)).unwrap_or_default(),
        "nearbyContextSpeak": profile.map(|p| p.area.primary_type.clone()).unwrap_or_default(),
    })
}

fn build_batch_prompt(campaign_context_json: &str, batch: &[&Screen]) -> Vec<LlmMessage> {
    let screens_json: Vec<serde_json::Value> = batch.iter().map(|s| describe_screen(s)).collect();
    let system = format!(
        "RULES: score each screen against the campaign context. Never invent facts not present in the screen data.\n\
         CAMPAIGN CONTEXT: {campaign_context_json}\n\
         SCREENS: {screens_json:?}\n\
         OUTPUT SCHEMA (strict JSON): {{\"scores\": {{ \"<screen_id>\": {{\"total\": number<=100, \"area_match\": number<=30, \
         \"audience_fit\": number<=25, \"screen_quality\": number<=20, \"context_bonus\": number<=15, \"eligibility\": number<=10, \
         \"summary\": string}} }} }}"
    );
    vec![LlmMessage::system(system)]
}

/// Invoked only when Discover returned >=2 screens and the intent isn't in the skip
/// set. Batches of `RANKING_BATCH_SIZE`, dispatched concurrently and merged by union +
/// sort-by-total (spec.md §4.10, §5).
pub async fn run(llm: &dyn LlmProvider, model: &str, campaign_context_json: &str, screens: &[Screen]) -> Vec<RankedScreen> {
    if screens.len() == 1 {
        return vec![RankedScreen {
            screen_id: screens[0].id,
            score: ScoreBreakdown {
                total: 100.0,
                area_match: 30.0,
                audience_fit: 25.0,
                screen_quality: 20.0,
                context_bonus: 15.0,
                eligibility: 10.0,
                summary: "single result, auto-ranked".to_string(),
            },
        }];
    }

    let batches: Vec<Vec<&Screen>> = screens.chunks(RANKING_BATCH_SIZE).map(|c| c.iter().collect()).collect();

    let futures = batches.into_iter().map(|batch| {
        let campaign_context_json = campaign_context_json.to_string();
        let model = model.to_string();
        async move {
            let messages = build_batch_prompt(&campaign_context_json, &batch);
            let request = JsonCompletionRequest { messages, temperature: 0.1, model, allow_web_search: false };
            let ids: Vec<Uuid> = batch.iter().map(|s| s.id).collect();
            match llm.complete_json(request).await {
                Ok(response) => match serde_json::from_str::<BatchResponse>(&response.raw) {
                    Ok(parsed) => ids
                        .into_iter()
                        .map(|id| RankedScreen { screen_id: id, score: parsed.scores.get(&id).cloned().unwrap_or_else(ScoreBreakdown::not_scored) })
                        .collect::<Vec<_>>(),
                    Err(_) => ids.into_iter().map(|id| RankedScreen { screen_id: id, score: ScoreBreakdown::error() }).collect(),
                },
                Err(_) => ids.into_iter().map(|id| RankedScreen { screen_id: id, score: ScoreBreakdown::error() }).collect(),
            }
        }
    });

    let mut merged: Vec<RankedScreen> = join_all(futures).await.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.score.total.partial_cmp(&a.score.total).unwrap_or(std::cmp::Ordering::Equal));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_scored_defaults_to_zero() {
        let s = ScoreBreakdown::not_scored();
        assert_eq!(s.total, 0.0);
        assert_eq!(s.summary, "not scored");
    }
}
