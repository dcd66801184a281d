use serde::Deserialize;
use std::sync::Arc;

use crate::domain::area_profile::AreaProfile;
use crate::domain::place::Place;
use crate::llm::provider::{JsonCompletionRequest, LlmMessage, LlmProvider};

use super::maps_client::MapsProvider;
use super::tables::ProfilerTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerMode {
    Rules,
    Hybrid,
    FullLlm,
    ResearchAgent,
}

impl ProfilerMode {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "full_llm" => ProfilerMode::FullLlm,
            "research_agent" => ProfilerMode::ResearchAgent,
            "rules" => ProfilerMode::Rules,
            _ => ProfilerMode::Hybrid,
        }
    }
}

/// Chooses between rules / hybrid / full-LLM / research-agent and, when a mode calls
/// for it, refines the rules-based `AreaProfile` via structured LLM calls (C6,
/// spec.md §4.6).
pub struct LlmProfilerRouter {
    llm: Option<Arc<dyn LlmProvider>>,
    maps: Arc<dyn MapsProvider>,
    tables: Arc<ProfilerTables>,
    model: String,
}

impl LlmProfilerRouter {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, maps: Arc<dyn MapsProvider>, tables: Arc<ProfilerTables>, model: String) -> Self {
        Self { llm, maps, tables, model }
    }

    /// Hybrid trigger conditions per spec.md §4.6.
    fn needs_refinement(&self, profile: &AreaProfile) -> bool {
        use crate::domain::area_profile::Confidence;

        let dominance = profile.dominance_ratio as f64;
        let unique = profile.ring_analysis.ring2.unique_place_count;

        matches!(profile.area.confidence, Confidence::Low)
            || (dominance < 0.28 && group_gap(profile) < 0.08)
            || (unique < 5 && dominance < 0.40)
            || (matches!(profile.area.confidence, Confidence::Medium) && dominance < 0.25 && unique < 8)
    }

    pub async fn apply(&self, mode: ProfilerMode, mut profile: AreaProfile, ring1_places: &[Place]) -> AreaProfile {
        let Some(llm) = &self.llm else {
            if mode != ProfilerMode::Rules {
                profile.metadata.fallback = true;
            }
            return profile;
        };

        match mode {
            ProfilerMode::Rules => profile,
            ProfilerMode::Hybrid => {
                if self.needs_refinement(&profile) {
                    self.hybrid_refine(llm.as_ref(), profile).await
                } else {
                    profile
                }
            }
            ProfilerMode::FullLlm => self.full_llm_classify(llm.as_ref(), profile, ring1_places).await,
            ProfilerMode::ResearchAgent => self.research_agent(llm.as_ref(), profile, ring1_places).await,
        }
    }

    async fn hybrid_refine(&self, llm: &dyn LlmProvider, mut profile: AreaProfile) -> AreaProfile {
        let prompt = format!(
            "RULES: Return strict JSON {{\"should_override\": bool, \"primaryType\": string, \"context\": string, \"rationale\": string}}.\n\
             CONTEXT: location={}, ring2_groups={:?}, dominance={:.2}, confidence={:?}\n\
             OUTPUT SCHEMA: {{\"should_override\": bool, \"primaryType\": string, \"context\": string, \"rationale\": string}}",
            profile.geo_context.formatted_address,
            profile.ring_analysis.ring2.group_counts,
            profile.dominance_ratio,
            profile.area.confidence,
        );

        let request = JsonCompletionRequest {
            messages: vec![LlmMessage::system(prompt)],
            temperature: 0.1,
            model: self.model.clone(),
            allow_web_search: false,
        };

        match llm.complete_json(request).await {
            Ok(response) => match serde_json::from_str::<HybridOverride>(&response.raw) {
                Ok(parsed) if parsed.should_override => {
                    profile.area.primary_type = parsed.primary_type;
                    profile.area.context = parsed.context;
                    profile.area.classification_detail = "LLM_OVERRIDE".to_string();
                    profile.reasoning.push(format!("LLM override: {}", parsed.rationale));
                    profile
                }
                Ok(_) => profile,
                Err(e) => {
                    profile.metadata.error = Some(format!("hybrid parse failure: {e}"));
                    profile.metadata.fallback = true;
                    profile
                }
            },
            Err(e) => {
                profile.metadata.error = Some(format!("hybrid LLM call failed: {e}"));
                profile.metadata.fallback = true;
                profile
            }
        }
    }

    async fn full_llm_classify(&self, llm: &dyn LlmProvider, mut profile: AreaProfile, ring1_places: &[Place]) -> AreaProfile {
        let (enriched, _) = self.maps.enrich_places(ring1_places, 5, ring1_places.len()).await;
        let summaries: Vec<String> = enriched
            .iter()
            .filter_map(|p| p.editorial_summary.as_ref().map(|s| format!("{}: {}", p.name, s)))
            .collect();

        let prompt = format!(
            "RULES: classify the surrounding area from the evidence below. Return strict JSON matching the schema.\n\
             CONTEXT: location={}, enriched_places={:?}\n\
             OUTPUT SCHEMA: {{\"primaryType\": string, \"context\": string, \"classificationDetail\": string, \"confidence\": \"high\"|\"medium\"|\"low\"}}",
            profile.geo_context.formatted_address, summaries,
        );

        let request = JsonCompletionRequest {
            messages: vec![LlmMessage::system(prompt)],
            temperature: 0.1,
            model: self.model.clone(),
            allow_web_search: false,
        };

        match llm.complete_json(request).await {
            Ok(response) => match serde_json::from_str::<FullLlmClassification>(&response.raw) {
                Ok(parsed) => {
                    profile.area.primary_type = parsed.primary_type;
                    profile.area.context = parsed.context;
                    profile.area.classification_detail = parsed.classification_detail;
                    profile.area.confidence = parse_confidence(&parsed.confidence);
                    profile
                }
                Err(e) => {
                    profile.metadata.error = Some(format!("full_llm parse failure: {e}"));
                    profile.metadata.fallback = true;
                    profile
                }
            },
            Err(e) => {
                profile.metadata.error = Some(format!("full_llm call failed: {e}"));
                profile.metadata.fallback = true;
                profile
            }
        }
    }

    /// Four-step {PLAN, RESEARCH, CLASSIFY, VERIFY} pipeline. RESEARCH and VERIFY may
    /// use grounded web search. Any step failure falls back to the existing
    /// dominance-based rules profile (spec.md §4.6).
    async fn research_agent(&self, llm: &dyn LlmProvider, mut profile: AreaProfile, ring1_places: &[Place]) -> AreaProfile {
        let plan = match self.research_step(llm, "PLAN", &profile, ring1_places, false).await {
            Ok(r) => r,
            Err(_) => return self.fallback(profile, "research_agent: PLAN step failed"),
        };
        let research = match self.research_step(llm, "RESEARCH", &profile, ring1_places, true).await {
            Ok(r) => r,
            Err(_) => return self.fallback(profile, "research_agent: RESEARCH step failed"),
        };
        let classify = match self.research_step(llm, "CLASSIFY", &profile, ring1_places, false).await {
            Ok(r) => r,
            Err(_) => return self.fallback(profile, "research_agent: CLASSIFY step failed"),
        };
        let verify = match self.research_step(llm, "VERIFY", &profile, ring1_places, true).await {
            Ok(r) => r,
            Err(_) => return self.fallback(profile, "research_agent: VERIFY step failed"),
        };

        match serde_json::from_str::<FullLlmClassification>(&classify) {
            Ok(parsed) => {
                profile.area.primary_type = parsed.primary_type;
                profile.area.context = parsed.context;
                profile.area.classification_detail = "RESEARCH_AGENT".to_string();
                profile.area.confidence = parse_confidence(&parsed.confidence);
                profile.reasoning.push(format!("Research agent plan: {}", truncate(&plan, 200)));
                profile.reasoning.push(format!("Research agent findings: {}", truncate(&research, 200)));
                profile.reasoning.push(format!("Research agent verification: {}", truncate(&verify, 200)));
                profile
            }
            Err(_) => self.fallback(profile, "research_agent: CLASSIFY step returned unparseable JSON"),
        }
    }

    async fn research_step(
        &self,
        llm: &dyn LlmProvider,
        step: &str,
        profile: &AreaProfile,
        ring1_places: &[Place],
        allow_web_search: bool,
    ) -> anyhow::Result<String> {
        let prompt = format!(
            "STEP: {step}\nRULES: produce structured findings for this step only.\n\
             CONTEXT: location={}, ring1_places={}, dominance={:.2}\n\
             OUTPUT SCHEMA: free-form JSON appropriate to the {step} step.",
            profile.geo_context.formatted_address,
            ring1_places.len(),
            profile.dominance_ratio,
        );
        let request = JsonCompletionRequest {
            messages: vec![LlmMessage::system(prompt)],
            temperature: 0.1,
            model: self.model.clone(),
            allow_web_search,
        };
        Ok(llm.complete_json(request).await?.raw)
    }

    fn fallback(&self, mut profile: AreaProfile, reason: &str) -> AreaProfile {
        profile.metadata.error = Some(reason.to_string());
        profile.metadata.fallback = true;
        profile
    }
}

fn group_gap(profile: &AreaProfile) -> f64 {
    let mut counts: Vec<u32> = profile.ring_analysis.ring2.group_counts.values().copied().collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));
    let total: u32 = counts.iter().sum();
    if total == 0 || counts.len() < 2 {
        return 1.0;
    }
    (counts[0] as f64 - counts[1] as f64).abs() / total as f64
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max])
    }
}

fn parse_confidence(raw: &str) -> crate::domain::area_profile::Confidence {
    use crate::domain::area_profile::Confidence;
    match raw {
        "high" => Confidence::High,
        "medium" => Confidence::Medium,
        _ => Confidence::Low,
    }
}

#[derive(Debug, Deserialize)]
struct HybridOverride {
    should_override: bool,
    #[serde(rename = "primaryType")]
    primary_type: String,
    context: String,
    rationale: String,
}

#[derive(Debug, Deserialize)]
struct FullLlmClassification {
    #[serde(rename = "primaryType")]
    primary_type: String,
    context: String,
    #[serde(rename = "classificationDetail", default)]
    classification_detail: String,
    #[serde(default = "default_confidence_str")]
    confidence: String,
}

fn default_confidence_str() -> String {
    "low".to_string()
}
