use serde::Deserialize;

use super::provider::{JsonCompletionRequest, LlmMessage, LlmProvider};

/// The four gateway fields collected one at a time in `/chat-open` normal mode
/// (SPEC_FULL §10, grounded on `original_source/.../prompts/gateway_prompt.py`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayField {
    Location,
    StartDate,
    EndDate,
    BudgetRange,
}

impl GatewayField {
    fn as_str(&self) -> &'static str {
        match self {
            GatewayField::Location => "location",
            GatewayField::StartDate => "start_date",
            GatewayField::EndDate => "end_date",
            GatewayField::BudgetRange => "budget_range",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GatewayDraft {
    pub location: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub budget_range: Option<String>,
}

impl GatewayDraft {
    fn next_unfilled(&self) -> Option<GatewayField> {
        if self.location.is_empty() {
            Some(GatewayField::Location)
        } else if self.start_date.is_none() {
            Some(GatewayField::StartDate)
        } else if self.end_date.is_none() {
            Some(GatewayField::EndDate)
        } else if self.budget_range.is_none() {
            Some(GatewayField::BudgetRange)
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.next_unfilled().is_none()
    }
}

#[derive(Debug, Deserialize)]
struct GatewayCollectionResponse {
    field_collected: Option<String>,
    value: Option<serde_json::Value>,
    #[serde(default)]
    next_field: Option<String>,
    ask: String,
}

/// Strict guardrails against skipping ahead: the prompt only ever asks about the
/// single next unfilled field, never accepting or requesting a later one early.
pub async fn collect_next(
    llm: &dyn LlmProvider,
    model: &str,
    draft: &GatewayDraft,
    user_message: &str,
) -> (GatewayDraft, String) {
    let mut draft = draft.clone();
    let Some(current_field) = draft.next_unfilled() else {
        return (draft, "Your campaign gateway is already complete.".to_string());
    };

    let system = format!(
        "RULES: collect exactly one gateway field per turn, in this fixed order: location, start_date, end_date, budget_range.\n\
         Never ask about or accept a field other than the CURRENT FIELD below, even if the user volunteers it early — \
         acknowledge it but still ask for the current field.\n\
         CURRENT FIELD: {}\n\
         OUTPUT SCHEMA (strict JSON): {{\"field_collected\": string|null, \"value\": string|string[]|null, \
         \"next_field\": string|null, \"ask\": string}}",
        current_field.as_str()
    );

    let request = JsonCompletionRequest {
        messages: vec![LlmMessage::system(system), LlmMessage::user(user_message.to_string())],
        temperature: 0.1,
        model: model.to_string(),
        allow_web_search: false,
    };

    let fallback_ask = format!("Could you share the campaign's {}?", current_field.as_str().replace('_', " "));

    let Ok(response) = llm.complete_json(request).await else {
        return (draft, fallback_ask);
    };
    let Ok(parsed) = serde_json::from_str::<GatewayCollectionResponse>(&response.raw) else {
        return (draft, fallback_ask);
    };

    if parsed.field_collected.as_deref() == Some(current_field.as_str()) {
        if let Some(value) = parsed.value {
            apply_value(&mut draft, current_field, value);
        }
    }

    let ask = if draft.next_unfilled().is_some() { parsed.ask } else { "Thanks — I have everything I need to start finding screens.".to_string() };

    (draft, ask)
}

fn apply_value(draft: &mut GatewayDraft, field: GatewayField, value: serde_json::Value) {
    match field {
        GatewayField::Location => {
            draft.location = match value {
                serde_json::Value::Array(items) => items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
                serde_json::Value::String(s) => vec![s],
                _ => draft.location.clone(),
            };
        }
        GatewayField::StartDate => draft.start_date = value.as_str().map(str::to_string),
        GatewayField::EndDate => draft.end_date = value.as_str().map(str::to_string),
        GatewayField::BudgetRange => draft.budget_range = value.as_str().map(str::to_string).or(Some(value.to_string())),
    }
}
