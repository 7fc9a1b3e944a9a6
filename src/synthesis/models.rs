//! Model catalog and selection
//!
//! Three cost tiers across two providers. Selection weighs the question
//! intent and how much retrieved material the prompt will carry; an
//! explicit user preference short-circuits it.

use serde::Serialize;

use crate::analyzer::QueryIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Gemini,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelChoice {
    pub provider: ProviderId,
    pub model: &'static str,
}

impl ModelChoice {
    /// Tag reported as `synthesis_method`, e.g. `openai_gpt_4o_mini`.
    pub fn method_tag(&self) -> String {
        format!("{}_{}", self.provider.as_str(), self.model.replace('-', "_"))
    }
}

pub const CHEAP: ModelChoice = ModelChoice {
    provider: ProviderId::OpenAi,
    model: "gpt-4o-mini",
};

pub const MID: ModelChoice = ModelChoice {
    provider: ProviderId::Gemini,
    model: "gemini-2.0-flash-001",
};

pub const PREMIUM: ModelChoice = ModelChoice {
    provider: ProviderId::OpenAi,
    model: "gpt-4o",
};

/// Signals available at selection time.
#[derive(Debug, Clone, Copy)]
pub struct SelectionInputs {
    pub intent: QueryIntent,
    pub ticket_count: usize,
    pub wiki_count: usize,
    pub code_count: usize,
}

fn mid_or_premium(gemini_available: bool) -> ModelChoice {
    if gemini_available {
        MID
    } else {
        PREMIUM
    }
}

/// Pick a model tier for this request. Everything that needs real
/// reasoning gets the mid tier; the cheap tier is the default.
pub fn select(inputs: &SelectionInputs, gemini_available: bool) -> ModelChoice {
    match inputs.intent {
        QueryIntent::Workflow | QueryIntent::Comparison => {
            return mid_or_premium(gemini_available);
        }
        QueryIntent::Aggregation if inputs.ticket_count > 20 => {
            return mid_or_premium(gemini_available);
        }
        _ => {}
    }
    // Substantial content from multiple sources also earns the mid tier.
    if inputs.wiki_count >= 5 && inputs.code_count >= 3 {
        return mid_or_premium(gemini_available);
    }
    CHEAP
}

/// Parse an explicit model preference. `None` means auto-select; an
/// unrecognized string also falls through to auto-selection.
pub fn parse_preference(preference: Option<&str>, gemini_available: bool) -> Option<ModelChoice> {
    let pref = preference?.trim().to_lowercase();
    if pref.is_empty() || pref == "auto" {
        return None;
    }
    if pref == "gemini-2.0-flash-001" || pref.contains("gemini") {
        return Some(mid_or_premium(gemini_available));
    }
    if pref.contains("gpt-4o-mini") || pref.contains("mini") {
        return Some(CHEAP);
    }
    if pref.contains("gpt-4o") {
        return Some(PREMIUM);
    }
    None
}

/// Dollar cost of a call, from published per-million-token prices.
/// Unknown models are billed at the premium rate.
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let (input_rate, output_rate) = match model {
        "gpt-4o-mini" => (0.15, 0.60),
        "gemini-2.0-flash-001" => (0.075, 0.30),
        _ => (2.50, 10.00),
    };
    (input_tokens as f64 * input_rate + output_tokens as f64 * output_rate) / 1_000_000.0
}
