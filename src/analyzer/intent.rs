//! Intent classification for incoming questions

use serde::Serialize;

/// What kind of answer the question is after. Drives backend selection,
/// context formatting, and model choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Workflow,
    JiraOnly,
    Aggregation,
    Listing,
    Comparison,
    CurrentSprint,
    General,
}

impl QueryIntent {
    pub fn is_workflow(&self) -> bool {
        matches!(self, QueryIntent::Workflow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Workflow => "workflow",
            QueryIntent::JiraOnly => "jira_only",
            QueryIntent::Aggregation => "aggregation",
            QueryIntent::Listing => "listing",
            QueryIntent::Comparison => "comparison",
            QueryIntent::CurrentSprint => "current_sprint",
            QueryIntent::General => "general",
        }
    }
}

impl std::fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const PROCESS_TERMS: &[&str] = &[
    "workflow", "work flow", "process", "how does", "how do", "explain", "describe", "what is",
];

const DIAGRAM_TERMS: &[&str] = &[
    "diagram", "flowchart", "mermaid", "dataflow", "data flow", "architecture", "flow",
];

const STRONG_PROCESS_TERMS: &[&str] = &["workflow", "work flow", "how does", "how do"];

const TICKET_TERMS: &[&str] = &[
    "ticket", "tickets", "issue", "issues", "story", "stories", "epic", "epics", "bug", "bugs",
    "task", "tasks",
];

const AGGREGATION_TERMS: &[&str] = &["count", "sum", "total", "how many", "aggregate"];

const LISTING_TERMS: &[&str] = &["list", "show", "find", "get", "all"];

const COMPARISON_TERMS: &[&str] = &["difference", "compare", "vs", "versus"];

const SPRINT_TERMS: &[&str] = &["current", "this", "sprint"];

fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| haystack.contains(t))
}

/// True when the raw question contains an upper-case token of length >= 2,
/// which usually names a product or system acronym.
fn has_upper_token(raw: &str) -> bool {
    raw.split_whitespace().any(is_upper_token)
}

fn is_upper_token(word: &str) -> bool {
    if word.chars().count() < 2 {
        return false;
    }
    let mut has_alpha = false;
    for c in word.chars() {
        if c.is_alphabetic() {
            has_alpha = true;
            if !c.is_uppercase() {
                return false;
            }
        }
    }
    has_alpha
}

type IntentRule = fn(&str, &str) -> Option<QueryIntent>;

// Evaluated in order; the first rule with an opinion wins.
const RULES: &[IntentRule] = &[
    workflow_rule,
    ticket_rule,
    aggregation_rule,
    listing_rule,
    comparison_rule,
    current_sprint_rule,
];

/// Process questions are workflow only when they name a concrete subject
/// (an acronym, "the process", or diagram vocabulary) or use an
/// unambiguous process phrasing. Everything else that merely sounds like
/// a definition question stays general.
fn workflow_rule(raw: &str, lower: &str) -> Option<QueryIntent> {
    let process = contains_any(lower, PROCESS_TERMS);
    let diagram = contains_any(lower, DIAGRAM_TERMS);
    if !process && !diagram {
        return None;
    }
    if lower.contains("the process") || has_upper_token(raw) || diagram {
        return Some(QueryIntent::Workflow);
    }
    if contains_any(lower, STRONG_PROCESS_TERMS) {
        return Some(QueryIntent::Workflow);
    }
    Some(QueryIntent::General)
}

/// Ticket vocabulary without aggregation vocabulary is a pure tracker
/// lookup; with it, the aggregation rule below takes over.
fn ticket_rule(_raw: &str, lower: &str) -> Option<QueryIntent> {
    if contains_any(lower, TICKET_TERMS) && !contains_any(lower, AGGREGATION_TERMS) {
        return Some(QueryIntent::JiraOnly);
    }
    None
}

fn aggregation_rule(_raw: &str, lower: &str) -> Option<QueryIntent> {
    contains_any(lower, AGGREGATION_TERMS).then_some(QueryIntent::Aggregation)
}

fn listing_rule(_raw: &str, lower: &str) -> Option<QueryIntent> {
    contains_any(lower, LISTING_TERMS).then_some(QueryIntent::Listing)
}

fn comparison_rule(_raw: &str, lower: &str) -> Option<QueryIntent> {
    contains_any(lower, COMPARISON_TERMS).then_some(QueryIntent::Comparison)
}

fn current_sprint_rule(_raw: &str, lower: &str) -> Option<QueryIntent> {
    contains_any(lower, SPRINT_TERMS).then_some(QueryIntent::CurrentSprint)
}

/// Classify a question. Never fails; anything unmatched is `General`.
pub fn classify(raw: &str, lower: &str) -> QueryIntent {
    RULES
        .iter()
        .find_map(|rule| rule(raw, lower))
        .unwrap_or(QueryIntent::General)
}
