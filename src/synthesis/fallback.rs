//! Deterministic fallback responses
//!
//! When no provider can synthesize, the caller still gets a useful
//! answer built from whatever the backends returned, with sources
//! attributed only to backends that produced data.

use tracing::info;

use crate::metrics::METRICS;
use crate::router::RouteResults;

use super::{SynthesisResult, TokenUsage};

pub fn respond(results: &RouteResults, jql_link: Option<&str>) -> SynthesisResult {
    let mut parts: Vec<String> = Vec::new();

    let tickets = &results.tickets.items;
    if !tickets.is_empty() {
        parts.push(format!("Found {} JIRA tickets.", tickets.len()));
        if !results.ticket_summary.is_empty() {
            parts.push("\nSummary:".to_string());
            for item in results.ticket_summary.iter().take(5) {
                parts.push(format!("- {}", item));
            }
        }
    }

    let pages = &results.wiki.items;
    if !pages.is_empty() {
        parts.push(format!("\nFound {} Confluence pages:", pages.len()));
        for page in pages.iter().take(3) {
            parts.push(format!("- [{}]({})", page.title(), page.url()));
        }
    }

    let mut sources: Vec<String> = Vec::new();
    if !tickets.is_empty() {
        sources.push(
            jql_link
                .map(str::to_string)
                .unwrap_or_else(|| "JIRA API".to_string()),
        );
    }
    if !pages.is_empty() {
        sources.push("Confluence API".to_string());
    }
    if !results.code.items.is_empty() {
        sources.push("GitHub API".to_string());
    }
    if !results.helpdesk.items.is_empty() {
        sources.push("Document360 API".to_string());
    }

    let response = if parts.is_empty() {
        "No data available for this query.".to_string()
    } else {
        parts.join("\n")
    };

    METRICS.record_fallback();
    info!(
        sources = sources.len(),
        "Serving fallback response without synthesis"
    );

    SynthesisResult {
        response,
        sources,
        synthesis_method: "fallback".to_string(),
        model_used: "none".to_string(),
        provider: "none".to_string(),
        token_usage: TokenUsage::default(),
        duration_seconds: 0.0,
    }
}
