//! Ticket tracker connector
//!
//! Builds the tracker query from layered filter sources: base limits,
//! glossary matches, analyzer hints, then keyword and vocabulary rules.
//! Later layers overwrite earlier ones key by key.

use std::time::Instant;

use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::analyzer::{QueryAnalysis, SearchTerms};
use crate::config::{TrackerConfig, VocabularyConfig};
use crate::glossary::GlossarySnapshot;
use crate::metrics::METRICS;

use super::{send_error, BackendResult, ConnectorError, Ticket};

// Questions with these terms sweep a wide window, so the row cap is raised.
const BROAD_TERMS: &[&str] = &[
    "roadmap", "latest", "omnichannel", "stream", "planned", "rest of", "remainder",
];

const ENGINEERING_TERMS: &[&str] = &["tech debt", "technical debt", "engineering", "bug", "bugs"];

const SPRINT_PHRASES: &[&str] = &["sprint", "planned this", "current sprint", "this sprint"];

const ROADMAP_TERMS: &[&str] = &["roadmap", "epic", "timeline", "planned"];

const AGGREGATION_TERMS: &[&str] = &[
    "count", "sum", "total", "breakdown", "aggregate", "points", "story points",
];

const AGGREGATION_SELECT: &str = "issue_key,summary,story_points,product,stream,product_manager,\
team,current_assignee_name,issue_type_name,sprint_date,release_date";

fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| haystack.contains(t))
}

pub struct TicketSearchClient {
    http: Client,
    config: TrackerConfig,
    vocabulary: VocabularyConfig,
}

impl TicketSearchClient {
    pub fn new(config: TrackerConfig, vocabulary: VocabularyConfig) -> Result<Self, ConnectorError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConnectorError::RequestFailed(format!("Failed to build client: {}", e)))?;
        Ok(Self {
            http,
            config,
            vocabulary,
        })
    }

    /// Query the tracker. Returns the normalized result plus any summary
    /// lines the backend computed for the row set.
    pub async fn search(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
        snapshot: &GlossarySnapshot,
        max_results: u32,
        today: NaiveDate,
    ) -> (BackendResult<Ticket>, Vec<String>) {
        let started = Instant::now();
        let params = self.build_params(question, analysis, snapshot, max_results, today);
        let search_terms = rendered_search_terms(&params);
        debug!(?params, "Querying ticket tracker");

        match self.post(&params).await {
            Ok((tickets, summary)) => {
                METRICS.record_backend("tracker", true, started.elapsed().as_secs_f64());
                (BackendResult::ok(tickets, search_terms, started), summary)
            }
            Err(e) => {
                warn!(error = %e, "Ticket tracker query failed");
                METRICS.record_backend("tracker", false, started.elapsed().as_secs_f64());
                (BackendResult::failed(search_terms, started), Vec::new())
            }
        }
    }

    fn build_params(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
        snapshot: &GlossarySnapshot,
        max_results: u32,
        today: NaiveDate,
    ) -> IndexMap<&'static str, Value> {
        let lower = question.to_lowercase();
        let mut params: IndexMap<&'static str, Value> = IndexMap::new();

        let mut max_results = max_results;
        if contains_any(&lower, BROAD_TERMS) {
            max_results = max_results.max(300);
        } else if lower.contains("workflow") || lower.contains("dataflow") {
            max_results = max_results.max(100);
        }
        params.insert("max_results", json!(max_results));

        // Product-driven work unless the question is about engineering
        // housekeeping or a sprint window.
        let is_sprint_query = contains_any(&lower, SPRINT_PHRASES);
        if !contains_any(&lower, ENGINEERING_TERMS) && !is_sprint_query {
            params.insert("team_driving_work", json!("Product"));
        }

        // Glossary-derived filters.
        if let Some(product) = snapshot.matching_product(&lower) {
            params.insert("product", json!(product));
        }
        if let Some(stream) = snapshot.matching_stream(&lower) {
            params.insert("stream", json!(stream));
        }
        let mut acronym_terms: Vec<String> = Vec::new();
        for (acronym, definition) in snapshot.acronyms() {
            if lower.contains(&acronym.to_lowercase()) {
                acronym_terms.push(acronym.clone());
                acronym_terms.push(definition.clone());
            }
        }
        if !acronym_terms.is_empty() {
            params.insert("search_terms", json!(acronym_terms));
        }
        if self.vocabulary.mentions_omnichannel(&lower) {
            params.insert("summary", json!(self.vocabulary.omnichannel_summary));
            if lower.contains("audience") {
                params.insert("search_terms", json!(["omnichannel", "audience", "OA"]));
            }
        }

        // Analyzer hints overwrite glossary guesses.
        let filters = &analysis.filters;
        if let Some(team) = &filters.team {
            params.insert("team", json!(team));
        }
        if let Some(sprint_date) = &filters.sprint_date {
            params.insert("sprint_date", json!(sprint_date));
        }
        if let Some(release_date) = &filters.release_date {
            params.insert("release_date", json!(release_date));
        }
        if let Some(issue_type) = &filters.issue_type_name {
            params.insert("issue_type_name", json!(issue_type));
        }
        if let Some(summary) = &filters.summary {
            params.insert("summary", json!(summary));
        }
        if let Some(terms) = &filters.search_terms {
            let value = match terms {
                SearchTerms::Phrase(s) => json!(s),
                SearchTerms::List(l) => json!(l),
            };
            params.insert("search_terms", value);
        }

        // Keywords win the search_terms slot when present.
        if !analysis.keywords.is_empty() {
            let joined = analysis
                .keywords
                .iter()
                .take(2)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            params.insert("search_terms", json!(joined));
            if self.vocabulary.mentions_optimization(&lower) {
                params.insert("summary", json!(self.vocabulary.optimization_summary));
            }
        }

        // Roadmap-style questions query epics over a wide sprint window.
        // Sprint questions are exempt: their window stays grain-inclusive.
        if contains_any(&lower, ROADMAP_TERMS) && !is_sprint_query {
            params.insert("issue_type_name", json!("Epic"));
            if !params.contains_key("sprint_date") {
                let window = format!("%{}%,%{}%", today.year() - 1, today.year());
                params.insert("sprint_date", json!(window));
            }
            if self.vocabulary.mentions_optimization(&lower) {
                params.insert("product", json!(self.vocabulary.optimization_product));
                params.insert("stream", json!(self.vocabulary.optimization_stream));
            }
        }

        // Aggregations need the numeric columns projected.
        if contains_any(&lower, AGGREGATION_TERMS) {
            params.insert("select", json!(AGGREGATION_SELECT));
        }

        // Team questions drill to stories in active development.
        if filters.team.is_some() {
            params.insert("issue_type_name", json!("Story"));
            params.insert("development_queue", json!("In Development"));
        }

        params
    }

    async fn post(
        &self,
        params: &IndexMap<&'static str, Value>,
    ) -> Result<(Vec<Ticket>, Vec<String>), ConnectorError> {
        let response = self
            .http
            .post(&self.config.url)
            .json(params)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ConnectorError::Upstream(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        let body: TrackerResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

        let summary = body
            .summary
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        Ok((body.tickets, summary))
    }

    /// Issue-navigator link covering exactly the given tickets.
    pub fn navigator_link(&self, tickets: &[Ticket]) -> Option<String> {
        let keys: Vec<&str> = tickets
            .iter()
            .map(|t| t.issue_key.as_str())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return None;
        }
        let jql = format!("key in ({})", keys.join(","));
        let base = self.config.browse_base_url.trim_end_matches('/');
        reqwest::Url::parse_with_params(&format!("{}/issues/", base), [("jql", jql.as_str())])
            .ok()
            .map(|url| url.to_string())
    }

    pub fn browse_base_url(&self) -> &str {
        self.config.browse_base_url.trim_end_matches('/')
    }
}

#[derive(Debug, serde::Deserialize)]
struct TrackerResponse {
    #[serde(default)]
    tickets: Vec<Ticket>,
    #[serde(default)]
    summary: Vec<Value>,
}

fn rendered_search_terms(params: &IndexMap<&'static str, Value>) -> Option<String> {
    params.get("search_terms").map(|value| match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    })
}
