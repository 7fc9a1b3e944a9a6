//! Wiki search connector
//!
//! Semantic search over the internal wiki. The query string is derived
//! from the analysis rather than passed through raw, so follow-up
//! questions keep hitting the pages the conversation is actually about.

use std::time::Instant;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::analyzer::QueryAnalysis;
use crate::api::models::ChatTurn;
use crate::config::{BackendConfig, VocabularyConfig};
use crate::metrics::METRICS;

use super::{send_error, BackendResult, ConnectorError, WikiPage};

const OMNICHANNEL_QUERY: &str = "omnichannel audience OA";

pub struct WikiSearchClient {
    http: Client,
    config: BackendConfig,
    vocabulary: VocabularyConfig,
}

impl WikiSearchClient {
    pub fn new(config: BackendConfig, vocabulary: VocabularyConfig) -> Result<Self, ConnectorError> {
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

    pub async fn search(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
        history: &[ChatTurn],
        workflow_subject: Option<&str>,
    ) -> BackendResult<WikiPage> {
        let started = Instant::now();
        let query = self.build_query(question, analysis, history, workflow_subject);
        debug!(%query, "Querying wiki search");

        let result = self.post(&query).await;
        match result {
            Ok(pages) => {
                METRICS.record_backend("wiki", true, started.elapsed().as_secs_f64());
                BackendResult::ok(pages, Some(query), started)
            }
            Err(e) => {
                warn!(error = %e, "Wiki search failed");
                METRICS.record_backend("wiki", false, started.elapsed().as_secs_f64());
                BackendResult::failed(Some(query), started)
            }
        }
    }

    fn build_query(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
        history: &[ChatTurn],
        workflow_subject: Option<&str>,
    ) -> String {
        let lower = question.to_lowercase();

        // Recent turns carry the topic for pronoun-style follow-ups.
        let recent: String = history
            .iter()
            .rev()
            .take(3)
            .map(|turn| turn.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        let optimization_context = self.vocabulary.mentions_optimization(&recent);
        let omnichannel_context =
            self.vocabulary.mentions_omnichannel(&recent) || recent.contains("audience");

        if analysis.intent.is_workflow() {
            return workflow_subject
                .map(str::to_string)
                .or_else(|| analysis.keywords.first().cloned())
                .unwrap_or_else(|| question.to_string());
        }
        if self.vocabulary.mentions_optimization(&lower) {
            if lower.contains("factor") {
                return format!("{} factors", self.vocabulary.optimization_summary);
            }
            return self.vocabulary.optimization_summary.clone();
        }
        if lower.contains("factor") && optimization_context {
            return format!("{} factors", self.vocabulary.optimization_summary);
        }
        if self.vocabulary.mentions_omnichannel(&lower) || lower.contains("audience") {
            return OMNICHANNEL_QUERY.to_string();
        }
        if omnichannel_context {
            return OMNICHANNEL_QUERY.to_string();
        }
        if !analysis.keywords.is_empty() {
            return analysis
                .keywords
                .iter()
                .take(2)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
        }
        question.to_string()
    }

    async fn post(&self, query: &str) -> Result<Vec<WikiPage>, ConnectorError> {
        let response = self
            .http
            .post(format!("{}/search", self.config.url.trim_end_matches('/')))
            .json(&json!({
                "query": query,
                "max_results": 25,
                "min_similarity": 0.01,
            }))
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

        let body: WikiResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;
        Ok(body.results)
    }
}

#[derive(Debug, serde::Deserialize)]
struct WikiResponse {
    #[serde(default)]
    results: Vec<WikiPage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::glossary::GlossarySnapshot;
    use chrono::{TimeZone, Utc};

    fn client() -> WikiSearchClient {
        WikiSearchClient::new(BackendConfig::default(), VocabularyConfig::default()).unwrap()
    }

    fn query_for(question: &str, history: &[ChatTurn], subject: Option<&str>) -> String {
        let analysis = analyze(
            question,
            &GlossarySnapshot::default(),
            &VocabularyConfig::default(),
            Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap(),
        );
        client().build_query(question, &analysis, history, subject)
    }

    #[test]
    fn test_workflow_query_uses_subject() {
        let q = query_for("explain the PPA workflow", &[], Some("PPA"));
        assert_eq!(q, "PPA");
    }

    #[test]
    fn test_optimization_factor_query() {
        let q = query_for("what factors does adaptive optimization use", &[], None);
        assert_eq!(q, "AO factors");
    }

    #[test]
    fn test_follow_up_inherits_optimization_topic() {
        let history = vec![
            ChatTurn {
                role: "user".to_string(),
                content: "tell me about adaptive optimization".to_string(),
            },
            ChatTurn {
                role: "assistant".to_string(),
                content: "AO tunes bids automatically.".to_string(),
            },
        ];
        let q = query_for("which factors does it consider", &history, None);
        assert_eq!(q, "AO factors");
    }

    #[test]
    fn test_audience_question_maps_to_omnichannel() {
        let q = query_for("how are audience segments built", &[], None);
        assert_eq!(q, "omnichannel audience OA");
    }

    #[test]
    fn test_default_uses_keywords() {
        let q = query_for("deal curation pipeline status", &[], None);
        assert_eq!(q, "deal curation");
    }
}
