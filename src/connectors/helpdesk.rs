//! Helpdesk article connector
//!
//! Client-facing documentation search. Skipped entirely for workflow
//! questions, which are about internal process rather than product help.

use std::time::Instant;

use reqwest::Client;
use tracing::{debug, warn};

use crate::analyzer::QueryAnalysis;
use crate::config::BackendConfig;
use crate::metrics::METRICS;

use super::{send_error, Article, BackendResult, ConnectorError};

pub struct HelpdeskSearchClient {
    http: Client,
    config: BackendConfig,
}

impl HelpdeskSearchClient {
    pub fn new(config: BackendConfig) -> Result<Self, ConnectorError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConnectorError::RequestFailed(format!("Failed to build client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub async fn search(&self, question: &str, analysis: &QueryAnalysis) -> BackendResult<Article> {
        let started = Instant::now();
        let terms = if analysis.keywords.is_empty() {
            question.to_string()
        } else {
            analysis
                .keywords
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ")
        };
        debug!(%terms, "Querying helpdesk search");

        match self.get(&terms).await {
            Ok(articles) => {
                METRICS.record_backend("helpdesk", true, started.elapsed().as_secs_f64());
                BackendResult::ok(articles, Some(terms), started)
            }
            Err(e) => {
                warn!(error = %e, "Helpdesk search failed");
                METRICS.record_backend("helpdesk", false, started.elapsed().as_secs_f64());
                BackendResult::failed(Some(terms), started)
            }
        }
    }

    async fn get(&self, terms: &str) -> Result<Vec<Article>, ConnectorError> {
        let response = self
            .http
            .get(format!("{}/search", self.config.url.trim_end_matches('/')))
            .query(&[("query", terms), ("limit", "10")])
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

        let body: HelpdeskResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;
        Ok(body.articles)
    }
}

#[derive(Debug, serde::Deserialize)]
struct HelpdeskResponse {
    #[serde(default)]
    articles: Vec<Article>,
}
