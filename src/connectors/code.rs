//! Code search connector
//!
//! Repository-level search over the engineering codebase index. Results
//! carry descriptions and stats that the assembler turns into diagram
//! source material.

use std::time::Instant;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::analyzer::QueryAnalysis;
use crate::config::BackendConfig;
use crate::metrics::METRICS;

use super::{send_error, BackendResult, ConnectorError, Repository};

pub struct CodeSearchClient {
    http: Client,
    config: BackendConfig,
}

impl CodeSearchClient {
    pub fn new(config: BackendConfig) -> Result<Self, ConnectorError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConnectorError::RequestFailed(format!("Failed to build client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub async fn search(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
    ) -> BackendResult<Repository> {
        let started = Instant::now();
        let terms = search_terms(question, analysis);
        debug!(%terms, "Querying code search");

        match self.post(&terms).await {
            Ok(repositories) => {
                METRICS.record_backend("code", true, started.elapsed().as_secs_f64());
                BackendResult::ok(repositories, Some(terms), started)
            }
            Err(e) => {
                warn!(error = %e, "Code search failed");
                METRICS.record_backend("code", false, started.elapsed().as_secs_f64());
                BackendResult::failed(Some(terms), started)
            }
        }
    }

    async fn post(&self, terms: &str) -> Result<Vec<Repository>, ConnectorError> {
        let response = self
            .http
            .post(&self.config.url)
            .json(&json!({ "question": terms }))
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

        let body: CodeResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;
        Ok(body.repositories)
    }
}

fn search_terms(question: &str, analysis: &QueryAnalysis) -> String {
    if analysis.keywords.is_empty() {
        question.to_string()
    } else {
        analysis
            .keywords
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, serde::Deserialize)]
struct CodeResponse {
    #[serde(default)]
    repositories: Vec<Repository>,
}
