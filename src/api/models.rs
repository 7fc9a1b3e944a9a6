//! Request and response models for the HTTP API

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analyzer::QueryIntent;
use crate::synthesis::TokenUsage;
use crate::SERVICE_VERSION;

/// One turn of a prior conversation, as sent by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Body of a POST /ask request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
    pub question: Option<String>,
    pub session_id: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
    pub max_results: Option<u32>,
    pub model_preference: Option<String>,
}

/// Per-backend outcome summary carried on every answer
#[derive(Debug, Clone, Serialize)]
pub struct ApiStatus {
    pub data_sources_queried: usize,
    pub data_sources_successful: usize,
    pub jira_query_success: bool,
    pub confluence_api_success: bool,
    pub github_api_success: bool,
    pub document360_api_success: bool,
    pub confluence_sources: usize,
    pub github_repos: usize,
    pub document360_articles: usize,
}

/// Full answer envelope for POST /ask
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub response: String,
    pub sources: Vec<String>,
    pub jql_link: Option<String>,
    pub confluence_results: usize,
    pub github_repos: usize,
    pub jira_tickets: usize,
    pub document360_articles: usize,
    pub query_intent: QueryIntent,
    pub synthesis_method: String,
    pub model_used: String,
    pub provider: String,
    pub token_usage: TokenUsage,
    pub api_status: ApiStatus,
    pub session_id: String,
    pub version: &'static str,
}

/// Error envelope for 4xx/5xx responses
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub version: &'static str,
    pub timestamp: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            version: SERVICE_VERSION,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Body for GET / and GET /ask
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub version: &'static str,
    pub message: &'static str,
    pub status: &'static str,
    pub synthesis_type: &'static str,
    pub features: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_request_defaults_missing_fields() {
        let req: AskRequest = serde_json::from_str(r#"{"question": "What is HDM?"}"#).unwrap();
        assert_eq!(req.question.as_deref(), Some("What is HDM?"));
        assert!(req.session_id.is_none());
        assert!(req.conversation_history.is_empty());
        assert!(req.max_results.is_none());
        assert!(req.model_preference.is_none());
    }

    #[test]
    fn test_ask_request_parses_history() {
        let req: AskRequest = serde_json::from_str(
            r#"{
                "question": "And the factors?",
                "conversation_history": [
                    {"role": "user", "content": "What is AO?"},
                    {"role": "assistant", "content": "Audience Optimization is..."}
                ],
                "max_results": 50
            }"#,
        )
        .unwrap();
        assert_eq!(req.conversation_history.len(), 2);
        assert_eq!(req.conversation_history[0].role, "user");
        assert_eq!(req.max_results, Some(50));
    }

    #[test]
    fn test_error_body_carries_version_and_timestamp() {
        let body = ErrorBody::new("No question provided");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "No question provided");
        assert_eq!(json["version"], SERVICE_VERSION);
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_query_intent_serializes_snake_case() {
        let json = serde_json::to_value(QueryIntent::JiraOnly).unwrap();
        assert_eq!(json, "jira_only");
    }
}
