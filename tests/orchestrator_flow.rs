//! End-to-end request flow against mocked upstreams
//!
//! Boots the real orchestrator against mockito backends and drives
//! requests through the axum service, asserting on the answer envelope
//! each route produces.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use secrecy::Secret;
use serde_json::{json, Value};
use tower::ServiceExt;

use knowledge_orchestrator::api::{build_router, AppState};
use knowledge_orchestrator::{Config, RequestOrchestrator};

fn test_config(server_url: &str) -> Config {
    let mut config = Config::default();
    config.glossary.base_url = format!("{}/glossary", server_url);
    config.backends.tracker.url = format!("{}/tracker", server_url);
    config.backends.wiki.url = format!("{}/wiki", server_url);
    config.backends.code.url = format!("{}/code", server_url);
    config.backends.helpdesk.url = format!("{}/helpdesk", server_url);
    config
}

fn app(config: Config) -> axum::Router {
    let orchestrator = Arc::new(RequestOrchestrator::new(config).unwrap());
    build_router(AppState { orchestrator }, 1024 * 1024)
}

async fn post_ask(app: axum::Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ask")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_text(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn tracker_body(keys: &[&str]) -> String {
    let tickets: Vec<Value> = keys
        .iter()
        .map(|key| {
            json!({
                "issue_key": key,
                "summary": format!("{} work item", key),
                "story_points": 3.0,
                "team": "Backend"
            })
        })
        .collect();
    json!({"tickets": tickets, "summary": [format!("{} tickets open", keys.len())]}).to_string()
}

#[tokio::test]
async fn test_ticket_question_routes_tracker_only_with_fallback_answer() {
    let mut server = mockito::Server::new_async().await;
    let tracker = server
        .mock("POST", "/tracker")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tracker_body(&["RPT-101", "RPT-102"]))
        .create_async()
        .await;

    let app = app(test_config(&server.url()));
    let (status, body) = post_ask(app, json!({"question": "open tickets for reporting"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], "5.0");
    assert_eq!(body["query_intent"], "jira_only");
    assert_eq!(body["jira_tickets"], 2);
    assert_eq!(body["synthesis_method"], "fallback");
    assert_eq!(body["provider"], "none");
    let answer = body["response"].as_str().unwrap();
    assert!(answer.contains("Found 2 JIRA tickets."));
    assert!(answer.contains("- 2 tickets open"));

    let jql = body["jql_link"].as_str().unwrap();
    assert!(jql.starts_with("https://ppinc.atlassian.net/issues/?jql="));
    assert!(jql.contains("RPT-101"));

    // Only the tracker was queried; the other three count as unsuccessful.
    assert_eq!(body["api_status"]["data_sources_queried"], 4);
    assert_eq!(body["api_status"]["data_sources_successful"], 1);
    assert_eq!(body["api_status"]["jira_query_success"], true);
    assert_eq!(body["api_status"]["confluence_api_success"], false);
    assert!(body["session_id"].as_str().unwrap().starts_with("session_"));
    tracker.assert_async().await;
}

#[tokio::test]
async fn test_general_question_fans_out_to_all_backends() {
    let mut server = mockito::Server::new_async().await;
    let tracker = server
        .mock("POST", "/tracker")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tracker_body(&["RPT-201"]))
        .create_async()
        .await;
    let wiki = server
        .mock("POST", "/wiki/search")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"results": [
                {"title": "Reporting overview", "confluence_url": "https://wiki/reporting", "content": "How reporting works"},
                {"title": "Export guide", "confluence_url": "https://wiki/export", "content": "Export paths"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let code = server
        .mock("POST", "/code")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"repositories": [
                {"repository_name": "reporting-api", "github_url": "https://github.com/pp/reporting-api",
                 "description": "Reporting service", "main_language": "Python"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let helpdesk = server
        .mock("GET", "/helpdesk/search")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"articles": [
                {"title": "Reporting FAQ", "url": "https://docs/reporting-faq", "content": "Answers"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let app = app(test_config(&server.url()));
    let (status, body) = post_ask(app, json!({"question": "latest reporting updates"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query_intent"], "general");
    assert_eq!(body["api_status"]["data_sources_successful"], 4);
    assert_eq!(body["jira_tickets"], 1);
    assert_eq!(body["confluence_results"], 2);
    assert_eq!(body["github_repos"], 1);
    assert_eq!(body["document360_articles"], 1);

    // Fallback sources: the JQL link stands in for the tracker, then one
    // entry per backend that returned data.
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 4);
    assert!(sources[0].as_str().unwrap().contains("/issues/?jql="));
    assert_eq!(sources[1], "Confluence API");
    assert_eq!(sources[2], "GitHub API");
    assert_eq!(sources[3], "Document360 API");

    tracker.assert_async().await;
    wiki.assert_async().await;
    code.assert_async().await;
    helpdesk.assert_async().await;
}

#[tokio::test]
async fn test_slow_backend_is_abandoned_without_stalling_siblings() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/tracker")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tracker_body(&["RPT-301"]))
        .create_async()
        .await;
    server
        .mock("POST", "/wiki/search")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"results": []}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/helpdesk/search")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"articles": []}).to_string())
        .create_async()
        .await;

    // A socket that accepts connections but never answers.
    let blackhole = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config(&server.url());
    config.backends.code.url = format!("http://{}", blackhole.local_addr().unwrap());
    config.backends.code.wait_timeout_ms = 250;

    let app = app(config);
    let started = Instant::now();
    let (status, body) = post_ask(app, json!({"question": "latest reporting updates"})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(body["api_status"]["github_api_success"], false);
    assert_eq!(body["github_repos"], 0);
    assert_eq!(body["api_status"]["jira_query_success"], true);
    assert_eq!(body["api_status"]["confluence_api_success"], true);
    assert_eq!(body["api_status"]["document360_api_success"], true);
    assert_eq!(body["api_status"]["data_sources_successful"], 3);
}

#[tokio::test]
async fn test_synthesis_upstream_failure_degrades_to_fallback() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/tracker")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tracker_body(&["RPT-401"]))
        .create_async()
        .await;
    let completions = server
        .mock("POST", "/openai/v1/chat/completions")
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.synthesis.openai_api_key = Some(Secret::new("test-key".to_string()));
    config.synthesis.openai_base_url = format!("{}/openai", server.url());

    let app = app(config);
    let (status, body) = post_ask(app, json!({"question": "open tickets for reporting"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["synthesis_method"], "fallback");
    assert_eq!(body["model_used"], "none");
    assert_eq!(body["provider"], "none");
    assert!(body["response"].as_str().unwrap().contains("Found 1 JIRA tickets."));
    completions.assert_async().await;
}

#[tokio::test]
async fn test_synthesized_answer_reports_model_and_usage() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/tracker")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tracker_body(&["RPT-501"]))
        .create_async()
        .await;
    let completions = server
        .mock("POST", "/openai/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{"message": {"role": "assistant", "content": "Reporting work is on track."}}],
                "usage": {"prompt_tokens": 150, "completion_tokens": 30, "total_tokens": 180}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.synthesis.openai_api_key = Some(Secret::new("test-key".to_string()));
    config.synthesis.openai_base_url = format!("{}/openai", server.url());

    let app = app(config);
    let (status, body) = post_ask(
        app,
        json!({"question": "open tickets for reporting", "session_id": "e2e-session"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Reporting work is on track.");
    assert_eq!(body["synthesis_method"], "openai_gpt_4o_mini");
    assert_eq!(body["model_used"], "gpt-4o-mini");
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["token_usage"]["input_tokens"], 150);
    assert_eq!(body["token_usage"]["output_tokens"], 30);
    assert_eq!(body["token_usage"]["total_tokens"], 180);
    assert_eq!(
        body["sources"],
        json!(["JIRA API", "Confluence API", "GitHub API", "Document360 API"])
    );
    assert_eq!(body["session_id"], "e2e-session");
    completions.assert_async().await;
}

#[tokio::test]
async fn test_gemini_preference_routes_to_generate_content() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/tracker")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tracker_body(&["RPT-601"]))
        .create_async()
        .await;
    let generate = server
        .mock(
            "POST",
            "/gemini/v1/models/gemini-2.0-flash-001:generateContent",
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{"content": {"parts": [{"text": "Flash answer."}]}}],
                "usageMetadata": {"promptTokenCount": 90, "candidatesTokenCount": 12, "totalTokenCount": 102}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.synthesis.openai_api_key = Some(Secret::new("test-key".to_string()));
    config.synthesis.gemini_api_key = Some(Secret::new("gemini-key".to_string()));
    config.synthesis.gemini_base_url = format!("{}/gemini", server.url());

    let app = app(config);
    let (status, body) = post_ask(
        app,
        json!({"question": "open tickets for reporting", "model_preference": "gemini"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Flash answer.");
    assert_eq!(body["synthesis_method"], "gemini_gemini_2.0_flash_001");
    assert_eq!(body["model_used"], "gemini-2.0-flash-001");
    assert_eq!(body["provider"], "gemini");
    assert_eq!(body["token_usage"]["total_tokens"], 102);
    generate.assert_async().await;
}

#[tokio::test]
async fn test_missing_question_and_bad_json_return_400() {
    let app = app(Config::default());

    let (status, body) = post_ask(app.clone(), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No question provided");
    assert_eq!(body["version"], "5.0");
    assert!(body["timestamp"].as_str().is_some());

    let (status, body) = post_ask(app.clone(), json!({"question": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No question provided");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ask")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "No JSON data provided");
}

#[tokio::test]
async fn test_health_endpoint_reports_service_shape() {
    let app = app(Config::default());

    let (status, body) = get_text(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["version"], "5.0");
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["synthesis_type"], "llm_powered_multi_source_synthesis");
    assert!(health["message"].as_str().unwrap().contains("Knowledge Orchestrator"));
    assert!(!health["features"].as_array().unwrap().is_empty());

    // GET on the ask path answers with the same health payload.
    let (status, body) = get_text(app, "/ask").await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_endpoint_exports_prometheus_text() {
    let app = app(Config::default());

    let (status, body) = get_text(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("# HELP"));
    assert!(body.contains("fallback_responses_total"));
}
