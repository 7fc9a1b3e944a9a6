//! Backend connectors
//!
//! One client per retrieval backend. Connectors never bubble errors up:
//! every call lands as a `BackendResult` that records success, items, the
//! search terms used, and how long the call took.

pub mod code;
pub mod helpdesk;
pub mod tickets;
pub mod wiki;

pub use code::CodeSearchClient;
pub use helpdesk::HelpdeskSearchClient;
pub use tickets::TicketSearchClient;
pub use wiki::WikiSearchClient;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connector-level failures. These are logged and absorbed, never raised
/// past the router.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub(crate) fn send_error(e: reqwest::Error) -> ConnectorError {
    if e.is_timeout() {
        ConnectorError::Timeout(e.to_string())
    } else {
        ConnectorError::RequestFailed(e.to_string())
    }
}

/// Normalized outcome of one backend call.
#[derive(Debug, Clone, Serialize)]
pub struct BackendResult<T> {
    pub items: Vec<T>,
    pub success: bool,
    pub count: usize,
    pub search_terms: Option<String>,
    pub duration_seconds: f64,
}

impl<T> BackendResult<T> {
    pub fn ok(items: Vec<T>, search_terms: Option<String>, started: Instant) -> Self {
        let count = items.len();
        Self {
            items,
            success: true,
            count,
            search_terms,
            duration_seconds: started.elapsed().as_secs_f64(),
        }
    }

    pub fn failed(search_terms: Option<String>, started: Instant) -> Self {
        Self {
            items: Vec::new(),
            success: false,
            count: 0,
            search_terms,
            duration_seconds: started.elapsed().as_secs_f64(),
        }
    }

    /// A backend the route never invoked.
    pub fn skipped() -> Self {
        Self {
            items: Vec::new(),
            success: false,
            count: 0,
            search_terms: None,
            duration_seconds: 0.0,
        }
    }

    /// A call abandoned after waiting out the router budget.
    pub fn timed_out(waited: Duration) -> Self {
        Self {
            items: Vec::new(),
            success: false,
            count: 0,
            search_terms: None,
            duration_seconds: waited.as_secs_f64(),
        }
    }
}

/// A ticket row from the tracker. Unknown upstream fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(default)]
    pub issue_key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub story_points: Option<f64>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub product_manager: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub current_assignee_name: Option<String>,
    #[serde(default)]
    pub issue_type_name: Option<String>,
    #[serde(default)]
    pub sprint_date: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl Ticket {
    pub fn points(&self) -> f64 {
        self.story_points.unwrap_or(0.0)
    }
}

/// A wiki page with extracted content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WikiPage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub confluence_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub similarity: Option<f64>,
}

impl WikiPage {
    pub fn title(&self) -> &str {
        if self.title.is_empty() { "No title" } else { &self.title }
    }

    pub fn url(&self) -> &str {
        self.confluence_url
            .as_deref()
            .or(self.source_url.as_deref())
            .unwrap_or("#")
    }
}

/// A code repository with indexed metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub repository_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub main_language: Option<String>,
    #[serde(default)]
    pub file_count: Option<u64>,
    #[serde(default)]
    pub total_lines: Option<u64>,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Repository {
    pub fn display_name(&self) -> &str {
        self.repository_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("No name")
    }

    pub fn link(&self) -> &str {
        self.github_url
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("#")
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("No description")
    }

    pub fn language(&self) -> &str {
        self.main_language.as_deref().unwrap_or("Unknown")
    }
}

/// A help-center article.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Article {
    pub fn title(&self) -> &str {
        if self.title.is_empty() { "No title" } else { &self.title }
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or("#")
    }

    pub fn body(&self) -> &str {
        self.content
            .as_deref()
            .or(self.summary.as_deref())
            .unwrap_or("No content available")
    }
}
