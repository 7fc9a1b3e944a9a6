//! Knowledge orchestration service
//!
//! Answers natural-language questions about products, tickets, and code by
//! classifying intent, fanning out to the JIRA, Confluence, GitHub, and
//! Document360 search backends, assembling the results into a bounded LLM
//! context, and synthesizing a sourced answer. When no provider is
//! configured or synthesis fails, a deterministic fallback summarizes the
//! retrieved data instead.

pub mod analyzer;
pub mod api;
pub mod assembler;
pub mod config;
pub mod connectors;
pub mod error;
pub mod glossary;
pub mod metrics;
pub mod orchestrator;
pub mod router;
pub mod session;
pub mod synthesis;

pub use config::Config;
pub use error::{OrchestratorError, Result};
pub use orchestrator::RequestOrchestrator;

/// Version string reported in every answer envelope.
pub const SERVICE_VERSION: &str = "5.0";
