//! End-to-end question handling
//!
//! Owns the full pipeline for one question: glossary snapshot, query
//! analysis, backend routing, context assembly, synthesis, and the
//! answer envelope. Backend and provider failures degrade the answer
//! rather than failing the request; only a missing question is an error.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::analyzer::analyze;
use crate::api::models::{ApiStatus, AskRequest, AskResponse};
use crate::assembler::ContextAssembler;
use crate::config::Config;
use crate::error::OrchestratorError;
use crate::glossary::GlossaryStore;
use crate::metrics::METRICS;
use crate::router::IntentRouter;
use crate::session;
use crate::synthesis::Synthesizer;
use crate::SERVICE_VERSION;

pub struct RequestOrchestrator {
    config: Config,
    glossary: Arc<GlossaryStore>,
    router: IntentRouter,
    assembler: ContextAssembler,
    synthesizer: Synthesizer,
}

impl RequestOrchestrator {
    pub fn new(config: Config) -> Result<Self, OrchestratorError> {
        let glossary = Arc::new(GlossaryStore::new(config.glossary.clone())?);
        let router = IntentRouter::new(
            config.backends.clone(),
            config.router.clone(),
            config.vocabulary.clone(),
        )
        .map_err(|e| {
            OrchestratorError::Config(format!("Failed to build backend clients: {}", e))
        })?;
        let assembler = ContextAssembler::new(config.assembler.clone(), router.browse_base_url());
        let synthesizer = Synthesizer::new(config.synthesis.clone())?;
        Ok(Self {
            config,
            glossary,
            router,
            assembler,
            synthesizer,
        })
    }

    pub fn glossary(&self) -> &Arc<GlossaryStore> {
        &self.glossary
    }

    /// Answer one question end to end.
    pub async fn handle(&self, request: AskRequest) -> Result<AskResponse, OrchestratorError> {
        let question = match request.question.as_deref() {
            Some(q) if !q.is_empty() => q.to_string(),
            _ => {
                return Err(OrchestratorError::InvalidRequest(
                    "No question provided".to_string(),
                ));
            }
        };

        let request_id = Uuid::new_v4();
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| session::generate(&question));
        let history = request.conversation_history;
        let max_results = request
            .max_results
            .unwrap_or(self.config.backends.tracker.default_max_results);
        let now = Utc::now();

        info!(
            %request_id,
            %session_id,
            history_turns = history.len(),
            question_chars = question.len(),
            "Handling question"
        );

        let snapshot = self.glossary.snapshot().await;
        let analysis = analyze(&question, &snapshot, &self.config.vocabulary, now);
        METRICS.record_question(analysis.intent.as_str());
        info!(
            %request_id,
            intent = analysis.intent.as_str(),
            keywords = ?analysis.keywords,
            sprint_date = ?analysis.filters.sprint_date,
            "Question analyzed"
        );

        let results = self
            .router
            .route(
                &question,
                &analysis,
                &snapshot,
                &history,
                max_results,
                now.date_naive(),
            )
            .await;

        let context = self
            .assembler
            .assemble(&question, analysis.intent, &snapshot, &results);

        let instructions = self
            .config
            .synthesis
            .system_instructions
            .clone()
            .or_else(|| snapshot.instructions_text().map(str::to_string));

        let synthesis = self
            .synthesizer
            .synthesize(
                &question,
                analysis.intent,
                &results,
                &context,
                results.jql_link.as_deref(),
                &history,
                request.model_preference.as_deref(),
                instructions.as_deref(),
            )
            .await;

        let api_status = ApiStatus {
            data_sources_queried: 4,
            data_sources_successful: [
                results.tickets.success,
                results.wiki.success,
                results.code.success,
                results.helpdesk.success,
            ]
            .iter()
            .filter(|s| **s)
            .count(),
            jira_query_success: results.tickets.success,
            confluence_api_success: results.wiki.success,
            github_api_success: results.code.success,
            document360_api_success: results.helpdesk.success,
            confluence_sources: results.wiki.count,
            github_repos: results.code.count,
            document360_articles: results.helpdesk.count,
        };

        info!(
            %request_id,
            jira_tickets = results.tickets.count,
            confluence_pages = results.wiki.count,
            github_repos = results.code.count,
            document360_articles = results.helpdesk.count,
            method = %synthesis.synthesis_method,
            "Answer assembled"
        );

        Ok(AskResponse {
            response: synthesis.response,
            sources: synthesis.sources,
            jql_link: results.jql_link.clone(),
            confluence_results: results.wiki.count,
            github_repos: results.code.count,
            jira_tickets: results.tickets_found,
            document360_articles: results.helpdesk.count,
            query_intent: analysis.intent,
            synthesis_method: synthesis.synthesis_method,
            model_used: synthesis.model_used,
            provider: synthesis.provider,
            token_usage: synthesis.token_usage,
            api_status,
            session_id,
            version: SERVICE_VERSION,
        })
    }
}
