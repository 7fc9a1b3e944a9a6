//! Response synthesis
//!
//! Builds the synthesis prompt from assembled context, picks a model
//! tier, calls the provider, and degrades gracefully: a failed gemini
//! call retries on the premium chat model, and any chat failure lands
//! on the deterministic fallback. Synthesis never errors outward.

pub mod estimator;
pub mod fallback;
pub mod models;
pub mod prompt;
pub mod providers;

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::analyzer::QueryIntent;
use crate::api::models::ChatTurn;
use crate::assembler::AssembledContext;
use crate::config::SynthesisConfig;
use crate::error::OrchestratorError;
use crate::metrics::METRICS;
use crate::router::RouteResults;

use estimator::{TiktokenEstimator, TokenEstimator};
use models::{ModelChoice, ProviderId, SelectionInputs, PREMIUM};
use providers::{ChatCompletionProvider, Completion, GenerateContentProvider};

pub use providers::TokenUsage;

const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant for PulsePoint employees.";

/// A complete synthesis outcome, whatever path produced it.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisResult {
    pub response: String,
    pub sources: Vec<String>,
    pub synthesis_method: String,
    pub model_used: String,
    pub provider: String,
    pub token_usage: TokenUsage,
    pub duration_seconds: f64,
}

pub struct Synthesizer {
    chat: ChatCompletionProvider,
    generate: GenerateContentProvider,
    config: SynthesisConfig,
    estimator: TiktokenEstimator,
}

impl Synthesizer {
    pub fn new(config: SynthesisConfig) -> Result<Self, OrchestratorError> {
        let chat = ChatCompletionProvider::new(
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.timeout(),
        )
        .map_err(|e| OrchestratorError::Config(e.to_string()))?;
        let generate = GenerateContentProvider::new(
            config.gemini_base_url.clone(),
            config.gemini_api_key.clone(),
            config.timeout(),
        )
        .map_err(|e| OrchestratorError::Config(e.to_string()))?;
        let estimator =
            TiktokenEstimator::new().map_err(|e| OrchestratorError::Config(e.to_string()))?;
        Ok(Self {
            chat,
            generate,
            config,
            estimator,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn synthesize(
        &self,
        question: &str,
        intent: QueryIntent,
        results: &RouteResults,
        context: &AssembledContext,
        jql_link: Option<&str>,
        history: &[ChatTurn],
        model_preference: Option<&str>,
        instructions: Option<&str>,
    ) -> SynthesisResult {
        let started = Instant::now();

        if !self.chat.is_configured() {
            warn!("No chat provider credential configured, serving fallback");
            return fallback::respond(results, jql_link);
        }

        let disclaimer = instructions.and_then(prompt::extract_disclaimer);
        let gemini_available = self.generate.is_configured();

        let mut choice = models::parse_preference(model_preference, gemini_available)
            .unwrap_or_else(|| {
                models::select(
                    &SelectionInputs {
                        intent,
                        ticket_count: results.tickets.count,
                        wiki_count: results.wiki.count,
                        code_count: results.code.count,
                    },
                    gemini_available,
                )
            });

        let max_tokens = if intent.is_workflow() {
            self.config.workflow_max_tokens
        } else {
            self.config.max_tokens
        };

        let lower = question.to_lowercase();
        let conversation = prompt::build_conversation(history);
        let synthesis_prompt = prompt::build_prompt(
            question,
            &conversation,
            &context.joined(),
            jql_link,
            prompt::include_workflow_directives(intent, &lower),
            &self.config.diagram_tool_url,
        );
        debug!(
            provider = choice.provider.as_str(),
            model = choice.model,
            max_tokens,
            prompt_tokens = self.estimator.estimate(&synthesis_prompt),
            "Dispatching synthesis"
        );

        let system_message = instructions
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE);

        if choice.provider == ProviderId::Gemini {
            match self
                .generate
                .complete(
                    choice.model,
                    &synthesis_prompt,
                    max_tokens,
                    self.config.temperature,
                )
                .await
            {
                Ok(completion) => {
                    return self.finish(choice, completion, disclaimer.as_deref(), started);
                }
                Err(e) => {
                    warn!(error = %e, "Gemini synthesis failed, retrying with premium chat model");
                    METRICS.record_synthesis(
                        choice.provider.as_str(),
                        false,
                        started.elapsed().as_secs_f64(),
                    );
                    choice = PREMIUM;
                }
            }
        }

        match self
            .chat
            .complete(
                choice.model,
                system_message,
                history,
                &synthesis_prompt,
                max_tokens,
                self.config.temperature,
            )
            .await
        {
            Ok(completion) => self.finish(choice, completion, disclaimer.as_deref(), started),
            Err(e) => {
                error!(error = %e, "Synthesis failed, serving fallback");
                METRICS.record_synthesis(
                    choice.provider.as_str(),
                    false,
                    started.elapsed().as_secs_f64(),
                );
                fallback::respond(results, jql_link)
            }
        }
    }

    fn finish(
        &self,
        choice: ModelChoice,
        completion: Completion,
        disclaimer: Option<&str>,
        started: Instant,
    ) -> SynthesisResult {
        let duration = started.elapsed().as_secs_f64();
        let mut response = completion.text;
        if let Some(text) = disclaimer {
            if !response.contains(text) {
                response = format!("{}\n\n---\n\n{}", response, text);
            }
        }

        let usage = completion.usage;
        let cost = models::estimate_cost(choice.model, usage.input_tokens, usage.output_tokens);
        METRICS.record_synthesis(choice.provider.as_str(), true, duration);
        METRICS.record_tokens(choice.provider.as_str(), usage.input_tokens, usage.output_tokens);
        METRICS.record_cost(cost);
        info!(
            provider = choice.provider.as_str(),
            model = choice.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cost_dollars = cost,
            "Synthesis complete"
        );

        SynthesisResult {
            response,
            sources: vec![
                "JIRA API".to_string(),
                "Confluence API".to_string(),
                "GitHub API".to_string(),
                "Document360 API".to_string(),
            ],
            synthesis_method: choice.method_tag(),
            model_used: choice.model.to_string(),
            provider: choice.provider.as_str().to_string(),
            token_usage: usage,
            duration_seconds: duration,
        }
    }
}
