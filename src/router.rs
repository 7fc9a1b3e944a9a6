//! Intent-based routing
//!
//! Decides which backends a question hits and runs them concurrently,
//! each under its own wait budget. A slow or dead backend costs its own
//! budget and nothing else; siblings complete independently.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::analyzer::{extract_subject, QueryAnalysis, QueryIntent, SearchTerms};
use crate::api::models::ChatTurn;
use crate::config::{BackendsConfig, RouterConfig, VocabularyConfig};
use crate::connectors::{
    Article, BackendResult, CodeSearchClient, ConnectorError, HelpdeskSearchClient, Repository,
    Ticket, TicketSearchClient, WikiPage, WikiSearchClient,
};
use crate::glossary::GlossarySnapshot;
use crate::metrics::METRICS;

/// Everything the route produced, one slot per backend. Backends the
/// route never invoked are present as skipped results.
#[derive(Debug)]
pub struct RouteResults {
    pub tickets: BackendResult<Ticket>,
    pub ticket_summary: Vec<String>,
    /// Ticket count before any subject filtering, reported to the caller.
    pub tickets_found: usize,
    pub wiki: BackendResult<WikiPage>,
    pub code: BackendResult<Repository>,
    pub helpdesk: BackendResult<Article>,
    pub subject: Option<String>,
    pub jql_link: Option<String>,
}

pub struct IntentRouter {
    tickets: Arc<TicketSearchClient>,
    wiki: Arc<WikiSearchClient>,
    code: Arc<CodeSearchClient>,
    helpdesk: Arc<HelpdeskSearchClient>,
    backends: BackendsConfig,
    workflow_pool: Arc<Semaphore>,
    general_pool: Arc<Semaphore>,
}

impl IntentRouter {
    pub fn new(
        backends: BackendsConfig,
        router: RouterConfig,
        vocabulary: VocabularyConfig,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            tickets: Arc::new(TicketSearchClient::new(
                backends.tracker.clone(),
                vocabulary.clone(),
            )?),
            wiki: Arc::new(WikiSearchClient::new(
                backends.wiki.clone(),
                vocabulary.clone(),
            )?),
            code: Arc::new(CodeSearchClient::new(backends.code.clone())?),
            helpdesk: Arc::new(HelpdeskSearchClient::new(backends.helpdesk.clone())?),
            backends,
            workflow_pool: Arc::new(Semaphore::new(router.workflow_pool_size)),
            general_pool: Arc::new(Semaphore::new(router.general_pool_size)),
        })
    }

    pub fn browse_base_url(&self) -> String {
        self.tickets.browse_base_url().to_string()
    }

    pub async fn route(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
        snapshot: &Arc<GlossarySnapshot>,
        history: &[ChatTurn],
        max_results: u32,
        today: NaiveDate,
    ) -> RouteResults {
        match analysis.intent {
            QueryIntent::JiraOnly | QueryIntent::Aggregation => {
                self.route_tracker_only(question, analysis, snapshot, max_results, today)
                    .await
            }
            QueryIntent::Workflow => {
                self.route_workflow(question, analysis, snapshot, history, max_results, today)
                    .await
            }
            _ => {
                self.route_all(question, analysis, snapshot, history, max_results, today)
                    .await
            }
        }
    }

    /// Counts and ticket lookups never need the document backends.
    async fn route_tracker_only(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
        snapshot: &Arc<GlossarySnapshot>,
        max_results: u32,
        today: NaiveDate,
    ) -> RouteResults {
        info!(intent = analysis.intent.as_str(), "Tracker-only route");
        let wait = self.backends.tracker.wait_timeout();
        let (tickets, ticket_summary) = match timeout(
            wait,
            self.tickets
                .search(question, analysis, snapshot, max_results, today),
        )
        .await
        {
            Ok(pair) => pair,
            Err(_) => {
                warn!(waited_secs = wait.as_secs_f64(), "Tracker call abandoned");
                METRICS.record_backend_timeout("tracker");
                (BackendResult::timed_out(wait), Vec::new())
            }
        };
        let tickets_found = tickets.count;
        let jql_link = self.tickets.navigator_link(&tickets.items);
        RouteResults {
            tickets,
            ticket_summary,
            tickets_found,
            wiki: BackendResult::skipped(),
            code: BackendResult::skipped(),
            helpdesk: BackendResult::skipped(),
            subject: None,
            jql_link,
        }
    }

    /// Workflow questions lean on the wiki and code backends and use the
    /// tracker only for tickets naming the detected subject. The helpdesk
    /// is skipped: it documents the product, not internal process.
    async fn route_workflow(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
        snapshot: &Arc<GlossarySnapshot>,
        history: &[ChatTurn],
        max_results: u32,
        today: NaiveDate,
    ) -> RouteResults {
        let subject = extract_subject(question);
        info!(subject = ?subject, "Workflow route");

        let mut ticket_analysis = analysis.clone();
        if let Some(s) = &subject {
            ticket_analysis.filters.summary = Some(s.clone());
            ticket_analysis.filters.search_terms = Some(SearchTerms::Phrase(s.clone()));
        }

        let tickets_task = self.spawn_tickets(
            &self.workflow_pool,
            question,
            ticket_analysis,
            snapshot,
            max_results,
            today,
        );
        let wiki_task = self.spawn_wiki(
            &self.workflow_pool,
            question,
            analysis.clone(),
            history.to_vec(),
            subject.clone(),
        );
        let code_task = self.spawn_code(&self.workflow_pool, question, analysis.clone());

        let (wiki, code, (mut tickets, ticket_summary)) = tokio::join!(
            await_backend("wiki", self.backends.wiki.wait_timeout(), wiki_task),
            await_backend("code", self.backends.code.wait_timeout(), code_task),
            await_tracker(self.backends.tracker.wait_timeout(), tickets_task),
        );

        let tickets_found = tickets.count;
        if let Some(s) = &subject {
            let needle = s.to_uppercase();
            tickets.items.retain(|t| {
                t.summary.to_uppercase().contains(&needle)
                    || t.issue_key.to_uppercase().contains(&needle)
            });
            tickets.count = tickets.items.len();
            if tickets.count < tickets_found {
                info!(
                    kept = tickets.count,
                    total = tickets_found,
                    "Filtered tickets to workflow subject"
                );
            }
        }
        let jql_link = self.tickets.navigator_link(&tickets.items);

        RouteResults {
            tickets,
            ticket_summary,
            tickets_found,
            wiki,
            code,
            helpdesk: BackendResult::skipped(),
            subject,
            jql_link,
        }
    }

    async fn route_all(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
        snapshot: &Arc<GlossarySnapshot>,
        history: &[ChatTurn],
        max_results: u32,
        today: NaiveDate,
    ) -> RouteResults {
        info!(intent = analysis.intent.as_str(), "Full route");
        let tickets_task = self.spawn_tickets(
            &self.general_pool,
            question,
            analysis.clone(),
            snapshot,
            max_results,
            today,
        );
        let wiki_task = self.spawn_wiki(
            &self.general_pool,
            question,
            analysis.clone(),
            history.to_vec(),
            None,
        );
        let code_task = self.spawn_code(&self.general_pool, question, analysis.clone());
        let helpdesk_task = self.spawn_helpdesk(&self.general_pool, question, analysis.clone());

        let (wiki, code, helpdesk, (tickets, ticket_summary)) = tokio::join!(
            await_backend("wiki", self.backends.wiki.wait_timeout(), wiki_task),
            await_backend("code", self.backends.code.wait_timeout(), code_task),
            await_backend("helpdesk", self.backends.helpdesk.wait_timeout(), helpdesk_task),
            await_tracker(self.backends.tracker.wait_timeout(), tickets_task),
        );

        let tickets_found = tickets.count;
        let jql_link = self.tickets.navigator_link(&tickets.items);
        RouteResults {
            tickets,
            ticket_summary,
            tickets_found,
            wiki,
            code,
            helpdesk,
            subject: None,
            jql_link,
        }
    }

    fn spawn_tickets(
        &self,
        pool: &Arc<Semaphore>,
        question: &str,
        analysis: QueryAnalysis,
        snapshot: &Arc<GlossarySnapshot>,
        max_results: u32,
        today: NaiveDate,
    ) -> JoinHandle<(BackendResult<Ticket>, Vec<String>)> {
        let client = Arc::clone(&self.tickets);
        let pool = Arc::clone(pool);
        let question = question.to_string();
        let snapshot = Arc::clone(snapshot);
        tokio::spawn(async move {
            let _permit = pool
                .acquire_owned()
                .await
                .expect("backend pool semaphore closed");
            client
                .search(&question, &analysis, &snapshot, max_results, today)
                .await
        })
    }

    fn spawn_wiki(
        &self,
        pool: &Arc<Semaphore>,
        question: &str,
        analysis: QueryAnalysis,
        history: Vec<ChatTurn>,
        subject: Option<String>,
    ) -> JoinHandle<BackendResult<WikiPage>> {
        let client = Arc::clone(&self.wiki);
        let pool = Arc::clone(pool);
        let question = question.to_string();
        tokio::spawn(async move {
            let _permit = pool
                .acquire_owned()
                .await
                .expect("backend pool semaphore closed");
            client
                .search(&question, &analysis, &history, subject.as_deref())
                .await
        })
    }

    fn spawn_code(
        &self,
        pool: &Arc<Semaphore>,
        question: &str,
        analysis: QueryAnalysis,
    ) -> JoinHandle<BackendResult<Repository>> {
        let client = Arc::clone(&self.code);
        let pool = Arc::clone(pool);
        let question = question.to_string();
        tokio::spawn(async move {
            let _permit = pool
                .acquire_owned()
                .await
                .expect("backend pool semaphore closed");
            client.search(&question, &analysis).await
        })
    }

    fn spawn_helpdesk(
        &self,
        pool: &Arc<Semaphore>,
        question: &str,
        analysis: QueryAnalysis,
    ) -> JoinHandle<BackendResult<Article>> {
        let client = Arc::clone(&self.helpdesk);
        let pool = Arc::clone(pool);
        let question = question.to_string();
        tokio::spawn(async move {
            let _permit = pool
                .acquire_owned()
                .await
                .expect("backend pool semaphore closed");
            client.search(&question, &analysis).await
        })
    }
}

/// Wait out one backend task under its budget. An elapsed budget abandons
/// the task; it finishes (or times out at the HTTP layer) on its own.
async fn await_backend<T>(
    source: &'static str,
    wait: Duration,
    task: JoinHandle<BackendResult<T>>,
) -> BackendResult<T> {
    match timeout(wait, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(source, error = %e, "Backend task failed");
            BackendResult::skipped()
        }
        Err(_) => {
            warn!(
                source,
                waited_secs = wait.as_secs_f64(),
                "Backend call abandoned"
            );
            METRICS.record_backend_timeout(source);
            BackendResult::timed_out(wait)
        }
    }
}

async fn await_tracker(
    wait: Duration,
    task: JoinHandle<(BackendResult<Ticket>, Vec<String>)>,
) -> (BackendResult<Ticket>, Vec<String>) {
    match timeout(wait, task).await {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            error!(source = "tracker", error = %e, "Backend task failed");
            (BackendResult::skipped(), Vec::new())
        }
        Err(_) => {
            warn!(
                source = "tracker",
                waited_secs = wait.as_secs_f64(),
                "Backend call abandoned"
            );
            METRICS.record_backend_timeout("tracker");
            (BackendResult::timed_out(wait), Vec::new())
        }
    }
}
