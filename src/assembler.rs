//! Context assembly
//!
//! Formats backend results into the labeled text blocks the synthesis
//! prompt is built from. Every block is always present: a backend with
//! nothing to say contributes an explicit "no information available"
//! sentinel so the model never guesses about missing data.

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::analyzer::QueryIntent;
use crate::config::AssemblerConfig;
use crate::connectors::Ticket;
use crate::glossary::GlossarySnapshot;
use crate::router::RouteResults;

// Aggregation formatting triggers on these even when intent detection
// classified the question differently.
const AGGREGATION_CONTEXT_TERMS: &[&str] = &["count", "sum", "total", "breakdown", "points"];

const DIAGRAM_TERMS: &[&str] = &["diagram", "flowchart", "dataflow", "data flow", "mermaid"];

const DIAGRAM_REPO_HEADER: &str = "=== GITHUB REPOSITORIES (PRIMARY SOURCE - USE THIS DATA TO \
GENERATE COMPREHENSIVE, DETAILED DIAGRAM) ===\n\
CRITICAL INSTRUCTIONS FOR DIAGRAM GENERATION:\n\
1. Create COMPREHENSIVE diagrams with ALL major steps, decision points, and components\n\
2. Include ALL decision points with yes/no branches - every decision must have both paths\n\
3. Show COMPLETE flows from start to finish with every intermediate step\n\
4. Use subgraphs to group components by repository (e.g., subgraph pulsepointinc/ad-serving)\n\
5. Use descriptive, specific component names based on repository descriptions\n\
6. Include error/rejection paths for all decision points\n\
7. Map each component to its repository in subgraph labels\n\
8. Do NOT create simplified diagrams - show granular detail with all steps\n\
\n\
Repository Data (use descriptions to infer component names and flows):\n\n";

const DIAGRAM_EMPTY_SENTINEL: &str = "=== GITHUB DATA: WARNING - no information available for \
this diagram query. You should still attempt to generate a diagram based on the question, but \
note that it may not reflect actual implementation. ===";

const HELPDESK_SKIPPED_SENTINEL: &str = "Document360 Data: no information available (skipped \
for internal process/workflow questions; Document360 is for client-facing documentation).";

/// One labeled block of prompt context.
#[derive(Debug, Clone)]
pub struct ContextBlock {
    pub source: &'static str,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub blocks: Vec<ContextBlock>,
}

impl AssembledContext {
    pub fn joined(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub struct ContextAssembler {
    config: AssemblerConfig,
    browse_base_url: String,
}

impl ContextAssembler {
    pub fn new(config: AssemblerConfig, browse_base_url: String) -> Self {
        Self {
            config,
            browse_base_url,
        }
    }

    pub fn assemble(
        &self,
        question: &str,
        intent: QueryIntent,
        snapshot: &GlossarySnapshot,
        results: &RouteResults,
    ) -> AssembledContext {
        let lower = question.to_lowercase();
        let blocks = vec![
            self.block("glossary", glossary_block(snapshot)),
            self.block("tickets", self.ticket_block(&lower, intent, results)),
            self.block("wiki", wiki_block(intent, results)),
            self.block("code", code_block(&lower, intent, results)),
            self.block("helpdesk", helpdesk_block(intent, results)),
        ];
        AssembledContext { blocks }
    }

    fn block(&self, source: &'static str, text: String) -> ContextBlock {
        ContextBlock {
            source,
            text: cap_chars(text, self.config.max_block_chars),
        }
    }

    fn ticket_block(&self, lower: &str, intent: QueryIntent, results: &RouteResults) -> String {
        let tickets = &results.tickets.items;
        if tickets.is_empty() {
            return "JIRA Data: no information available for this query.".to_string();
        }
        let aggregation = intent == QueryIntent::Aggregation
            || AGGREGATION_CONTEXT_TERMS.iter().any(|t| lower.contains(t));
        if aggregation {
            aggregation_ticket_block(tickets)
        } else {
            timeline_ticket_block(tickets, &self.browse_base_url)
        }
    }
}

fn cap_chars(text: String, limit: usize) -> String {
    if text.chars().count() > limit {
        text.chars().take(limit).collect()
    } else {
        text
    }
}

fn truncated(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn glossary_block(snapshot: &GlossarySnapshot) -> String {
    let mut out = String::from("GPT Context Files (for reference):\n");
    if snapshot.section_count() > 0 {
        out.push_str(&format!(
            "- Acronyms loaded: {} sections\n",
            snapshot.section_count()
        ));
    }
    if snapshot.product_count() > 0 {
        out.push_str(&format!(
            "- Products loaded: {} products\n",
            snapshot.product_count()
        ));
    }
    if snapshot.has_instructions() {
        out.push_str("- Workflow instructions available\n");
    }
    out
}

/// Every ticket with its points, pre-summed so the model reports the
/// total instead of attempting arithmetic.
fn aggregation_ticket_block(tickets: &[Ticket]) -> String {
    let total: f64 = tickets.iter().map(Ticket::points).sum();
    let mut out = format!(
        "JIRA Tickets for Aggregation Analysis:\nTotal tickets available: {}\n",
        tickets.len()
    );
    out.push_str(&format!(
        "**PRE-CALCULATED TOTAL STORY POINTS: {}**\n\n",
        total
    ));
    for ticket in tickets {
        let key = non_empty(&ticket.issue_key, "N/A");
        let pm = ticket.product_manager.as_deref().unwrap_or("N/A");
        let product = ticket.product.as_deref().unwrap_or("N/A");
        let stream = ticket.stream.as_deref().unwrap_or("N/A");
        out.push_str(&format!(
            "- {}: {} pts | PM: {} | Product: {} | Stream: {}\n",
            key,
            ticket.points(),
            pm,
            product,
            stream
        ));
    }
    out
}

/// Tickets grouped by sprint in chronological order, capped per sprint.
fn timeline_ticket_block(tickets: &[Ticket], browse_base_url: &str) -> String {
    let mut buckets: IndexMap<String, Vec<&Ticket>> = IndexMap::new();
    for ticket in tickets {
        let label = ticket
            .sprint_date
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        buckets.entry(label).or_default().push(ticket);
    }
    let mut ordered: Vec<(String, Vec<&Ticket>)> = buckets.into_iter().collect();
    ordered.sort_by_key(|(label, _)| sprint_sort_key(label));

    let mut out = format!(
        "JIRA Epics and Tickets (Roadmap Timeline):\nTotal tickets available: {}\n",
        tickets.len()
    );
    for (label, bucket) in &ordered {
        out.push_str(&format!(
            "\n### Sprint: {} ({} tickets)\n",
            label,
            bucket.len()
        ));
        for ticket in bucket.iter().take(20) {
            let key = non_empty(&ticket.issue_key, "N/A");
            let summary = non_empty(&ticket.summary, "No summary");
            let release = ticket.release_date.as_deref().unwrap_or("N/A");
            let product = ticket.product.as_deref().unwrap_or("N/A");
            let assignee = ticket.current_assignee_name.as_deref().unwrap_or("Unassigned");
            out.push_str(&format!(
                "- [{}]({}/browse/{}): {}\n  Release: {} | Product: {} | Assignee: {}\n",
                key, browse_base_url, key, summary, release, product, assignee
            ));
        }
    }
    out
}

/// Sprint labels sort by their first calendar month; anything unparseable
/// (including "Unknown") sorts last.
fn sprint_sort_key(label: &str) -> (bool, NaiveDate, String) {
    let parsed = label.split(',').next().and_then(|first| {
        NaiveDate::parse_from_str(&format!("01 {}", first.trim()), "%d %B %Y").ok()
    });
    match parsed {
        Some(date) => (false, date, label.to_string()),
        None => (true, NaiveDate::MAX, label.to_string()),
    }
}

fn wiki_block(intent: QueryIntent, results: &RouteResults) -> String {
    let pages = &results.wiki.items;
    if pages.is_empty() {
        return "Confluence Data: no information available for this query.".to_string();
    }
    let (page_limit, content_limit) = if intent.is_workflow() {
        (20, 4000)
    } else {
        (15, 3000)
    };
    let mut out = String::from(
        "Confluence Pages with Full Content (PRIMARY SOURCE for workflow questions):\n",
    );
    for page in pages.iter().take(page_limit) {
        out.push_str(&format!(
            "- [{}]({})\n  Content: {}...\n\n",
            page.title(),
            page.url(),
            truncated(&page.content, content_limit)
        ));
    }
    out
}

fn code_block(lower: &str, intent: QueryIntent, results: &RouteResults) -> String {
    let repos = &results.code.items;
    let diagram = DIAGRAM_TERMS.iter().any(|t| lower.contains(t));
    if repos.is_empty() {
        if diagram {
            return DIAGRAM_EMPTY_SENTINEL.to_string();
        }
        return "GitHub Data: no information available for this query.".to_string();
    }
    let limit = if intent.is_workflow() || diagram { 20 } else { 15 };
    let mut out = if diagram {
        DIAGRAM_REPO_HEADER.to_string()
    } else {
        String::from("GitHub Repositories with Details (PRIMARY SOURCE for workflow questions):\n")
    };
    for repo in repos.iter().take(limit) {
        out.push_str(&format!(
            "**Repository: {}**\n- URL: {}\n- Description: {}\n- Language: {}\n",
            repo.display_name(),
            repo.link(),
            repo.description(),
            repo.language()
        ));
        if let Some(files) = repo.file_count {
            out.push_str(&format!("- File Count: {}\n", files));
        }
        if let Some(lines) = repo.total_lines {
            out.push_str(&format!("- Total Lines: {}\n", lines));
        }
        if !repo.topics.is_empty() {
            out.push_str(&format!("- Topics: {}\n", repo.topics.join(", ")));
        }
        out.push_str(&format!(
            "\n**Use this repository's description to infer:**\n\
             - Component names and processes (extract from description: '{}')\n\
             - Functional areas and responsibilities\n\
             - How this repository fits into the overall flow\n\
             - Decision points and validation steps this repository might handle\n\n",
            repo.description()
        ));
    }
    out
}

fn helpdesk_block(intent: QueryIntent, results: &RouteResults) -> String {
    if intent.is_workflow() {
        return HELPDESK_SKIPPED_SENTINEL.to_string();
    }
    let articles = &results.helpdesk.items;
    if articles.is_empty() {
        return "Document360 Data: no information available for this query.".to_string();
    }
    let mut out = String::from("Document360 Articles with Content:\n");
    for article in articles.iter().take(15) {
        out.push_str(&format!(
            "- [{}]({})\n  Content: {}...\n\n",
            article.title(),
            article.url(),
            truncated(article.body(), 500)
        ));
    }
    out
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{BackendResult, Repository, WikiPage};
    use crate::router::RouteResults;
    use std::time::Instant;

    fn assembler() -> ContextAssembler {
        ContextAssembler::new(
            AssemblerConfig::default(),
            "https://ppinc.atlassian.net".to_string(),
        )
    }

    fn results_with_tickets(tickets: Vec<Ticket>) -> RouteResults {
        RouteResults {
            tickets: BackendResult::ok(tickets, None, Instant::now()),
            ticket_summary: Vec::new(),
            tickets_found: 0,
            wiki: BackendResult::skipped(),
            code: BackendResult::skipped(),
            helpdesk: BackendResult::skipped(),
            subject: None,
            jql_link: None,
        }
    }

    fn ticket(key: &str, points: f64, sprint: Option<&str>) -> Ticket {
        Ticket {
            issue_key: key.to_string(),
            summary: format!("Work on {}", key),
            story_points: Some(points),
            sprint_date: sprint.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_aggregation_block_presums_points() {
        let results = results_with_tickets(vec![
            ticket("PPA-1", 3.0, None),
            ticket("PPA-2", 5.0, None),
            ticket("PPA-3", 0.0, None),
            ticket("PPA-4", 2.0, None),
        ]);
        let text = assembler()
            .assemble(
                "total story points",
                QueryIntent::Aggregation,
                &GlossarySnapshot::default(),
                &results,
            )
            .joined();
        assert!(text.contains("**PRE-CALCULATED TOTAL STORY POINTS: 10**"));
        assert!(text.contains("Total tickets available: 4"));
        assert!(text.contains("- PPA-1: 3 pts | PM: N/A"));
    }

    #[test]
    fn test_timeline_block_sorts_sprints_chronologically() {
        let results = results_with_tickets(vec![
            ticket("PPA-1", 1.0, Some("November 2025")),
            ticket("PPA-2", 1.0, Some("October 2025")),
            ticket("PPA-3", 1.0, None),
            ticket("PPA-4", 1.0, Some("October 2025")),
        ]);
        let text = assembler()
            .assemble(
                "what is planned",
                QueryIntent::Listing,
                &GlossarySnapshot::default(),
                &results,
            )
            .joined();
        let october = text.find("### Sprint: October 2025 (2 tickets)").unwrap();
        let november = text.find("### Sprint: November 2025 (1 tickets)").unwrap();
        let unknown = text.find("### Sprint: Unknown (1 tickets)").unwrap();
        assert!(october < november);
        assert!(november < unknown);
        assert!(text.contains("(https://ppinc.atlassian.net/browse/PPA-2)"));
    }

    #[test]
    fn test_empty_backends_emit_sentinels() {
        let results = results_with_tickets(Vec::new());
        let text = assembler()
            .assemble(
                "anything",
                QueryIntent::General,
                &GlossarySnapshot::default(),
                &results,
            )
            .joined();
        assert!(text.contains("JIRA Data: no information available for this query."));
        assert!(text.contains("Confluence Data: no information available for this query."));
        assert!(text.contains("GitHub Data: no information available for this query."));
        assert!(text.contains("Document360 Data: no information available for this query."));
    }

    #[test]
    fn test_workflow_skips_helpdesk_with_reason() {
        let results = results_with_tickets(Vec::new());
        let text = assembler()
            .assemble(
                "explain the PPA workflow",
                QueryIntent::Workflow,
                &GlossarySnapshot::default(),
                &results,
            )
            .joined();
        assert!(text.contains("skipped for internal process/workflow questions"));
        assert!(text.contains("no information available"));
    }

    #[test]
    fn test_diagram_question_gets_diagram_repo_header() {
        let mut results = results_with_tickets(Vec::new());
        results.code = BackendResult::ok(
            vec![Repository {
                repository_name: Some("pulsepointinc/ad-serving".to_string()),
                github_url: Some("https://github.com/pulsepointinc/ad-serving".to_string()),
                description: Some("Ad serving decision engine".to_string()),
                ..Default::default()
            }],
            None,
            Instant::now(),
        );
        let text = assembler()
            .assemble(
                "draw a flowchart of ad serving",
                QueryIntent::Workflow,
                &GlossarySnapshot::default(),
                &results,
            )
            .joined();
        assert!(text.contains("=== GITHUB REPOSITORIES (PRIMARY SOURCE"));
        assert!(text.contains("**Repository: pulsepointinc/ad-serving**"));
        assert!(text.contains("extract from description: 'Ad serving decision engine'"));
    }

    #[test]
    fn test_diagram_question_without_repos_warns_but_permits() {
        let results = results_with_tickets(Vec::new());
        let text = assembler()
            .assemble(
                "draw a dataflow diagram",
                QueryIntent::Workflow,
                &GlossarySnapshot::default(),
                &results,
            )
            .joined();
        assert!(text.contains("WARNING - no information available for this diagram query"));
    }

    #[test]
    fn test_wiki_pages_truncated_with_links() {
        let mut results = results_with_tickets(Vec::new());
        results.wiki = BackendResult::ok(
            vec![WikiPage {
                title: "PPA Overview".to_string(),
                confluence_url: Some("https://wiki.example.com/ppa".to_string()),
                content: "x".repeat(5000),
                ..Default::default()
            }],
            None,
            Instant::now(),
        );
        let text = assembler()
            .assemble(
                "tell me about ppa",
                QueryIntent::General,
                &GlossarySnapshot::default(),
                &results,
            )
            .joined();
        assert!(text.contains("- [PPA Overview](https://wiki.example.com/ppa)"));
        // General questions carry at most 3000 chars of page content.
        let content_start = text.find("Content: ").unwrap() + "Content: ".len();
        let tail = &text[content_start..];
        let run = tail.chars().take_while(|c| *c == 'x').count();
        assert_eq!(run, 3000);
    }

    #[test]
    fn test_per_block_cap_applies() {
        let config = AssemblerConfig {
            max_block_chars: 80,
        };
        let assembler = ContextAssembler::new(config, "https://ppinc.atlassian.net".to_string());
        let tickets = (0..50)
            .map(|i| ticket(&format!("PPA-{}", i), 1.0, Some("October 2025")))
            .collect();
        let results = results_with_tickets(tickets);
        let context = assembler.assemble(
            "count of tickets",
            QueryIntent::Aggregation,
            &GlossarySnapshot::default(),
            &results,
        );
        let ticket_block = context
            .blocks
            .iter()
            .find(|b| b.source == "tickets")
            .unwrap();
        assert!(ticket_block.text.chars().count() <= 80);
    }
}
