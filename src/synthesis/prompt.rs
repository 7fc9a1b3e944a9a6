//! Synthesis prompt construction
//!
//! The prompt is the question, optional conversation context, the
//! assembled data blocks, and a fixed directive list teaching the model
//! how to treat each source. Workflow and diagram questions get an
//! additional directive block with Mermaid authoring rules.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analyzer::QueryIntent;
use crate::api::models::ChatTurn;

// Must match the URL written into the workflow directives below.
const DEFAULT_DIAGRAM_TOOL_URL: &str = "https://pulsepointinc.github.io/product/mermaid/index.html";

const PROMPT_HISTORY_TURNS: usize = 5;

const DIRECTIVES: &str = r#"CRITICAL INSTRUCTIONS:
1. ONLY use information that is explicitly provided in the Available Data section above
2. NEVER create, invent, or hallucinate JIRA tickets, assignees, or any other information
3. If no JIRA data is available, do NOT mention JIRA tickets or create fake ticket numbers
4. If no Confluence data is available, do NOT mention Confluence pages
5. If no GitHub data is available, do NOT mention GitHub repositories
6. If no Document360 data is available, do NOT mention Document360 articles
7. If no data is available for a source, clearly state "No [source] information available"
8. Only include clickable source links for data that actually exists in the Available Data
9. IMPORTANT: Process and synthesize ALL available content to provide comprehensive answers
10. For roadmap queries: Extract key factors, timelines, priorities, and dependencies from the content
11. For roadmap queries: Organize the roadmap by SPRINT DATE (when work was/is done) and RELEASE DATE (when features were/are planned to be released)
12. For roadmap queries: Group items by sprint_date and release_date in Month Year format (e.g., "January 2025", "March 2025")
13. For roadmap queries: Order items chronologically by sprint_date and release_date
14. For roadmap queries: Use sprint_date to show when work was planned/done, and release_date to show when features were/are released
15. For roadmap queries: Create a chronological timeline showing work by month/year periods
16. For aggregation queries: USE THE PRE-CALCULATED TOTAL STORY POINTS provided at the top of the JIRA data
17. For aggregation queries: Group tickets by the requested dimensions (product manager, stream, product, team, etc.)
18. For aggregation queries: Provide clear breakdowns with totals and subtotals
19. For aggregation queries: ALWAYS use the pre-calculated total as the final answer, do not recalculate manually
20. For roadmap queries with many tickets: Group tickets by Stream and Product with summary counts, don't list every individual ticket
21. For roadmap queries: Provide high-level overview grouped by sprint_date, then by Stream, then by Product
22. For "what is planned this sprint" queries: Provide a structured summary including:
    - Overall sprint summary with total epic count
    - Breakdown by Stream (with epic counts per stream)
    - Breakdown by Product (with epic counts per product)
    - Key highlights or major initiatives
    - Do NOT list every individual ticket
23. For general queries: Provide detailed information by processing all available content from all sources
24. Always end with "Sources:" section listing only the data sources that actually provided information
25. For JIRA sources: DO NOT list individual ticket links in the Sources section
26. For JIRA sources: ONLY include the JQL link at the end as: [JIRA Epics & Tickets](JQL_LINK)
27. IMPORTANT: The JQL link should include ALL tickets from the query, not just a subset
28. IMPORTANT: Individual tickets should be referenced inline in the response body when relevant, not listed separately at the end"#;

const WORKFLOW_DIRECTIVES: &str = "
29. FOR WORKFLOW/DATAFLOW/DIAGRAM QUESTIONS (CRITICAL):
    - GITHUB IS THE PRIMARY AND MOST IMPORTANT SOURCE for data flows, workflows, and architecture diagrams
    - If the question asks for a Mermaid diagram or mentions specific repositories (e.g., \"using repos pulsepointinc/ad-serving\"), you MUST:
      * Use the ACTUAL GitHub repository data provided in the Available Data section
      * Extract real component names, file paths, and relationships from the GitHub repositories
      * Map each component in the diagram to its actual repository
      * Include repository annotations (e.g., \"pulsepointinc/ad-serving: handles bid request processing\")
      * NEVER generate generic or hypothetical diagrams - ALWAYS base diagrams on actual repository data
    - For dataflow questions (e.g., \"ad serving dataflow from bid request to paid impression\"):
      * GitHub repositories are the PRIMARY source - use them to understand the actual implementation
      * Extract decision points, components, and flows from the actual repository structure
      * Include all yes/no decision branches based on actual code logic when available
      * Use subgraphs to group components by repository or function
    - Confluence can provide additional context about workflows and processes
    - JIRA tickets should be used ONLY for context about current work/improvements, NOT as the primary source for workflow explanation
    - ALWAYS cite GitHub API as a source when generating Mermaid diagrams or explaining workflows
    - If GitHub data is provided, you MUST use it - do not generate generic responses
    - Structure Mermaid diagrams with COMPREHENSIVE detail:
      * Use descriptive, specific component names based on repository descriptions (e.g., \"Validate Bid Request\" not just \"Validate\")
      * Include ALL decision points with clear yes/no branches - every decision must have both paths
      * Show COMPLETE flows with ALL intermediate steps, not just start and end
      * Use subgraphs to group components by repository (e.g., `subgraph pulsepointinc/ad-serving`)
      * Include error/rejection paths for all decision points that can fail
      * Map each major component to its repository in subgraph labels
      * Use detailed node labels: `[Specific Process Name]` for actions, `{Clear Decision Question?}` for decisions
      * Include granular detail - do NOT create simplified diagrams, show the full journey with all steps
    - CRITICAL: Mermaid Syntax Validation - BEFORE including any Mermaid diagram, you MUST validate and fix the syntax:
      * Parentheses in labels: If a node label contains parentheses (e.g., \"Notify Advertiser (Campaign Rejected)\"), you MUST wrap the entire label in quotes: Q[\"Notify Advertiser (Campaign Rejected)\"] NOT Q[Notify Advertiser (Campaign Rejected)]
      * Special characters: Avoid special characters like /, :, | in node labels unless quoted. Use spaces or underscores instead.
      * Quoted labels: Any label with parentheses, special characters, or spaces that might cause issues should be quoted: [\"Label with (parens)\"] or {Decision with / special chars?}
      * Subgraph labels: Subgraph labels should NOT contain parentheses - use simple names: subgraph AdServing NOT subgraph \"Ad Serving (Platform)\"
      * Validation checklist: (1) All node labels with parentheses are quoted, (2) No unquoted parentheses in node labels, (3) No pipe characters | in unquoted labels (only use | for edge labels), (4) Subgraph labels are simple (no parentheses), (5) All decision nodes use curly braces: {Decision?}, (6) All process nodes use square brackets: [Process]
      * If validation fails: Fix the syntax before including the diagram. Do NOT include invalid Mermaid code that will cause parsing errors.
    - CRITICAL: After EVERY Mermaid diagram code block, ALWAYS include a link to the Mermaid tool
    - Mermaid tool link format: `[\u{1F4CA} View and Edit Diagram in Mermaid Tool](https://pulsepointinc.github.io/product/mermaid/index.html?diagram=ENCODED_CODE)`
    - Replace ENCODED_CODE with the URL-encoded version of the Mermaid code
    - NEVER use the old rawcdn.githack.com URL - ALWAYS use: https://pulsepointinc.github.io/product/mermaid/index.html
    - Example: If your diagram code is `flowchart TD\nA-->B`, the link should be: `[\u{1F4CA} View and Edit Diagram in Mermaid Tool](https://pulsepointinc.github.io/product/mermaid/index.html?diagram=flowchart%20TD%0AA--%3EB)`
";

const FORMATTING_NOTES: &str = r#"IMPORTANT FORMATTING NOTES:
- Use proper text contrast: dark text on light backgrounds, light text on dark backgrounds
- After providing comprehensive answers, especially for complex topics like workflows, dataflows, or architecture, consider asking a helpful follow-up question to engage the user
- Follow-up questions should be relevant and provide additional value, such as:
  * "Would you like me to also generate a diagram showing [related process]?"
  * "Would you like more details about [specific aspect]?"
  * "Should I also explain [complementary topic]?"
- Keep the conversational tone friendly and helpful, similar to ChatGPT"#;

lazy_static! {
    // Tried in order; the first quoted capture wins.
    static ref DISCLAIMER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r#"(?is)Always provide the statement to all answers:\s*"([^"]+)""#).unwrap(),
        Regex::new(r#"(?is)statement to all answers[^"]*"([^"]+)""#).unwrap(),
        Regex::new(r#"(?is)statement.*?:\s*"([^"]+)""#).unwrap(),
        Regex::new(r#"(?is)disclaimer.*?:\s*"([^"]+)""#).unwrap(),
    ];
}

/// Render the previous conversation for inclusion in the prompt. Empty
/// history renders as nothing.
pub fn build_conversation(history: &[ChatTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\n=== PREVIOUS CONVERSATION ===\n");
    let start = history.len().saturating_sub(PROMPT_HISTORY_TURNS);
    for turn in &history[start..] {
        match turn.role.as_str() {
            "user" => out.push_str(&format!("User: {}\n", turn.content)),
            "assistant" => out.push_str(&format!("Assistant: {}\n", turn.content)),
            _ => {}
        }
    }
    out.push_str("\n=== END OF PREVIOUS CONVERSATION ===\n");
    out.push_str(
        "\nIMPORTANT: The current question may be a follow-up to the previous conversation. \
         Please consider the context when answering.\n",
    );
    out
}

/// Whether the prompt carries the workflow/diagram directive block.
pub fn include_workflow_directives(intent: QueryIntent, lower_question: &str) -> bool {
    intent.is_workflow()
        || lower_question.contains("diagram")
        || lower_question.contains("flowchart")
        || lower_question.contains("dataflow")
        || lower_question.contains("data flow")
}

pub fn build_prompt(
    question: &str,
    conversation: &str,
    full_context: &str,
    jql_link: Option<&str>,
    include_workflow: bool,
    diagram_tool_url: &str,
) -> String {
    let workflow = if include_workflow {
        WORKFLOW_DIRECTIVES.replace(DEFAULT_DIAGRAM_TOOL_URL, diagram_tool_url)
    } else {
        String::new()
    };
    format!(
        "\nQuestion: {question}\n{conversation}\nAvailable Data:\n{context}\n\nJQL Link: {jql}\n\n{directives}\n{workflow}\nRespond professionally and helpfully, processing all available content to provide the most comprehensive and useful response possible.\n\n{formatting}\n",
        question = question,
        conversation = conversation,
        context = full_context,
        jql = jql_link.unwrap_or("None provided"),
        directives = DIRECTIVES,
        workflow = workflow,
        formatting = FORMATTING_NOTES,
    )
}

/// Pull the mandatory answer disclaimer out of the instruction text.
pub fn extract_disclaimer(instructions: &str) -> Option<String> {
    for pattern in DISCLAIMER_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(instructions) {
            if let Some(text) = captures.get(1) {
                let trimmed = text.as_str().trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_empty_history_renders_nothing() {
        assert_eq!(build_conversation(&[]), "");
    }

    #[test]
    fn test_conversation_includes_last_turns_only() {
        let history: Vec<ChatTurn> = (0..8)
            .map(|i| turn(if i % 2 == 0 { "user" } else { "assistant" }, &format!("m{}", i)))
            .collect();
        let rendered = build_conversation(&history);
        assert!(rendered.contains("=== PREVIOUS CONVERSATION ==="));
        assert!(rendered.contains("Assistant: m7\n"));
        assert!(rendered.contains("User: m4\n"));
        assert!(!rendered.contains("m2"));
        assert!(rendered.contains("may be a follow-up"));
    }

    #[test]
    fn test_system_roles_are_dropped() {
        let history = vec![turn("system", "hidden"), turn("user", "hi")];
        let rendered = build_conversation(&history);
        assert!(!rendered.contains("hidden"));
        assert!(rendered.contains("User: hi\n"));
    }

    #[test]
    fn test_workflow_directives_toggle() {
        assert!(include_workflow_directives(QueryIntent::Workflow, "explain ppa"));
        assert!(include_workflow_directives(QueryIntent::General, "show a flowchart"));
        assert!(!include_workflow_directives(QueryIntent::General, "open tickets"));
    }

    #[test]
    fn test_prompt_without_workflow_block() {
        let prompt = build_prompt(
            "open tickets",
            "",
            "JIRA Data: no information available for this query.",
            None,
            false,
            DEFAULT_DIAGRAM_TOOL_URL,
        );
        assert!(prompt.contains("Question: open tickets"));
        assert!(prompt.contains("JQL Link: None provided"));
        assert!(prompt.contains("CRITICAL INSTRUCTIONS:"));
        assert!(!prompt.contains("29. FOR WORKFLOW/DATAFLOW/DIAGRAM QUESTIONS"));
        assert!(prompt.contains("IMPORTANT FORMATTING NOTES:"));
    }

    #[test]
    fn test_prompt_with_workflow_block_and_custom_tool_url() {
        let prompt = build_prompt(
            "draw the ad serving dataflow",
            "",
            "context",
            Some("https://ppinc.atlassian.net/issues/?jql=key+in+(PPA-1)"),
            true,
            "https://tools.example.com/mermaid/index.html",
        );
        assert!(prompt.contains("29. FOR WORKFLOW/DATAFLOW/DIAGRAM QUESTIONS (CRITICAL):"));
        assert!(prompt.contains("https://tools.example.com/mermaid/index.html?diagram=ENCODED_CODE"));
        assert!(!prompt.contains("pulsepointinc.github.io"));
        assert!(prompt.contains("JQL Link: https://ppinc.atlassian.net/issues/?jql=key+in+(PPA-1)"));
    }

    #[test]
    fn test_disclaimer_primary_pattern() {
        let instructions = r#"## Core rules
Always provide the statement to all answers: "Answers are AI-generated; verify with the product team."
More text."#;
        assert_eq!(
            extract_disclaimer(instructions).as_deref(),
            Some("Answers are AI-generated; verify with the product team.")
        );
    }

    #[test]
    fn test_disclaimer_fallback_pattern() {
        let instructions = r#"Standard disclaimer: "Internal use only.""#;
        assert_eq!(extract_disclaimer(instructions).as_deref(), Some("Internal use only."));
    }

    #[test]
    fn test_disclaimer_absent() {
        assert_eq!(extract_disclaimer("no quoted statements here"), None);
    }
}
