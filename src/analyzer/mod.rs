//! Question analysis
//!
//! Turns a raw question into a classified intent, search keywords, and
//! tracker filter hints. Analysis is infallible: a question nothing matches
//! comes back as a general query with whatever keywords survived.

mod dates;
mod intent;
mod keywords;
mod subject;

pub use intent::QueryIntent;
pub use subject::extract_subject;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::VocabularyConfig;
use crate::glossary::GlossarySnapshot;

/// Filter hints for the ticket tracker, filled by analysis and enriched by
/// the connector before the wire call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketFilters {
    pub team: Option<String>,
    pub sprint_date: Option<String>,
    pub release_date: Option<String>,
    pub issue_type_name: Option<String>,
    pub summary: Option<String>,
    pub search_terms: Option<SearchTerms>,
}

/// The tracker accepts search terms as either a single phrase or a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchTerms {
    Phrase(String),
    List(Vec<String>),
}

/// Everything downstream stages need to know about the question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnalysis {
    pub intent: QueryIntent,
    pub keywords: Vec<String>,
    pub filters: TicketFilters,
}

/// Analyze a question against the current glossary snapshot.
pub fn analyze(
    question: &str,
    snapshot: &GlossarySnapshot,
    vocabulary: &VocabularyConfig,
    now: DateTime<Utc>,
) -> QueryAnalysis {
    let lower = question.to_lowercase();
    let intent = intent::classify(question, &lower);
    let keywords = keywords::extract(&lower, snapshot);

    let mut filters = TicketFilters::default();
    if let Some(team) = vocabulary.match_team(&lower) {
        filters.team = Some(team.to_string());
    }
    dates::apply(&lower, now.date_naive(), &mut filters);

    QueryAnalysis {
        intent,
        keywords,
        filters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sprint_question_keeps_grain_open() {
        let analysis = analyze(
            "what tickets are planned this sprint",
            &GlossarySnapshot::default(),
            &VocabularyConfig::default(),
            fixed_now(),
        );
        assert_eq!(analysis.intent, QueryIntent::JiraOnly);
        assert_eq!(analysis.filters.sprint_date.as_deref(), Some("October 2025"));
        assert_eq!(analysis.filters.issue_type_name, None);
    }

    #[test]
    fn test_team_aggregation_question() {
        let analysis = analyze(
            "total story points for Backend team",
            &GlossarySnapshot::default(),
            &VocabularyConfig::default(),
            fixed_now(),
        );
        assert_eq!(analysis.intent, QueryIntent::Aggregation);
        assert_eq!(analysis.filters.team.as_deref(), Some("Backend"));
        assert_eq!(analysis.filters.issue_type_name, None);
    }

    #[test]
    fn test_unmatched_question_is_general() {
        let analysis = analyze(
            "hello",
            &GlossarySnapshot::default(),
            &VocabularyConfig::default(),
            fixed_now(),
        );
        assert_eq!(analysis.intent, QueryIntent::General);
        assert!(analysis.keywords == vec!["hello".to_string()]);
        assert_eq!(analysis.filters, TicketFilters::default());
    }

    #[test]
    fn test_search_terms_serialize_flat() {
        assert_eq!(
            serde_json::to_string(&SearchTerms::Phrase("ao roadmap".into())).unwrap(),
            "\"ao roadmap\""
        );
        assert_eq!(
            serde_json::to_string(&SearchTerms::List(vec!["OA".into(), "audience".into()]))
                .unwrap(),
            "[\"OA\",\"audience\"]"
        );
    }
}
