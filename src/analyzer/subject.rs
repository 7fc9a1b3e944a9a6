//! Workflow subject extraction
//!
//! Pulls the system or product acronym out of a workflow question so the
//! tracker search can be narrowed to tickets that actually mention it.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Ordered, case sensitive: an upper-case run is what makes a subject.
    static ref SUBJECT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"workflow\s+of\s+(?:the\s+)?([A-Z]+)").unwrap(),
        Regex::new(r"what\s+is\s+([A-Z]+)\s+the\s+process").unwrap(),
        Regex::new(r"describe\s+([A-Z]+)\s+the\s+process").unwrap(),
        Regex::new(r"explain\s+([A-Z]+)\s+the\s+process").unwrap(),
        Regex::new(r"(?:how\s+does|explain|describe|tell\s+me\s+about)\s+([A-Z]+)").unwrap(),
        Regex::new(r"(?:what|how|explain|describe).*?([A-Z]{2,})").unwrap(),
    ];
}

fn is_acronym(word: &str) -> bool {
    word.chars().count() >= 2 && word.chars().all(|c| c.is_ascii_uppercase())
}

/// Extract the subject acronym from a raw (case-preserved) question.
pub fn extract_subject(question: &str) -> Option<String> {
    for pattern in SUBJECT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(question) {
            if let Some(m) = caps.get(1) {
                return Some(m.as_str().to_string());
            }
        }
    }
    question
        .split_whitespace()
        .find(|w| is_acronym(w))
        .map(|w| w.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_of_pattern() {
        assert_eq!(
            extract_subject("show the workflow of the HDM system"),
            Some("HDM".to_string())
        );
    }

    #[test]
    fn test_how_does_pattern() {
        assert_eq!(
            extract_subject("how does CDP ingest data"),
            Some("CDP".to_string())
        );
    }

    #[test]
    fn test_loose_pattern_skips_lowercase() {
        assert_eq!(
            extract_subject("what is the PPA approval flow"),
            Some("PPA".to_string())
        );
    }

    #[test]
    fn test_fallback_to_acronym_token() {
        // Sentence-capitalized verbs defeat the lowercase patterns; the raw
        // token scan still finds the subject.
        assert_eq!(
            extract_subject("Explain HDM end to end"),
            Some("HDM".to_string())
        );
    }

    #[test]
    fn test_no_subject() {
        assert_eq!(extract_subject("explain the campaign review steps"), None);
    }

    #[test]
    fn test_single_letter_not_a_subject() {
        assert_eq!(extract_subject("what is A doing"), None);
    }
}
