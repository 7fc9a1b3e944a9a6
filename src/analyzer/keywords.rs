//! Search keyword extraction

use lazy_static::lazy_static;
use regex::Regex;

use crate::glossary::GlossarySnapshot;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\b\w+\b").unwrap();
}

const STOP_WORDS: &[&str] = &[
    "what", "is", "the", "of", "in", "to", "for", "with", "on", "at", "by", "from", "and", "or",
    "but", "can", "you", "tell", "me", "about", "details", "information", "how", "does", "work",
    "show", "list", "find", "get", "all", "any", "some", "please", "provide", "detailed",
    "including",
];

/// Extract up to five search keywords from a lowercased question.
///
/// Stop words and single characters are dropped, first occurrence wins, and
/// glossary definitions for known acronyms are appended after the base terms
/// before the cap is applied.
pub fn extract(lower: &str, snapshot: &GlossarySnapshot) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for m in WORD.find_iter(lower) {
        let word = m.as_str();
        if word.chars().count() <= 1 || STOP_WORDS.contains(&word) {
            continue;
        }
        if !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }

    // Definitions go after every base keyword so the cap never displaces a
    // term the user actually typed.
    let mut expanded = keywords.clone();
    for keyword in &keywords {
        if let Some(definition) = snapshot.acronym_definition(keyword) {
            let definition = definition.to_lowercase();
            if !expanded.contains(&definition) {
                expanded.push(definition);
            }
        }
    }
    expanded.truncate(5);
    expanded
}
