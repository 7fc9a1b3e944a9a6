//! Immutable glossary snapshot with derived lookups

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

/// The context files fetched on every refresh, by basename.
pub const GLOSSARY_FILES: &[&str] = &[
    "acronyms",
    "products",
    "stream_leads",
    "official_sources",
    "workflow_instructions",
    "jira_field_definitions",
];

/// One refresh worth of glossary data, shared immutably across requests.
///
/// A file that failed to load is simply absent here; lookups against its
/// section come back empty rather than erroring.
#[derive(Debug, Clone, Default)]
pub struct GlossarySnapshot {
    loaded_at: Option<Instant>,
    pub acronym_sections: Map<String, Value>,
    pub products: Map<String, Value>,
    pub stream_leads: Map<String, Value>,
    pub official_sources: Value,
    pub workflow_instructions: Value,
    pub field_definitions: Value,
    acronym_lookup: BTreeMap<String, String>,
}

fn object_or_empty(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

impl GlossarySnapshot {
    /// Build a snapshot from fetched files, stamping it fresh.
    pub fn from_files(mut files: HashMap<&str, Value>) -> Self {
        let acronym_sections = object_or_empty(files.remove("acronyms"));
        let products = object_or_empty(files.remove("products"));
        let stream_leads = object_or_empty(files.remove("stream_leads"));
        let official_sources = files.remove("official_sources").unwrap_or(Value::Null);
        let workflow_instructions = files.remove("workflow_instructions").unwrap_or(Value::Null);
        let field_definitions = files.remove("jira_field_definitions").unwrap_or(Value::Null);

        // Flatten acronym sections into one upper-cased lookup. The file
        // usually nests acronyms under topic sections, but flat entries
        // appear too.
        let mut acronym_lookup = BTreeMap::new();
        for (key, value) in &acronym_sections {
            match value {
                Value::Object(section) => {
                    for (acronym, definition) in section {
                        if let Some(text) = definition.as_str() {
                            acronym_lookup.insert(acronym.to_uppercase(), text.to_string());
                        }
                    }
                }
                Value::String(definition) => {
                    acronym_lookup.insert(key.to_uppercase(), definition.clone());
                }
                _ => {}
            }
        }

        Self {
            loaded_at: Some(Instant::now()),
            acronym_sections,
            products,
            stream_leads,
            official_sources,
            workflow_instructions,
            field_definitions,
            acronym_lookup,
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.loaded_at.map(|t| t.elapsed() < ttl).unwrap_or(false)
    }

    /// Definition for a keyword if it is a known acronym (case insensitive).
    pub fn acronym_definition(&self, keyword: &str) -> Option<&str> {
        self.acronym_lookup
            .get(&keyword.to_uppercase())
            .map(String::as_str)
    }

    /// All known acronyms with definitions, in stable order.
    pub fn acronyms(&self) -> &BTreeMap<String, String> {
        &self.acronym_lookup
    }

    /// First product whose name appears in the lowercased question.
    pub fn matching_product(&self, lower_question: &str) -> Option<&str> {
        self.products
            .keys()
            .find(|name| lower_question.contains(name.to_lowercase().as_str()))
            .map(String::as_str)
    }

    /// First stream whose name appears in the lowercased question.
    pub fn matching_stream(&self, lower_question: &str) -> Option<&str> {
        self.stream_leads
            .keys()
            .find(|name| lower_question.contains(name.to_lowercase().as_str()))
            .map(String::as_str)
    }

    pub fn section_count(&self) -> usize {
        self.acronym_sections.len()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn has_instructions(&self) -> bool {
        match &self.workflow_instructions {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Object(m) => !m.is_empty(),
            _ => true,
        }
    }

    /// The instructions document as plain text, however the file shapes it.
    pub fn instructions_text(&self) -> Option<&str> {
        match &self.workflow_instructions {
            Value::String(s) => Some(s.as_str()),
            Value::Object(m) => m
                .get("content")
                .or_else(|| m.get("instructions"))
                .or_else(|| m.get("text"))
                .and_then(Value::as_str),
            _ => None,
        }
    }
}
