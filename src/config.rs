//! Service configuration
//!
//! Every setting has a sensible default, can be overridden from an optional
//! config file (`ORCHESTRATOR_CONFIG`), and finally from environment
//! variables. Secrets are held behind `secrecy` so they never end up in
//! debug output.

use std::time::Duration;

use secrecy::Secret;
use serde::Deserialize;

use crate::error::OrchestratorError;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub glossary: GlossaryConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub assembler: AssemblerConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

impl Config {
    /// Load configuration: file (if `ORCHESTRATOR_CONFIG` points at one),
    /// then environment overrides on top.
    pub fn load() -> Result<Self, OrchestratorError> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var("ORCHESTRATOR_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path));
        }
        let settings = builder
            .build()
            .map_err(|e| OrchestratorError::Config(e.to_string()))?;
        let config: Config = settings
            .try_deserialize()
            .map_err(|e| OrchestratorError::Config(e.to_string()))?;
        Ok(config.from_env())
    }

    /// Apply environment variable overrides.
    pub fn from_env(mut self) -> Self {
        self.server = self.server.from_env();
        self.glossary = self.glossary.from_env();
        self.backends = self.backends.from_env();
        self.synthesis = self.synthesis.from_env();
        self
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("SERVER_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.port = port;
            }
        }
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the glossary context files live and how long a snapshot stays fresh.
#[derive(Debug, Clone, Deserialize)]
pub struct GlossaryConfig {
    #[serde(default = "default_glossary_base_url")]
    pub base_url: String,
    #[serde(default = "default_glossary_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_glossary_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

fn default_glossary_base_url() -> String {
    "https://raw.githubusercontent.com/pulsepointinc/product/main/GPT".to_string()
}

fn default_glossary_ttl_secs() -> u64 {
    21_600
}

fn default_glossary_fetch_timeout_ms() -> u64 {
    10_000
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            base_url: default_glossary_base_url(),
            ttl_secs: default_glossary_ttl_secs(),
            fetch_timeout_ms: default_glossary_fetch_timeout_ms(),
        }
    }
}

impl GlossaryConfig {
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("GLOSSARY_BASE_URL") {
            self.base_url = val;
        }
        if let Ok(val) = std::env::var("GLOSSARY_TTL_SECS") {
            if let Ok(secs) = val.parse() {
                self.ttl_secs = secs;
            }
        }
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// The four retrieval backends.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendsConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default = "default_wiki_backend")]
    pub wiki: BackendConfig,
    #[serde(default = "default_code_backend")]
    pub code: BackendConfig,
    #[serde(default = "default_helpdesk_backend")]
    pub helpdesk: BackendConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            wiki: default_wiki_backend(),
            code: default_code_backend(),
            helpdesk: default_helpdesk_backend(),
        }
    }
}

impl BackendsConfig {
    pub fn from_env(mut self) -> Self {
        self.tracker = self.tracker.from_env();
        if let Ok(val) = std::env::var("WIKI_API_URL") {
            self.wiki.url = val;
        }
        if let Ok(val) = std::env::var("CODE_API_URL") {
            self.code.url = val;
        }
        if let Ok(val) = std::env::var("HELPDESK_API_URL") {
            self.helpdesk.url = val;
        }
        self
    }
}

/// A single backend endpoint: client timeout plus how long the router is
/// willing to wait for the spawned call before abandoning it.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_backend_wait_ms")]
    pub wait_timeout_ms: u64,
}

fn default_backend_timeout_ms() -> u64 {
    30_000
}

fn default_backend_wait_ms() -> u64 {
    30_000
}

fn default_wiki_backend() -> BackendConfig {
    BackendConfig {
        url: "http://confluence-search.internal".to_string(),
        timeout_ms: default_backend_timeout_ms(),
        wait_timeout_ms: default_backend_wait_ms(),
    }
}

fn default_code_backend() -> BackendConfig {
    BackendConfig {
        url: "http://github-search.internal".to_string(),
        timeout_ms: default_backend_timeout_ms(),
        wait_timeout_ms: default_backend_wait_ms(),
    }
}

fn default_helpdesk_backend() -> BackendConfig {
    BackendConfig {
        url: "http://document360-search.internal".to_string(),
        timeout_ms: default_backend_timeout_ms(),
        wait_timeout_ms: default_backend_wait_ms(),
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            url: String::new(),
            timeout_ms: default_backend_timeout_ms(),
            wait_timeout_ms: default_backend_wait_ms(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

/// Ticket tracker backend. Slower than the others, so it gets a longer
/// router wait, plus the browse/navigator base used to build links.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_tracker_wait_ms")]
    pub wait_timeout_ms: u64,
    #[serde(default = "default_tracker_browse_url")]
    pub browse_base_url: String,
    #[serde(default = "default_tracker_max_results")]
    pub default_max_results: u32,
}

fn default_tracker_wait_ms() -> u64 {
    40_000
}

fn default_tracker_browse_url() -> String {
    "https://ppinc.atlassian.net".to_string()
}

fn default_tracker_max_results() -> u32 {
    100
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url: "http://jira-query.internal".to_string(),
            timeout_ms: default_backend_timeout_ms(),
            wait_timeout_ms: default_tracker_wait_ms(),
            browse_base_url: default_tracker_browse_url(),
            default_max_results: default_tracker_max_results(),
        }
    }
}

impl TrackerConfig {
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("TRACKER_API_URL") {
            self.url = val;
        }
        if let Ok(val) = std::env::var("TRACKER_BROWSE_URL") {
            self.browse_base_url = val;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

/// Concurrency limits for fan-out queries.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_workflow_pool")]
    pub workflow_pool_size: usize,
    #[serde(default = "default_general_pool")]
    pub general_pool_size: usize,
}

fn default_workflow_pool() -> usize {
    6
}

fn default_general_pool() -> usize {
    8
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            workflow_pool_size: default_workflow_pool(),
            general_pool_size: default_general_pool(),
        }
    }
}

/// Context assembly limits.
#[derive(Debug, Clone, Deserialize)]
pub struct AssemblerConfig {
    #[serde(default = "default_max_block_chars")]
    pub max_block_chars: usize,
}

fn default_max_block_chars() -> usize {
    100_000
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_block_chars: default_max_block_chars(),
        }
    }
}

/// LLM synthesis settings for both provider families.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub openai_api_key: Option<Secret<String>>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default)]
    pub gemini_api_key: Option<Secret<String>>,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_synthesis_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_workflow_max_tokens")]
    pub workflow_max_tokens: u32,
    /// System instructions passed to the model. The mandatory disclaimer, if
    /// any, is extracted from this text.
    #[serde(default)]
    pub system_instructions: Option<String>,
    #[serde(default = "default_diagram_tool_url")]
    pub diagram_tool_url: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_synthesis_timeout_ms() -> u64 {
    60_000
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_tokens() -> u32 {
    1_000
}

fn default_workflow_max_tokens() -> u32 {
    2_000
}

fn default_diagram_tool_url() -> String {
    "https://pulsepointinc.github.io/product/mermaid/index.html".to_string()
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            gemini_api_key: None,
            gemini_base_url: default_gemini_base_url(),
            timeout_ms: default_synthesis_timeout_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            workflow_max_tokens: default_workflow_max_tokens(),
            system_instructions: None,
            diagram_tool_url: default_diagram_tool_url(),
        }
    }
}

impl SynthesisConfig {
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            if !val.trim().is_empty() {
                self.openai_api_key = Some(Secret::new(val));
            }
        }
        if let Ok(val) = std::env::var("OPENAI_BASE_URL") {
            self.openai_base_url = val;
        }
        if let Ok(val) = std::env::var("GEMINI_API_KEY") {
            if !val.trim().is_empty() {
                self.gemini_api_key = Some(Secret::new(val));
            }
        }
        if let Ok(val) = std::env::var("GEMINI_BASE_URL") {
            self.gemini_base_url = val;
        }
        if let Ok(val) = std::env::var("SYNTHESIS_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.timeout_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("SYNTHESIS_INSTRUCTIONS") {
            self.system_instructions = Some(val);
        } else if let Ok(path) = std::env::var("SYNTHESIS_INSTRUCTIONS_PATH") {
            if let Ok(text) = std::fs::read_to_string(path) {
                self.system_instructions = Some(text);
            }
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn gemini_available(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

/// Deployment vocabulary, kept as data so other installs can swap it out.
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyConfig {
    /// Team name detection: any matching phrase maps to the canonical name.
    #[serde(default = "default_team_patterns")]
    pub team_patterns: Vec<TeamPattern>,
    /// Shorthand for the optimization product line; presence rewrites the
    /// tracker summary filter.
    #[serde(default = "default_optimization_terms")]
    pub optimization_terms: Vec<String>,
    #[serde(default = "default_optimization_summary")]
    pub optimization_summary: String,
    #[serde(default = "default_optimization_product")]
    pub optimization_product: String,
    #[serde(default = "default_optimization_stream")]
    pub optimization_stream: String,
    /// Omnichannel product vocabulary.
    #[serde(default = "default_omnichannel_terms")]
    pub omnichannel_terms: Vec<String>,
    #[serde(default = "default_omnichannel_summary")]
    pub omnichannel_summary: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamPattern {
    pub phrases: Vec<String>,
    pub canonical: String,
}

fn default_team_patterns() -> Vec<TeamPattern> {
    vec![
        TeamPattern {
            phrases: vec![
                "front end portal development".to_string(),
                "front end".to_string(),
                "frontend".to_string(),
            ],
            canonical: "Front End Portal Development".to_string(),
        },
        TeamPattern {
            phrases: vec!["backend".to_string(), "back end".to_string()],
            canonical: "Backend".to_string(),
        },
        TeamPattern {
            phrases: vec!["data analysis".to_string(), "data analytics".to_string()],
            canonical: "Data Analysis".to_string(),
        },
    ]
}

fn default_optimization_terms() -> Vec<String> {
    vec![
        "ao".to_string(),
        "adaptive optimization".to_string(),
        "adaptive".to_string(),
    ]
}

fn default_optimization_summary() -> String {
    "AO".to_string()
}

fn default_optimization_product() -> String {
    "Adaptive Optimization".to_string()
}

fn default_optimization_stream() -> String {
    "Optimization".to_string()
}

fn default_omnichannel_terms() -> Vec<String> {
    vec!["omnichannel".to_string()]
}

fn default_omnichannel_summary() -> String {
    "Omnichannel".to_string()
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            team_patterns: default_team_patterns(),
            optimization_terms: default_optimization_terms(),
            optimization_summary: default_optimization_summary(),
            optimization_product: default_optimization_product(),
            optimization_stream: default_optimization_stream(),
            omnichannel_terms: default_omnichannel_terms(),
            omnichannel_summary: default_omnichannel_summary(),
        }
    }
}

impl VocabularyConfig {
    /// Canonical team name for a lowercased question, if any phrase matches.
    pub fn match_team(&self, question: &str) -> Option<&str> {
        for pattern in &self.team_patterns {
            if pattern.phrases.iter().any(|p| question.contains(p.as_str())) {
                return Some(pattern.canonical.as_str());
            }
        }
        None
    }

    pub fn mentions_optimization(&self, question: &str) -> bool {
        self.optimization_terms
            .iter()
            .any(|t| question.contains(t.as_str()))
    }

    pub fn mentions_omnichannel(&self, question: &str) -> bool {
        self.omnichannel_terms
            .iter()
            .any(|t| question.contains(t.as_str()))
    }
}
