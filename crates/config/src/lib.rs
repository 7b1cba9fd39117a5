//! Configuration loading, validation, and management for Git Buddy.
//!
//! Loads configuration from `~/.gitbuddy/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.gitbuddy/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenAI API key (chat completions and embeddings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// Pinecone API key (documentation index)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinecone_api_key: Option<String>,

    /// Chat completion model
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model used to query the index
    #[serde(default = "default_embeddings_model")]
    pub embeddings_model: String,

    /// Sampling temperature for every completion
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_embeddings_model() -> String {
    "text-embedding-ada-002".into()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("pinecone_api_key", &redact(&self.pinecone_api_key))
            .field("model", &self.model)
            .field("embeddings_model", &self.embeddings_model)
            .field("temperature", &self.temperature)
            .field("api_url", &self.api_url)
            .field("index", &self.index)
            .field("rate_limit", &self.rate_limit)
            .field("budget", &self.budget)
            .field("memory", &self.memory)
            .field("sources", &self.sources)
            .field("search", &self.search)
            .field("shell", &self.shell)
            .field("agent", &self.agent)
            .finish()
    }
}

/// The vector index holding the documentation corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,

    /// Index host, e.g. `git-buddy-index-abc123.svc.us-east1-gcp.pinecone.io`
    #[serde(default)]
    pub host: String,

    /// Documents retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_index_name() -> String {
    "git-buddy-index".into()
}
fn default_top_k() -> usize {
    3
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            host: String::new(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_requests_per_minute() -> u32 {
    500
}
fn default_burst() -> u32 {
    1
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
        }
    }
}

/// Prompt size limits, in tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_target_tokens")]
    pub target_tokens: usize,
}

fn default_max_tokens() -> usize {
    60_000
}
fn default_target_tokens() -> usize {
    40_000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            target_tokens: default_target_tokens(),
        }
    }
}

/// Conversation window sizes, in exchanges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_rag_window")]
    pub rag_window: usize,

    #[serde(default = "default_agent_window")]
    pub agent_window: usize,
}

fn default_rag_window() -> usize {
    4
}
fn default_agent_window() -> usize {
    3
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            rag_window: default_rag_window(),
            agent_window: default_agent_window(),
        }
    }
}

/// Source-link resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Substring removed from every resolved link
    #[serde(default = "default_strip_fragment")]
    pub strip_fragment: String,

    /// Links never shown to the user
    #[serde(default = "default_dead_links")]
    pub dead_links: Vec<String>,

    #[serde(default = "default_max_lookups")]
    pub max_lookups: usize,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
}

fn default_strip_fragment() -> String {
    "/enterprise-server@3.6".into()
}
fn default_dead_links() -> Vec<String> {
    vec!["https://playrusvulkan.org/tortoise-git-quick-guide".into()]
}
fn default_max_lookups() -> usize {
    5
}
fn default_concurrency() -> usize {
    3
}
fn default_lookup_timeout_secs() -> u64 {
    10
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            strip_fragment: default_strip_fragment(),
            dead_links: default_dead_links(),
            max_lookups: default_max_lookups(),
            concurrency: default_concurrency(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_search_base_url() -> String {
    "https://html.duckduckgo.com/html/".into()
}
fn default_max_results() -> usize {
    4
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            max_results: default_max_results(),
        }
    }
}

/// Accepted question length, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_min_chars() -> usize {
    10
}
fn default_max_chars() -> usize {
    1000
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            max_chars: default_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Run the document retriever before any web search tool
    #[serde(default = "default_true")]
    pub retrieval_first: bool,
}

fn default_max_iterations() -> usize {
    10
}
fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            retrieval_first: true,
        }
    }
}

/// Both API keys, present and non-empty.
#[derive(Clone)]
pub struct Secrets {
    pub openai_api_key: String,
    pub pinecone_api_key: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("openai_api_key", &"[REDACTED]")
            .field("pinecone_api_key", &"[REDACTED]")
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.gitbuddy/config.toml).
    ///
    /// Environment variables override the file:
    /// - `OPENAI_API_KEY`
    /// - `PINECONE_API_KEY`
    /// - `GITBUDDY_MODEL`
    /// - `GITBUDDY_PINECONE_HOST`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`; empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = get("PINECONE_API_KEY") {
            self.pinecone_api_key = Some(key);
        }
        if let Some(model) = get("GITBUDDY_MODEL") {
            self.model = model;
        }
        if let Some(host) = get("GITBUDDY_PINECONE_HOST") {
            self.index.host = host;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".gitbuddy")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.budget.target_tokens > self.budget.max_tokens {
            return Err(ConfigError::ValidationError(
                "budget.target_tokens must not exceed budget.max_tokens".into(),
            ));
        }

        if self.shell.min_chars > self.shell.max_chars {
            return Err(ConfigError::ValidationError(
                "shell.min_chars must not exceed shell.max_chars".into(),
            ));
        }

        if self.rate_limit.requests_per_minute == 0 || self.rate_limit.burst == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.requests_per_minute and rate_limit.burst must be > 0".into(),
            ));
        }

        if self.memory.rag_window == 0 || self.memory.agent_window == 0 {
            return Err(ConfigError::ValidationError(
                "memory window sizes must be > 0".into(),
            ));
        }

        if self.sources.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "sources.concurrency must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Both API keys, or the first one missing.
    pub fn require_secrets(&self) -> Result<Secrets, ConfigError> {
        let present = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();

        let openai_api_key =
            present(&self.openai_api_key).ok_or(ConfigError::MissingSecret("OPENAI_API_KEY"))?;
        let pinecone_api_key = present(&self.pinecone_api_key)
            .ok_or(ConfigError::MissingSecret("PINECONE_API_KEY"))?;

        Ok(Secrets {
            openai_api_key,
            pinecone_api_key,
        })
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            pinecone_api_key: None,
            model: default_model(),
            embeddings_model: default_embeddings_model(),
            temperature: default_temperature(),
            api_url: default_api_url(),
            index: IndexConfig::default(),
            rate_limit: RateLimitConfig::default(),
            budget: BudgetConfig::default(),
            memory: MemoryConfig::default(),
            sources: SourcesConfig::default(),
            search: SearchConfig::default(),
            shell: ShellConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing secret {0}: set it in the environment or in ~/.gitbuddy/config.toml")]
    MissingSecret(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.index.top_k, 3);
        assert_eq!(config.budget.max_tokens, 60_000);
        assert_eq!(config.budget.target_tokens, 40_000);
        assert_eq!(config.memory.rag_window, 4);
        assert_eq!(config.memory.agent_window, 3);
        assert_eq!(config.rate_limit.requests_per_minute, 500);
        assert_eq!(config.shell.min_chars, 10);
        assert_eq!(config.shell.max_chars, 1000);
        assert_eq!(config.agent.max_iterations, 10);
        assert!(config.agent.retrieval_first);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.sources.dead_links, config.sources.dead_links);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn target_above_max_rejected() {
        let mut config = AppConfig::default();
        config.budget.target_tokens = 70_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_rate_rejected() {
        let mut config = AppConfig::default();
        config.rate_limit.requests_per_minute = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model, "gpt-3.5-turbo");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
model = "gpt-4o-mini"

[index]
host = "git-buddy-index-abc.svc.pinecone.io"

[agent]
retrieval_first = false
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.index.host, "git-buddy-index-abc.svc.pinecone.io");
        assert_eq!(config.index.top_k, 3);
        assert!(!config.agent.retrieval_first);
        assert_eq!(config.agent.max_iterations, 10);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model = [unclosed").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_file_is_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[shell]\nmin_chars = 50\nmax_chars = 20").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc-test"),
            ("GITBUDDY_MODEL", "gpt-4o"),
            ("GITBUDDY_PINECONE_HOST", "idx.pinecone.io"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.pinecone_api_key.as_deref(), Some("pc-test"));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.index.host, "idx.pinecone.io");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|_| Some("  ".into()));
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.model, "gpt-3.5-turbo");
    }

    #[test]
    fn require_secrets_reports_missing_key() {
        let mut config = AppConfig::default();
        let err = config.require_secrets().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("OPENAI_API_KEY")));

        config.openai_api_key = Some("sk-test".into());
        let err = config.require_secrets().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("PINECONE_API_KEY")));

        config.pinecone_api_key = Some("pc-test".into());
        let secrets = config.require_secrets().unwrap();
        assert_eq!(secrets.openai_api_key, "sk-test");
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig {
            openai_api_key: Some("sk-very-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-3.5-turbo"));
        assert!(toml_str.contains("enterprise-server@3.6"));
    }
}
