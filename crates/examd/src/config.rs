//! Configuration management for examd.
//!
//! Loads settings from /etc/examd/config.toml or uses defaults. Every field
//! has a default, so partial files are valid.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/examd/config.toml";

/// Default config file path for fallback
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/examd/config.toml";

/// System data directory for the cache database
pub const SYSTEM_DATA_DIR: &str = "/var/lib/examd";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Subject used when a request omits `subject`
    #[serde(default = "default_subject")]
    pub default_subject: String,

    /// Use the first X-Forwarded-For entry as the client identity.
    /// Only enable behind a proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_subject() -> String {
    "математика".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            default_subject: default_subject(),
            trust_forwarded_for: false,
        }
    }
}

/// Request budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Service-wide budget per client
    #[serde(default = "default_default_requests")]
    pub default_requests: u32,

    #[serde(default = "default_window_secs")]
    pub default_window_secs: u64,

    /// Stricter budget for the generation endpoint
    #[serde(default = "default_generation_requests")]
    pub generation_requests: u32,

    #[serde(default = "default_window_secs")]
    pub generation_window_secs: u64,

    /// How often expired windows are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_default_requests() -> u32 {
    10
}

fn default_generation_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_requests: default_default_requests(),
            default_window_secs: default_window_secs(),
            generation_requests: default_generation_requests(),
            generation_window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl LimitsConfig {
    pub fn default_window(&self) -> Duration {
        Duration::from_secs(self.default_window_secs)
    }

    pub fn generation_window(&self) -> Duration {
        Duration::from_secs(self.generation_window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Task cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// System path when /var/lib/examd exists, else the user data dir
fn default_cache_path() -> PathBuf {
    let system_dir = Path::new(SYSTEM_DATA_DIR);
    if system_dir.exists() {
        return system_dir.join("cache.db");
    }

    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("examd")
        .join("cache.db")
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl CacheConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Task source (HTML scraper) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_enabled")]
    pub enabled: bool,

    /// Page used for subjects without an entry in `subject_urls`
    #[serde(default = "default_provider_url")]
    pub url: String,

    /// Page per subject, keys matched case-insensitively
    #[serde(default)]
    pub subject_urls: BTreeMap<String, String>,

    /// CSS selector for task elements
    #[serde(default = "default_provider_selector")]
    pub selector: String,

    #[serde(default = "default_provider_max_items")]
    pub max_items: usize,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_provider_enabled() -> bool {
    true
}

fn default_provider_url() -> String {
    "https://fipi.ru/ege".to_string()
}

fn default_provider_selector() -> String {
    ".task-content".to_string()
}

fn default_provider_max_items() -> usize {
    10
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "MyEgeBot/1.0 (contact: admin@example.com)".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_provider_enabled(),
            url: default_provider_url(),
            subject_urls: BTreeMap::new(),
            selector: default_provider_selector(),
            max_items: default_provider_max_items(),
            timeout_secs: default_provider_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ProviderConfig {
    /// Page to scrape for `subject`
    pub fn url_for(&self, subject: &str) -> &str {
        let subject = subject.trim().to_lowercase();
        self.subject_urls
            .iter()
            .find(|(key, _)| key.trim().to_lowercase() == subject)
            .map(|(_, url)| url.as_str())
            .unwrap_or(self.url.as_str())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Inference engine (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_url")]
    pub url: String,

    #[serde(default = "default_inference_model")]
    pub model: String,

    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,

    /// Context passed with every question
    #[serde(default = "default_inference_context")]
    pub context: String,
}

fn default_inference_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_inference_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_inference_timeout() -> u64 {
    20
}

fn default_inference_context() -> String {
    "Образовательный контекст".to_string()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: default_inference_url(),
            model: default_inference_model(),
            timeout_secs: default_inference_timeout(),
            context: default_inference_context(),
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Answer resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Subjects containing any of these are routed to the equation solver
    #[serde(default = "default_math_keywords")]
    pub math_keywords: Vec<String>,
}

fn default_math_keywords() -> Vec<String> {
    vec!["математика".to_string(), "math".to_string()]
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            math_keywords: default_math_keywords(),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl Config {
    /// Load config from the standard locations, or return defaults
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(DEFAULT_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            })
    }

    /// Load config from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject settings the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.limits.default_requests == 0 || self.limits.generation_requests == 0 {
            bail!("request budgets must be at least 1");
        }
        if self.limits.default_window_secs == 0 || self.limits.generation_window_secs == 0 {
            bail!("rate limit windows must be at least 1 second");
        }
        if self.limits.sweep_interval_secs == 0 {
            bail!("limits.sweep_interval_secs must be at least 1");
        }
        if self.provider.timeout_secs == 0 || self.inference.timeout_secs == 0 {
            bail!("external call timeouts must be at least 1 second");
        }
        if self
            .resolver
            .math_keywords
            .iter()
            .all(|k| k.trim().is_empty())
        {
            bail!("resolver.math_keywords must contain at least one keyword");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert_eq!(config.server.default_subject, "математика");
        assert_eq!(config.limits.default_requests, 10);
        assert_eq!(config.limits.generation_requests, 5);
        assert_eq!(config.limits.generation_window(), Duration::from_secs(60));
        assert_eq!(config.provider.selector, ".task-content");
        assert_eq!(config.inference.context, "Образовательный контекст");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
[limits]
generation_requests = 2

[inference]
model = "custom:1b"
timeout_secs = 3
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.limits.generation_requests, 2);
        assert_eq!(config.inference.model, "custom:1b");
        assert_eq!(config.inference.timeout(), Duration::from_secs(3));
        // Defaults for missing fields
        assert_eq!(config.limits.default_requests, 10);
        assert_eq!(config.server.bind, "0.0.0.0:5000");
    }

    #[test]
    fn test_subject_urls() {
        let toml_str = r#"
[provider]
url = "https://example.org/math"

[provider.subject_urls]
"История" = "https://example.org/history"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.url_for("история"), "https://example.org/history");
        assert_eq!(config.provider.url_for(" ИСТОРИЯ "), "https://example.org/history");
        assert_eq!(config.provider.url_for("математика"), "https://example.org/math");
        assert_eq!(Config::default().provider.url_for("история"), "https://fipi.ru/ege");
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nbind = \"127.0.0.1:8080\"\n[cache]\npath = \"/tmp/x.db\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.cache.path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        assert!(Config::load_from_path("/nonexistent/examd.toml").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_budgets() {
        let mut config = Config::default();
        config.limits.generation_requests = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.inference.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.resolver.math_keywords = vec![" ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.bind, config.server.bind);
        assert_eq!(parsed.resolver.math_keywords, config.resolver.math_keywords);
    }
}
