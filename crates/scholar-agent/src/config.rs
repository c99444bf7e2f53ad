//! Configuration for the scholar pipeline server

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScholarConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage layout configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Pipeline behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Descriptive model/provider info reported by `/system/info`
    #[serde(default)]
    pub system: SystemConfig,
}

impl ScholarConfig {
    /// Load configuration from an optional TOML file, then apply `SCHOLAR_*`
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                toml::from_str::<ScholarConfig>(&content)?
            }
            None => ScholarConfig::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SCHOLAR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SCHOLAR_PORT") {
            self.server.port = parse_env("SCHOLAR_PORT", &port)?;
        }
        if let Some(origins) = lookup("SCHOLAR_CORS_ORIGINS") {
            self.server.cors_origins = origins;
        }
        if let Some(dir) = lookup("SCHOLAR_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("SCHOLAR_TEMPLATES_DIR") {
            self.storage.templates_dir = PathBuf::from(dir);
        }
        if let Some(size) = lookup("SCHOLAR_MAX_CHUNK_CHARS") {
            self.chunking.chunk_size = parse_env("SCHOLAR_MAX_CHUNK_CHARS", &size)?;
        }
        if let Some(overlap) = lookup("SCHOLAR_CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_env("SCHOLAR_CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(secs) = lookup("SCHOLAR_KEEP_ALIVE_SECS") {
            self.pipeline.keep_alive_secs = parse_env("SCHOLAR_KEEP_ALIVE_SECS", &secs)?;
        }
        if let Some(policy) = lookup("SCHOLAR_UNREADABLE_INPUT") {
            self.pipeline.unreadable_input = match policy.trim().to_lowercase().as_str() {
                "placeholder" => UnreadableInputPolicy::Placeholder,
                "fail" => UnreadableInputPolicy::Fail,
                other => {
                    return Err(Error::Config(format!(
                        "SCHOLAR_UNREADABLE_INPUT must be 'placeholder' or 'fail', got '{}'",
                        other
                    )))
                }
            };
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be greater than 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.pipeline.keep_alive_secs == 0 {
            return Err(Error::Config("pipeline.keep_alive_secs must be greater than 0".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: '{}'", key, value)))
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Prefix for all API routes
    pub api_prefix: String,
    /// Allowed CORS origins: `*` or a comma-separated list
    pub cors_origins: String,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_prefix: "/api".to_string(),
            cors_origins: "*".to_string(),
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl ServerConfig {
    /// Parsed CORS origins; `None` means any origin
    pub fn cors_origin_list(&self) -> Option<Vec<String>> {
        if self.cors_origins.trim() == "*" {
            return None;
        }
        Some(
            self.cors_origins
                .split(',')
                .map(|o| o.trim())
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
        )
    }
}

/// Storage layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for raw uploads, processed artifacts and the paper catalogue
    pub data_dir: PathBuf,
    /// Directory holding summary templates (`*.md`)
    pub templates_dir: PathBuf,
    /// Template used when a requested one does not exist
    pub default_template: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            templates_dir: PathBuf::from("templates"),
            default_template: "tinghua.md".to_string(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 900,
            chunk_overlap: 120,
        }
    }
}

/// What to do when no text can be extracted from an upload
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnreadableInputPolicy {
    /// Continue with a fixed placeholder text
    #[default]
    Placeholder,
    /// Fail the task at the parsing stage
    Fail,
}

/// Pipeline behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Idle interval after which subscribers get a keep-alive
    pub keep_alive_secs: u64,
    /// Pause after each stage so clients can observe transitions
    pub stage_pause_ms: u64,
    /// Behaviour for scanned or protected PDFs
    pub unreadable_input: UnreadableInputPolicy,
    /// Language used when an upload does not specify one
    pub default_target_language: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: 15,
            stage_pause_ms: 200,
            unreadable_input: UnreadableInputPolicy::Placeholder,
            default_target_language: "Chinese".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn stage_pause(&self) -> Duration {
        Duration::from_millis(self.stage_pause_ms)
    }
}

/// Descriptive info about the generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub app_name: String,
    pub model_provider: String,
    pub llm_model_name: String,
    pub embedding_model_name: String,
    pub pipeline_mode: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            app_name: "Personal Scholar Agent API".to_string(),
            model_provider: "LocalRuleEngine".to_string(),
            llm_model_name: "DemoPipeline-v1".to_string(),
            embedding_model_name: "TokenOverlapRetriever-v1".to_string(),
            pipeline_mode: "DeterministicDraft".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScholarConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 900);
        assert_eq!(config.pipeline.keep_alive(), Duration::from_secs(15));
        assert_eq!(config.server.cors_origin_list(), None);
    }

    #[test]
    fn test_partial_toml() {
        let config: ScholarConfig = toml::from_str(
            r#"
            [chunking]
            chunk_size = 500
            chunk_overlap = 50

            [pipeline]
            keep_alive_secs = 5
            stage_pause_ms = 0
            unreadable_input = "fail"
            default_target_language = "English"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.pipeline.unreadable_input, UnreadableInputPolicy::Fail);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_sections_may_set_single_keys() {
        let config: ScholarConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [pipeline]
            unreadable_input = "fail"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.pipeline.unreadable_input, UnreadableInputPolicy::Fail);
        assert_eq!(config.pipeline.keep_alive_secs, 15);
        assert_eq!(config.pipeline.default_target_language, "Chinese");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCHOLAR_PORT", "9100"),
            ("SCHOLAR_CORS_ORIGINS", "http://a.test, http://b.test"),
            ("SCHOLAR_UNREADABLE_INPUT", "FAIL"),
        ]
        .into_iter()
        .collect();

        let mut config = ScholarConfig::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.server.cors_origin_list(),
            Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
        assert_eq!(config.pipeline.unreadable_input, UnreadableInputPolicy::Fail);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = ScholarConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "SCHOLAR_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = ScholarConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());
    }
}
