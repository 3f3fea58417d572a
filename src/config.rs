//! Layered configuration.
//!
//! Loaded with `figment`, lowest to highest priority:
//! built-in defaults, `<config_dir>/dialectica/config.toml`, an explicit
//! file, then `DIALECTICA_`-prefixed environment variables with `__`
//! separating nested keys (e.g. `DIALECTICA_LLM__MODEL`).

use crate::model::FilterSet;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Language-service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Inline key; takes precedence over the environment
    pub api_key: Option<String>,
    /// Environment variable holding the key
    pub api_key_env: String,
    /// Consulted when `api_key_env` is unset
    pub fallback_api_key_env: Option<String>,
    pub model: String,
    pub base_url: String,
    /// HTTP client timeout. The pipeline itself imposes none.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            fallback_api_key_env: Some("API_KEY".to_string()),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 300,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key: inline, then `api_key_env`, then the fallback variable.
    /// Blank values count as unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        let non_blank = |s: String| {
            let trimmed = s.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        };
        self.api_key
            .clone()
            .and_then(non_blank)
            .or_else(|| std::env::var(&self.api_key_env).ok().and_then(non_blank))
            .or_else(|| {
                self.fallback_api_key_env
                    .as_ref()
                    .and_then(|name| std::env::var(name).ok())
                    .and_then(non_blank)
            })
    }
}

/// Token pricing used for usage estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// USD per million input tokens
    pub input_per_million: f64,
    /// USD per million output tokens
    pub output_per_million: f64,
    /// Characters per estimated token
    pub chars_per_token: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            input_per_million: 0.35,
            output_per_million: 0.70,
            chars_per_token: 3.5,
        }
    }
}

/// Pipeline bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Retrieval attempts, counting the first
    pub max_search_attempts: usize,
    /// Corpus size after deduplication
    pub max_corpus_size: usize,
    /// Minimum score (1-5) for a paper to be marked relevant
    pub relevance_threshold: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_search_attempts: 3,
            max_corpus_size: 100,
            relevance_threshold: 3,
        }
    }
}

/// Bibliographic source endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub openalex_base_url: String,
    pub semantic_scholar_base_url: String,
    /// Results requested from each source
    pub per_source_limit: usize,
    /// Contact address for the OpenAlex polite pool
    pub mailto: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            openalex_base_url: "https://api.openalex.org".to_string(),
            semantic_scholar_base_url: "https://api.semanticscholar.org".to_string(),
            per_source_limit: 50,
            mailto: None,
            timeout_secs: 60,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialecticaConfig {
    pub llm: LlmConfig,
    pub pricing: PricingConfig,
    pub pipeline: PipelineConfig,
    pub sources: SourcesConfig,
    /// Filters a new search starts from
    pub filters: FilterSet,
}

impl DialecticaConfig {
    /// Copy with the inline API key masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.llm.api_key.is_some() {
            copy.llm.api_key = Some("***".to_string());
        }
        copy
    }
}

/// Default user config path (`<config_dir>/dialectica/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dialectica").join("config.toml"))
}

fn layered(files: &[PathBuf], env_prefix: Option<&str>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(DialecticaConfig::default()));
    for file in files {
        figment = figment.merge(Toml::file(file));
    }
    if let Some(prefix) = env_prefix {
        figment = figment.merge(Env::prefixed(prefix).split("__"));
    }
    figment
}

/// Load configuration from all layers.
///
/// `explicit` must exist when given; the user-level file is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<DialecticaConfig, ConfigError> {
    let mut files = Vec::new();
    if let Some(user) = default_config_path() {
        if user.exists() {
            files.push(user);
        }
    }
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        files.push(path.to_path_buf());
    }
    layered(&files, Some("DIALECTICA_"))
        .extract()
        .map_err(|e| ConfigError::Invalid(Box::new(e)))
}

/// Load configuration from the given files only, ignoring the environment.
pub fn load_config_files(files: &[PathBuf]) -> Result<DialecticaConfig, ConfigError> {
    layered(files, None)
        .extract()
        .map_err(|e| ConfigError::Invalid(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_pipeline_constants() {
        let config = DialecticaConfig::default();
        assert_eq!(config.pipeline.max_search_attempts, 3);
        assert_eq!(config.pipeline.max_corpus_size, 100);
        assert_eq!(config.pricing.chars_per_token, 3.5);
        assert_eq!(config.llm.model, "gemini-2.5-flash");
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[pipeline]\nmax_search_attempts = 5\n\n[llm]\nmodel = \"gemini-pro\"\n\n[filters]\nstart_year = 1999"
        )
        .unwrap();

        let config = load_config_files(&[file.path().to_path_buf()]).unwrap();
        assert_eq!(config.pipeline.max_search_attempts, 5);
        assert_eq!(config.pipeline.max_corpus_size, 100);
        assert_eq!(config.llm.model, "gemini-pro");
        assert_eq!(config.filters.start_year, 1999);
    }

    #[test]
    fn environment_overrides_filters() {
        std::env::set_var("DIALECTICA_ENVTEST_FILTERS__START_YEAR", "1990");
        std::env::set_var("DIALECTICA_ENVTEST_FILTERS__MIN_CITATIONS", "25");
        std::env::set_var("DIALECTICA_ENVTEST_FILTERS__SOURCES__OPEN_ALEX", "false");

        let config: DialecticaConfig = layered(&[], Some("DIALECTICA_ENVTEST_")).extract().unwrap();
        assert_eq!(config.filters.start_year, 1990);
        assert_eq!(config.filters.min_citations, 25);
        assert!(!config.filters.sources.open_alex);
        assert!(config.filters.sources.semantic_scholar);
        assert!(!config.filters.open_access_only);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/dialectica.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn inline_key_wins_and_blank_is_unset() {
        let mut llm = LlmConfig {
            api_key: Some("inline".into()),
            api_key_env: "DIALECTICA_TEST_UNSET_KEY_VAR".into(),
            fallback_api_key_env: None,
            ..LlmConfig::default()
        };
        assert_eq!(llm.resolve_api_key().as_deref(), Some("inline"));
        llm.api_key = Some("   ".into());
        assert_eq!(llm.resolve_api_key(), None);
    }

    #[test]
    fn redacted_masks_key() {
        let mut config = DialecticaConfig::default();
        config.llm.api_key = Some("secret".into());
        assert_eq!(config.redacted().llm.api_key.as_deref(), Some("***"));
    }
}
