use homedir::my_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::semantic::sparse::{MAX_DIMENSIONS, SPARSITY_THRESHOLD};

const CONFIG_FILE: &str = "config.yaml";

/// Default embedding model (384-d)
const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

const DEFAULT_PLACES_ENDPOINT: &str = "http://localhost:3000/api/locations";
const DEFAULT_API_KEY_ENV: &str = "YELP_API_KEY";
const DEFAULT_PLACES_TIMEOUT_SECS: u64 = 10;

const DEFAULT_MAX_CANDIDATES: usize = 10;
const DEFAULT_TOP_K: usize = 5;
const DEFAULT_CACHE_CAPACITY: usize = 50;
const DEFAULT_CONTEXT_TTL_SECS: u64 = 300;
const DEFAULT_NOTE_PREFIX_CHARS: usize = 100;
const DEFAULT_SESSION_LOG_CAPACITY: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("config io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config is malformed: {0}")]
    Malformed(#[from] serde_yml::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Configuration for the embedding oracle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Timeout for a single embed call in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_call_timeout_secs() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacesProvider {
    /// GET against a `/api/locations`-style endpoint
    #[default]
    Http,
    /// Business search API called directly
    Yelp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacesConfig {
    #[serde(default)]
    pub provider: PlacesProvider,

    #[serde(default = "default_places_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the business search API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_places_timeout_secs")]
    pub timeout_secs: u64,

    /// Used when neither the notes nor the query name a city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_location: Option<String>,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            provider: PlacesProvider::default(),
            endpoint: default_places_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_secs: DEFAULT_PLACES_TIMEOUT_SECS,
            user_location: None,
        }
    }
}

fn default_places_endpoint() -> String {
    DEFAULT_PLACES_ENDPOINT.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_places_timeout_secs() -> u64 {
    DEFAULT_PLACES_TIMEOUT_SECS
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMode {
    #[default]
    Dense,
    Sparse,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Candidates kept from each place search
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Lifetime of context-aware cache entries
    #[serde(default = "default_context_ttl_secs")]
    pub context_ttl_secs: u64,

    /// Characters of note text folded into the context-aware cache key
    #[serde(default = "default_note_prefix_chars")]
    pub note_prefix_chars: usize,

    #[serde(default)]
    pub similarity: SimilarityMode,

    #[serde(default = "default_sparsity_threshold")]
    pub sparsity_threshold: f32,

    #[serde(default = "default_max_sparse_dimensions")]
    pub max_sparse_dimensions: usize,

    #[serde(default = "default_session_log_capacity")]
    pub session_log_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            top_k: DEFAULT_TOP_K,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            context_ttl_secs: DEFAULT_CONTEXT_TTL_SECS,
            note_prefix_chars: DEFAULT_NOTE_PREFIX_CHARS,
            similarity: SimilarityMode::default(),
            sparsity_threshold: SPARSITY_THRESHOLD,
            max_sparse_dimensions: MAX_DIMENSIONS,
            session_log_capacity: DEFAULT_SESSION_LOG_CAPACITY,
        }
    }
}

fn default_max_candidates() -> usize {
    DEFAULT_MAX_CANDIDATES
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_context_ttl_secs() -> u64 {
    DEFAULT_CONTEXT_TTL_SECS
}

fn default_note_prefix_chars() -> usize {
    DEFAULT_NOTE_PREFIX_CHARS
}

fn default_sparsity_threshold() -> f32 {
    SPARSITY_THRESHOLD
}

fn default_max_sparse_dimensions() -> usize {
    MAX_DIMENSIONS
}

fn default_session_log_capacity() -> usize {
    DEFAULT_SESSION_LOG_CAPACITY
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub places: PlacesConfig,
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    /// Base directory: `$VIBE_HOME`, else `~/.vibe`.
    pub fn default_base_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var("VIBE_HOME") {
            return Ok(PathBuf::from(path));
        }

        let home = my_home()
            .map_err(|_| ConfigError::NoHome)?
            .ok_or(ConfigError::NoHome)?;
        Ok(home.join(".vibe"))
    }

    /// Load `config.yaml` from `base_path`, writing defaults when it is
    /// missing and re-saving when the normalized form differs.
    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: base_path.join(CONFIG_FILE),
            source,
        };

        std::fs::create_dir_all(base_path).map_err(io_err)?;

        let path = base_path.join(CONFIG_FILE);
        // create new if does not exist
        if !path.exists() {
            std::fs::write(&path, serde_yml::to_string(&Self::default())?).map_err(io_err)?;
        }

        let config_str = std::fs::read_to_string(&path).map_err(io_err)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_path_buf();
        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.base_path.join(CONFIG_FILE);
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(&path, config_str).map_err(|source| ConfigError::Io { path, source })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let emb = &self.embedding;
        if emb.model.trim().is_empty() {
            return invalid("embedding.model must not be empty".into());
        }
        if emb.download_timeout_secs == 0 {
            return invalid("embedding.download_timeout_secs must be greater than 0".into());
        }
        if emb.call_timeout_secs == 0 {
            return invalid("embedding.call_timeout_secs must be greater than 0".into());
        }

        let places = &self.places;
        if places.timeout_secs == 0 {
            return invalid("places.timeout_secs must be greater than 0".into());
        }
        if places.provider == PlacesProvider::Http && places.endpoint.trim().is_empty() {
            return invalid("places.endpoint must be set for the http provider".into());
        }

        let search = &self.search;
        if search.max_candidates == 0 {
            return invalid("search.max_candidates must be greater than 0".into());
        }
        if search.top_k == 0 {
            return invalid("search.top_k must be greater than 0".into());
        }
        if search.cache_capacity == 0 {
            return invalid("search.cache_capacity must be greater than 0".into());
        }
        if search.context_ttl_secs == 0 {
            return invalid("search.context_ttl_secs must be greater than 0".into());
        }
        if search.sparsity_threshold.is_nan() || search.sparsity_threshold < 0.0 {
            return invalid(format!(
                "search.sparsity_threshold must be non-negative, got {}",
                search.sparsity_threshold
            ));
        }
        if search.max_sparse_dimensions == 0 {
            return invalid("search.max_sparse_dimensions must be greater than 0".into());
        }

        Ok(())
    }
}

impl EmbeddingConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl PlacesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SearchConfig {
    pub fn context_ttl(&self) -> Duration {
        Duration::from_secs(self.context_ttl_secs)
    }
}
