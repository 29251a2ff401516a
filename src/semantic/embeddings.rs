//! Embedding oracle interface and the fastembed-backed implementation.
//!
//! The rest of the pipeline only sees [`EmbeddingOracle::embed`]; how the
//! vector is produced stays behind the trait:
//! - `EmbeddingModel` wraps fastembed's blocking `TextEmbedding`
//! - `FastembedOracle` moves each call onto the blocking pool
//! - `FastembedLoader` downloads/loads the model with a timeout

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "local-embeddings")]
use fastembed::{InitOptions, TextEmbedding};
#[cfg(feature = "local-embeddings")]
use std::sync::Mutex;

/// Default download timeout for model files (5 minutes)
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Error type for embedding operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),
}

/// Text to dense vector.
///
/// Output is a fixed-dimension, mean-pooled vector and is not guaranteed to
/// be normalized.
#[async_trait]
pub trait EmbeddingOracle: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimensions(&self) -> usize;
}

/// Produces a ready [`EmbeddingOracle`]. Called at most once per successful
/// initialization.
#[async_trait]
pub trait OracleLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EmbeddingOracle>, EmbeddingError>;

    /// Name of the model being loaded, for logging
    fn model_name(&self) -> &str;
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
#[cfg(feature = "local-embeddings")]
pub struct EmbeddingModel {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

#[cfg(feature = "local-embeddings")]
impl EmbeddingModel {
    /// Create a new embedding model with the given name.
    ///
    /// The model will be downloaded on first use if not cached.
    /// Models are cached in the `models/` subdirectory of `cache_dir`.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        let model_enum = parse_model_name(model_name)?;

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let mut model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        // Get model dimensions by embedding a test string
        let dimensions = Self::probe_dimensions(&mut model)?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn name(&self) -> &str {
        &self.model_name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Generate an embedding for a single text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
        let test_embeddings = model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::InitFailed(format!("Failed to probe dimensions: {}", e)))?;

        test_embeddings
            .first()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::InitFailed("Model returned no embedding".to_string()))
    }
}

/// Parse model name string to fastembed enum.
#[cfg(feature = "local-embeddings")]
fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l6-v2-q" | "allminiml6v2q" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q),
        "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-small-en-v1.5-q" | "bgesmallenv15q" => {
            Ok(fastembed::EmbeddingModel::BGESmallENV15Q)
        }
        _ => Err(EmbeddingError::InvalidModel(format!(
            "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5 (add -q suffix for quantized)",
            name
        ))),
    }
}

/// Async adapter that runs the blocking fastembed call off the runtime.
#[cfg(feature = "local-embeddings")]
pub struct FastembedOracle {
    model: Arc<EmbeddingModel>,
}

#[cfg(feature = "local-embeddings")]
impl FastembedOracle {
    pub fn new(model: EmbeddingModel) -> Self {
        Self {
            model: Arc::new(model),
        }
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingOracle for FastembedOracle {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let model = self.model.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || model.embed(&text))
            .await
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("embedding task failed: {e}")))?
    }

    fn dimensions(&self) -> usize {
        self.model.dimensions()
    }
}

/// Loads a fastembed model into `cache_dir/models`.
pub struct FastembedLoader {
    model_name: String,
    cache_dir: PathBuf,
    download_timeout: Duration,
}

impl FastembedLoader {
    pub fn new(model_name: &str, cache_dir: PathBuf, download_timeout: Option<Duration>) -> Self {
        Self {
            model_name: model_name.to_string(),
            cache_dir,
            download_timeout: download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT),
        }
    }
}

#[async_trait]
impl OracleLoader for FastembedLoader {
    #[cfg(feature = "local-embeddings")]
    async fn load(&self) -> Result<Arc<dyn EmbeddingOracle>, EmbeddingError> {
        let model_name = self.model_name.clone();
        let cache_dir = self.cache_dir.clone();

        let task = tokio::task::spawn_blocking(move || EmbeddingModel::new(&model_name, cache_dir));

        let model = tokio::time::timeout(self.download_timeout, task)
            .await
            .map_err(|_| {
                EmbeddingError::InitFailed(format!(
                    "Model download timed out after {} seconds",
                    self.download_timeout.as_secs()
                ))
            })?
            .map_err(|e| EmbeddingError::InitFailed(format!("model loading task failed: {e}")))??;

        log::info!(
            "model={} dimensions={} outcome=loaded",
            model.name(),
            model.dimensions()
        );

        Ok(Arc::new(FastembedOracle::new(model)))
    }

    #[cfg(not(feature = "local-embeddings"))]
    async fn load(&self) -> Result<Arc<dyn EmbeddingOracle>, EmbeddingError> {
        let _ = (&self.cache_dir, self.download_timeout);
        Err(EmbeddingError::InitFailed(
            "built without the local-embeddings feature".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
