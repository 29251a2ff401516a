use std::time::Duration;

use crate::places::PlaceSearchError;
use crate::semantic::embeddings::EmbeddingError;

/// Pipeline stage a timeout was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    CandidateFetch,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Embedding => write!(f, "embedding"),
            Stage::CandidateFetch => write!(f, "candidate fetch"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("query is empty")]
    EmptyQuery,

    /// The only error that escapes the orchestrator.
    #[error("failed to load embedding model: {0}")]
    ModelLoad(#[source] EmbeddingError),

    #[error("candidate fetch failed: {0}")]
    CandidateFetch(#[from] PlaceSearchError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
}
