use std::time::Duration;

use crate::config::{EmbeddingConfig, SearchConfig, SimilarityMode};
use crate::places::LocationResult;
use crate::search::errors::{SearchError, Stage};
use crate::semantic::embeddings::EmbeddingOracle;
use crate::semantic::preprocess::candidate_text;
use crate::semantic::similarity::{cosine_similarity, l2_normalize_in_place, sparse_cosine_similarity};
use crate::semantic::sparse::{SparseEmbedding, SparseEncoder};

/// Query embedding in the form the configured mode compares against.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryVector {
    Dense(Vec<f32>),
    Sparse(SparseEmbedding),
}

/// Scores candidates against a query embedding and keeps the best `top_k`.
#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    top_k: usize,
    mode: SimilarityMode,
    encoder: SparseEncoder,
    call_timeout: Duration,
}

impl SimilarityRanker {
    pub fn new(
        top_k: usize,
        mode: SimilarityMode,
        encoder: SparseEncoder,
        call_timeout: Duration,
    ) -> Self {
        Self {
            top_k,
            mode,
            encoder,
            call_timeout,
        }
    }

    pub fn from_config(search: &SearchConfig, embedding: &EmbeddingConfig) -> Self {
        Self::new(
            search.top_k,
            search.similarity,
            SparseEncoder::new(search.sparsity_threshold, search.max_sparse_dimensions),
            embedding.call_timeout(),
        )
    }

    pub fn encoder(&self) -> &SparseEncoder {
        &self.encoder
    }

    /// Embed `text` under the call timeout and L2-normalize the result.
    pub async fn embed(
        &self,
        oracle: &dyn EmbeddingOracle,
        text: &str,
    ) -> Result<Vec<f32>, SearchError> {
        let mut embedding = tokio::time::timeout(self.call_timeout, oracle.embed(text))
            .await
            .map_err(|_| SearchError::Timeout {
                stage: Stage::Embedding,
                after: self.call_timeout,
            })??;

        l2_normalize_in_place(&mut embedding);
        Ok(embedding)
    }

    /// Encode the query side once for a ranking pass.
    pub fn prepare_query(&self, query: &[f32]) -> QueryVector {
        match self.mode {
            SimilarityMode::Dense => QueryVector::Dense(query.to_vec()),
            SimilarityMode::Sparse => QueryVector::Sparse(self.encoder.encode(query)),
        }
    }

    /// Similarity between a prepared query and a normalized candidate
    /// embedding. A dimension mismatch scores 0.
    pub fn score(&self, query: &QueryVector, candidate: &[f32]) -> f32 {
        match query {
            QueryVector::Dense(query) => cosine_similarity(query, candidate),
            QueryVector::Sparse(query) => {
                sparse_cosine_similarity(query, &self.encoder.encode(candidate))
            }
        }
    }

    /// Embed every candidate, score it against `query_embedding` and return
    /// the best `top_k` with `similarity_score` set.
    ///
    /// Any candidate embedding failure fails the whole pass.
    pub async fn rank_by_similarity(
        &self,
        oracle: &dyn EmbeddingOracle,
        query_embedding: &[f32],
        candidates: &[LocationResult],
    ) -> Result<Vec<LocationResult>, SearchError> {
        let query = self.prepare_query(query_embedding);

        let mut scores = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let embedding = self.embed(oracle, &candidate_text(candidate)).await?;
            scores.push(self.score(&query, &embedding));
        }

        Ok(top_k_by_score(candidates, &scores, self.top_k))
    }
}

/// Stable descending sort by score, truncated to `top_k`. Ties keep
/// candidate order.
pub fn top_k_by_score(
    candidates: &[LocationResult],
    scores: &[f32],
    top_k: usize,
) -> Vec<LocationResult> {
    let mut scored: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    scored.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    scored.truncate(top_k);

    scored
        .into_iter()
        .filter_map(|(idx, score)| {
            candidates.get(idx).map(|place| LocationResult {
                similarity_score: Some(score),
                ..place.clone()
            })
        })
        .collect()
}
