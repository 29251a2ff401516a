//! Search pipeline: enhance, embed, fetch candidates, rank, fall back to
//! the literal query, re-rank against the literal query, cache.
//!
//! Only a failure to load the embedding model escapes [`SearchOrchestrator`];
//! every other failure is logged and turned into an empty result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;

use crate::config::Config;
use crate::places::{LocationResult, PlaceSearch};
use crate::query::{enhance_query_with_keywords, extract_location_context, KeywordIndex};
use crate::search::cache::{CacheKey, ResultCache};
use crate::search::errors::{SearchError, Stage};
use crate::search::session::{SearchSession, SessionLog};
use crate::semantic::embeddings::{EmbeddingOracle, OracleLoader};
use crate::semantic::oracle::{LazyOracle, OracleStatus};
use crate::semantic::ranker::SimilarityRanker;

/// Result of one orchestrator invocation.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Monotonic id of this invocation
    pub sequence: u64,
    pub contextual_query: String,
    /// Ranked best-first, at most `top_k`
    pub results: Vec<LocationResult>,
    pub from_cache: bool,
    /// A newer invocation started before this one finished
    pub superseded: bool,
}

impl SearchOutcome {
    pub fn best(&self) -> Option<&LocationResult> {
        self.results.first()
    }
}

/// Candidates fetched in one attempt and their ranking.
#[derive(Default)]
struct Attempt {
    candidates: Vec<LocationResult>,
    ranked: Vec<LocationResult>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SearchOrchestrator {
    oracle: LazyOracle,
    places: Arc<dyn PlaceSearch>,
    ranker: SimilarityRanker,
    cache: Mutex<ResultCache>,
    sessions: Mutex<SessionLog>,
    sequence: AtomicU64,
    max_candidates: usize,
    note_prefix_chars: usize,
    place_timeout: Duration,
    user_location: Option<String>,
}

impl SearchOrchestrator {
    pub fn new(
        loader: Arc<dyn OracleLoader>,
        places: Arc<dyn PlaceSearch>,
        config: &Config,
    ) -> Self {
        let search = &config.search;
        Self {
            oracle: LazyOracle::new(loader),
            places,
            ranker: SimilarityRanker::from_config(search, &config.embedding),
            cache: Mutex::new(ResultCache::new(search.cache_capacity, search.context_ttl())),
            sessions: Mutex::new(SessionLog::new(search.session_log_capacity)),
            sequence: AtomicU64::new(0),
            max_candidates: search.max_candidates,
            note_prefix_chars: search.note_prefix_chars,
            place_timeout: config.places.timeout(),
            user_location: config.places.user_location.clone(),
        }
    }

    /// Load the embedding model if it is not loaded yet. Concurrent callers
    /// share one load; a failure can be retried.
    pub async fn initialize_model(&self) -> Result<(), SearchError> {
        self.oracle.get().await.map(|_| ()).map_err(SearchError::ModelLoad)
    }

    pub fn oracle_status(&self) -> OracleStatus {
        self.oracle.status()
    }

    /// Basic search keyed by the normalized query alone.
    pub async fn search_locations(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        self.run(query, None, CacheKey::for_query(query)).await
    }

    /// Context-aware search; the cache key folds in a note prefix and
    /// expires.
    pub async fn search_with_context(
        &self,
        query: &str,
        notes: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let key = CacheKey::for_context(query, notes, self.note_prefix_chars);
        self.run(query, Some(notes), key).await
    }

    /// Top-ranked place, or `None` when nothing matched or a newer search
    /// started meanwhile.
    pub async fn find_best_match(
        &self,
        query: &str,
        notes: Option<&str>,
    ) -> Result<Option<LocationResult>, SearchError> {
        let outcome = match notes {
            Some(notes) => self.search_with_context(query, notes).await?,
            None => self.search_locations(query).await?,
        };

        if outcome.superseded {
            log::debug!("sequence={} outcome=superseded", outcome.sequence);
            return Ok(None);
        }
        Ok(outcome.best().cloned())
    }

    pub fn sessions(&self) -> Vec<SearchSession> {
        lock(&self.sessions).snapshot()
    }

    pub fn cache_len(&self) -> usize {
        lock(&self.cache).len()
    }

    async fn run(
        &self,
        query: &str,
        notes: Option<&str>,
        key: CacheKey,
    ) -> Result<SearchOutcome, SearchError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        if query.trim().is_empty() {
            log::debug!("sequence={sequence} outcome=empty err={}", SearchError::EmptyQuery);
            return Ok(SearchOutcome {
                sequence,
                ..Default::default()
            });
        }

        let cached = lock(&self.cache).get(&key);
        let contextual_query = enhance_query_with_keywords(query, notes.unwrap_or_default());

        if let Some(results) = cached {
            log::info!(
                "sequence={sequence} cache={} outcome=hit count={}",
                key.fingerprint(),
                results.len()
            );
            return Ok(self.finish(sequence, contextual_query, results, true));
        }

        let oracle = self.oracle.get().await.map_err(SearchError::ModelLoad)?;

        let mut embeddings = Vec::new();
        let results = self
            .rank_pipeline(oracle.as_ref(), query, &contextual_query, notes, &mut embeddings)
            .await;

        log::info!(
            "sequence={sequence} query={query:?} contextual={contextual_query:?} outcome=done count={}",
            results.len()
        );

        if !results.is_empty() {
            lock(&self.cache).insert(key, results.clone());
        }

        let encoder = self.ranker.encoder();
        lock(&self.sessions).push(SearchSession {
            timestamp: Utc::now(),
            query: query.to_string(),
            embeddings: embeddings.iter().map(|e| encoder.encode(e)).collect(),
            clusters: KeywordIndex::global()
                .find_keywords(query)
                .into_iter()
                .map(str::to_string)
                .collect(),
            results: results.clone(),
        });

        Ok(self.finish(sequence, contextual_query, results, false))
    }

    fn finish(
        &self,
        sequence: u64,
        contextual_query: String,
        results: Vec<LocationResult>,
        from_cache: bool,
    ) -> SearchOutcome {
        let superseded = self.sequence.load(Ordering::SeqCst) != sequence;
        SearchOutcome {
            sequence,
            contextual_query,
            results,
            from_cache,
            superseded,
        }
    }

    /// Steps 4 to 8: retrieve with the contextual query, fall back to the
    /// literal query, then re-rank against the literal query.
    async fn rank_pipeline(
        &self,
        oracle: &dyn EmbeddingOracle,
        query: &str,
        contextual_query: &str,
        notes: Option<&str>,
        embeddings: &mut Vec<Vec<f32>>,
    ) -> Vec<LocationResult> {
        let mut attempt = self
            .attempt(oracle, contextual_query, notes, embeddings)
            .await
            .unwrap_or_else(|err| {
                log::warn!("stage=retrieve query={contextual_query:?} err={err}");
                Attempt::default()
            });

        if attempt.ranked.is_empty() && contextual_query != query {
            log::info!("stage=fallback query={query:?}");
            attempt = self
                .attempt(oracle, query, notes, embeddings)
                .await
                .unwrap_or_else(|err| {
                    log::warn!("stage=fallback query={query:?} err={err}");
                    Attempt::default()
                });
        }

        if attempt.ranked.is_empty() {
            return Vec::new();
        }

        match self.rerank(oracle, query, &attempt.candidates, embeddings).await {
            Ok(reranked) if !reranked.is_empty() => reranked,
            Ok(_) => attempt.ranked,
            Err(err) => {
                log::warn!("stage=rerank query={query:?} err={err}, keeping retrieval order");
                attempt.ranked
            }
        }
    }

    async fn attempt(
        &self,
        oracle: &dyn EmbeddingOracle,
        text: &str,
        notes: Option<&str>,
        embeddings: &mut Vec<Vec<f32>>,
    ) -> Result<Attempt, SearchError> {
        let query_embedding = self.ranker.embed(oracle, text).await?;
        embeddings.push(query_embedding.clone());

        let candidates = self.fetch_candidates(text, notes).await?;
        let ranked = self
            .ranker
            .rank_by_similarity(oracle, &query_embedding, &candidates)
            .await?;

        Ok(Attempt { candidates, ranked })
    }

    async fn rerank(
        &self,
        oracle: &dyn EmbeddingOracle,
        query: &str,
        candidates: &[LocationResult],
        embeddings: &mut Vec<Vec<f32>>,
    ) -> Result<Vec<LocationResult>, SearchError> {
        let query_embedding = self.ranker.embed(oracle, query).await?;
        embeddings.push(query_embedding.clone());

        self.ranker
            .rank_by_similarity(oracle, &query_embedding, candidates)
            .await
    }

    async fn fetch_candidates(
        &self,
        text: &str,
        notes: Option<&str>,
    ) -> Result<Vec<LocationResult>, SearchError> {
        let note_location = notes.map(extract_location_context).unwrap_or_default();
        let location = if note_location.is_empty() {
            self.user_location.as_deref()
        } else {
            Some(note_location.as_str())
        };

        let mut candidates = tokio::time::timeout(
            self.place_timeout,
            self.places.search(text, location, notes),
        )
        .await
        .map_err(|_| SearchError::Timeout {
            stage: Stage::CandidateFetch,
            after: self.place_timeout,
        })??;

        log::debug!(
            "places={} query={text:?} location={location:?} count={}",
            self.places.name(),
            candidates.len()
        );

        candidates.truncate(self.max_candidates);
        Ok(candidates)
    }
}
