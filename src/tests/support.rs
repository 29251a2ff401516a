//! Deterministic stand-ins for the embedding oracle and place search.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::places::{LocationResult, PlaceSearch, PlaceSearchError};
use crate::search::SearchOrchestrator;
use crate::semantic::embeddings::{EmbeddingError, EmbeddingOracle, OracleLoader};

/// One dimension per known word plus a shared bucket for everything else.
const VOCABULARY: &[&str] = &[
    "quiet", "work", "place", "cozy", "coffee", "cafe", "bar", "lively", "library", "park",
    "new", "york", "dinner", "cheap", "friends",
];

pub const DIMENSIONS: usize = VOCABULARY.len() + 1;

/// Bag-of-words oracle over [`VOCABULARY`].
#[derive(Default)]
pub struct StubOracle {
    /// Texts that fail to embed, matched exactly
    pub fail_on: Vec<String>,
    pub calls: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
}

impl StubOracle {
    pub fn failing_on(texts: &[&str]) -> Self {
        Self {
            fail_on: texts.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIMENSIONS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let slot = VOCABULARY
                .iter()
                .position(|known| *known == word)
                .unwrap_or(VOCABULARY.len());
            v[slot] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingOracle for StubOracle {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());

        if self.fail_on.iter().any(|t| t == text) {
            return Err(EmbeddingError::EmbeddingFailed(format!("stub refused {text:?}")));
        }
        Ok(Self::vector(text))
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

pub struct StubLoader {
    pub oracle: Arc<StubOracle>,
    pub loads: AtomicUsize,
    /// Number of initial loads that fail
    pub fail_first: usize,
}

impl StubLoader {
    pub fn new(oracle: StubOracle) -> Arc<Self> {
        Arc::new(Self {
            oracle: Arc::new(oracle),
            loads: AtomicUsize::new(0),
            fail_first: 0,
        })
    }

    pub fn failing(times: usize) -> Arc<Self> {
        Arc::new(Self {
            oracle: Arc::new(StubOracle::default()),
            loads: AtomicUsize::new(0),
            fail_first: times,
        })
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OracleLoader for StubLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingOracle>, EmbeddingError> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(EmbeddingError::InitFailed("stub model unavailable".into()));
        }
        Ok(self.oracle.clone())
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// Recorded `PlaceSearch::search` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCall {
    pub query: String,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Scripted place search: exact query text to results, with a default.
#[derive(Default)]
pub struct StubPlaces {
    pub responses: HashMap<String, Vec<LocationResult>>,
    pub default_response: Vec<LocationResult>,
    pub fail_status: Option<u16>,
    /// Queries containing the marker sleep for the duration first
    pub delay: Option<(String, Duration)>,
    pub calls: Mutex<Vec<PlaceCall>>,
}

impl StubPlaces {
    pub fn with_default(results: Vec<LocationResult>) -> Self {
        Self {
            default_response: results,
            ..Default::default()
        }
    }

    pub fn respond(mut self, query: &str, results: Vec<LocationResult>) -> Self {
        self.responses.insert(query.to_string(), results);
        self
    }

    pub fn calls(&self) -> Vec<PlaceCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaceSearch for StubPlaces {
    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Vec<LocationResult>, PlaceSearchError> {
        self.calls.lock().unwrap().push(PlaceCall {
            query: query.to_string(),
            location: location.map(str::to_string),
            notes: notes.map(str::to_string),
        });

        if let Some((marker, delay)) = &self.delay {
            if query.contains(marker.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }

        if let Some(status) = self.fail_status {
            return Err(PlaceSearchError::Status(status));
        }

        Ok(self
            .responses
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone()))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub fn place(id: &str, name: &str) -> LocationResult {
    LocationResult {
        place_id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn orchestrator(
    loader: Arc<StubLoader>,
    places: Arc<StubPlaces>,
    config: &Config,
) -> SearchOrchestrator {
    SearchOrchestrator::new(loader, places, config)
}
