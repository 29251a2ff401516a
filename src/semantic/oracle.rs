//! Lazily initialized, process-wide embedding oracle handle.
//!
//! The first caller starts a load on a background task; concurrent callers
//! join the same in-flight load through a watch channel instead of
//! starting another. A failed load leaves the state `Failed` and the next
//! caller starts over.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::semantic::embeddings::{EmbeddingError, EmbeddingOracle, OracleLoader};

type LoadOutcome = Option<Result<Arc<dyn EmbeddingOracle>, EmbeddingError>>;

enum LoadState {
    Uninitialized,
    Loading(watch::Receiver<LoadOutcome>),
    Ready(Arc<dyn EmbeddingOracle>),
    Failed(String),
}

/// Snapshot of the loader state, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleStatus {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

pub struct LazyOracle {
    loader: Arc<dyn OracleLoader>,
    state: Arc<Mutex<LoadState>>,
}

fn lock(state: &Mutex<LoadState>) -> MutexGuard<'_, LoadState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LazyOracle {
    pub fn new(loader: Arc<dyn OracleLoader>) -> Self {
        Self {
            loader,
            state: Arc::new(Mutex::new(LoadState::Uninitialized)),
        }
    }

    pub fn status(&self) -> OracleStatus {
        match &*lock(&self.state) {
            LoadState::Uninitialized => OracleStatus::Uninitialized,
            LoadState::Loading(_) => OracleStatus::Loading,
            LoadState::Ready(_) => OracleStatus::Ready,
            LoadState::Failed(err) => OracleStatus::Failed(err.clone()),
        }
    }

    /// Return the ready oracle, loading it first if needed.
    pub async fn get(&self) -> Result<Arc<dyn EmbeddingOracle>, EmbeddingError> {
        let mut rx = {
            let mut state = lock(&self.state);

            let in_flight = match &*state {
                LoadState::Ready(oracle) => return Ok(oracle.clone()),
                LoadState::Loading(rx) => Some(rx.clone()),
                LoadState::Uninitialized | LoadState::Failed(_) => None,
            };

            match in_flight {
                Some(rx) => rx,
                None => {
                    let (tx, rx) = watch::channel(None);
                    *state = LoadState::Loading(rx.clone());
                    self.spawn_load(tx);
                    rx
                }
            }
        };

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => {
                // loader task went away without reporting
                self.abandon_load();
                None
            }
        };

        outcome.unwrap_or_else(|| {
            Err(EmbeddingError::InitFailed(
                "model loading task ended unexpectedly".to_string(),
            ))
        })
    }

    fn spawn_load(&self, tx: watch::Sender<LoadOutcome>) {
        let loader = self.loader.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            log::info!("model={} stage=load outcome=started", loader.model_name());

            let (next, outcome) = match loader.load().await {
                Ok(oracle) => {
                    log::info!(
                        "model={} stage=load outcome=ready dimensions={}",
                        loader.model_name(),
                        oracle.dimensions()
                    );
                    (LoadState::Ready(oracle.clone()), Ok(oracle))
                }
                Err(err) => {
                    log::error!("model={} stage=load outcome=failed err={err}", loader.model_name());
                    (LoadState::Failed(err.to_string()), Err(err))
                }
            };

            *lock(&state) = next;
            let _ = tx.send(Some(outcome));
        });
    }

    fn abandon_load(&self) {
        let mut state = lock(&self.state);
        let closed = matches!(&*state, LoadState::Loading(rx) if rx.has_changed().is_err());
        if closed {
            *state = LoadState::Failed("model loading task ended unexpectedly".to_string());
        }
    }
}
