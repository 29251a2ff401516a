use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use crate::places::LocationResult;
use crate::semantic::sparse::SparseEmbedding;

/// Audit record of one non-cached search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSession {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    /// Sparse form of every query embedding produced during the search
    pub embeddings: Vec<SparseEmbedding>,
    /// Keywords found in the query
    pub clusters: Vec<String>,
    pub results: Vec<LocationResult>,
}

/// Bounded log of recent sessions; oldest dropped first.
#[derive(Debug)]
pub struct SessionLog {
    capacity: usize,
    sessions: VecDeque<SearchSession>,
}

impl SessionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: VecDeque::new(),
        }
    }

    pub fn push(&mut self, session: SearchSession) {
        if self.capacity == 0 {
            return;
        }
        while self.sessions.len() >= self.capacity {
            self.sessions.pop_front();
        }
        self.sessions.push_back(session);
    }

    /// Sessions in creation order.
    pub fn snapshot(&self) -> Vec<SearchSession> {
        self.sessions.iter().cloned().collect()
    }
}
