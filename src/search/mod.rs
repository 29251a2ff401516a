//! Search orchestration over the query, semantic and places layers.
//!
//! - `cache`: bounded FIFO result cache with a TTL for context-aware keys
//! - `errors`: error taxonomy of the pipeline
//! - `orchestrator`: the enhance, embed, fetch, rank, fallback, re-rank flow
//! - `session`: audit log of non-cached searches

pub mod cache;
pub mod errors;
pub mod orchestrator;
pub mod session;

pub use errors::SearchError;
pub use orchestrator::SearchOrchestrator;
