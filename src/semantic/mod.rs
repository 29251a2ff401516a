//! Embedding and similarity infrastructure for place ranking.
//!
//! # Architecture
//!
//! - `embeddings`: Embedding oracle trait, wraps fastembed for the local model
//! - `oracle`: Lazy, shared initialization of the oracle
//! - `sparse`: Top-N sparse compression of dense embeddings
//! - `similarity`: Dense and sparse cosine similarity
//! - `preprocess`: Text preparation for candidate embedding
//! - `ranker`: Candidate scoring and top-k selection

pub mod embeddings;
pub mod oracle;
pub mod preprocess;
pub mod ranker;
pub mod similarity;
pub mod sparse;

pub use embeddings::FastembedLoader;
