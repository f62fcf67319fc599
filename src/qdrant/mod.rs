//! Qdrant vector store integration.

pub mod client;
pub mod types;

pub use client::QdrantService;
pub use types::{EmbeddingRecord, QdrantError, RecordPayload, ScoredPoint};
