//! Core data types and error definitions for the processing pipeline.

use crate::{
    drive::DriveError, embedding::EmbeddingClientError, llm::ChatClientError,
    qdrant::QdrantError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while cutting text into windows.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Window length of zero.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would keep the window from advancing.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidOverlap {
        /// Configured window length.
        chunk_size: usize,
        /// Configured overlap.
        overlap: usize,
    },
}

/// Errors emitted by the ingestion and question-answering pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Batch size of zero.
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
    /// Drive ingestion failed.
    #[error("Failed to read documents: {0}")]
    Drive(#[from] DriveError),
    /// Embedding provider failed to produce vectors for the input text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned a different number of vectors than texts sent.
    #[error("Embedding count mismatch in batch {batch}: expected {expected}, got {actual}")]
    EmbeddingCountMismatch {
        /// One-based batch number.
        batch: usize,
        /// Texts sent in the batch.
        expected: usize,
        /// Vectors returned.
        actual: usize,
    },
    /// Embedding provider returned no vector for the question.
    #[error("Embedding provider returned no vector for the question")]
    EmptyEmbedding,
    /// Qdrant interaction failed.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Chat-completion request failed.
    #[error("Failed to generate answer: {0}")]
    Chat(#[from] ChatClientError),
}

/// Counters describing a completed ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IngestOutcome {
    /// Documents pulled from the folder.
    pub documents: usize,
    /// Non-empty chunks embedded and stored.
    pub chunks: usize,
}

/// Answer to a question together with the context it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    /// Question as asked.
    pub question: String,
    /// Retrieved passages joined by blank lines, best match first.
    pub context: String,
    /// Completion text returned by the chat model.
    pub answer: String,
}
