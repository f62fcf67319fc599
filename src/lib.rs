#![deny(missing_docs)]

//! Retrieval-augmented question answering over PDF folders stored in Google Drive.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Google Drive listing, download, and PDF text extraction.
pub mod drive;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Chat-completion client used for answers.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Chunking, batching, and pipeline orchestration.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
