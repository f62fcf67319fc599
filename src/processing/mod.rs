//! Document processing pipeline: chunking, batching, embedding, retrieval, and answering.

pub mod batching;
pub mod chunking;
mod service;
pub mod types;

pub use service::{PipelineApi, PipelineService, PipelineSettings, assemble_context};
pub use types::{Answer, ChunkingError, IngestOutcome, ProcessingError};
