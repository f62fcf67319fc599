//! Shared types used by the Qdrant client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Payload stored next to every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Original chunk text.
    pub text: String,
}

/// Embedding record written to the collection.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRecord {
    /// Identifier generated at upload time.
    pub id: Uuid,
    /// Embedding vector produced for the chunk.
    pub vector: Vec<f32>,
    /// Chunk text carried for retrieval.
    pub payload: RecordPayload,
}

impl EmbeddingRecord {
    /// Pair a chunk with its vector under a fresh identifier.
    pub fn new(text: String, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            payload: RecordPayload { text },
        }
    }
}

/// Scored payload returned by Qdrant queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Optional payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}

impl ScoredPoint {
    /// Text stored in the payload, when present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get("text"))
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    }
}

// Vectors must be serialized as `f32`; routing them through `serde_json::Value` widens each
// component to `f64`.
#[derive(Serialize)]
pub(crate) struct UpsertRequest<'a> {
    pub(crate) points: &'a [EmbeddingRecord],
}

#[derive(Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub(crate) query: &'a [f32],
    pub(crate) limit: usize,
    pub(crate) with_payload: bool,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
