//! Embedding client abstraction and the Cohere adapter.

use crate::config::get_config;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// HTTP layer failed before receiving a response.
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider answered with a non-success status.
    #[error("Failed to generate embeddings ({status}): {body}")]
    GenerationFailed {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider response did not carry float embeddings.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Whether texts are embedded for storage or for lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// Passages persisted in the vector store.
    SearchDocument,
    /// Questions used to query the vector store.
    SearchQuery,
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Cohere v2 `embed` endpoint client.
pub struct CohereClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CohereClient {
    /// Build a client against `base_url` using the given key and model.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder().user_agent("docqna/embed").build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v2/embed", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: InputType,
    embedding_types: [&'static str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: EmbeddingsByType,
}

#[derive(Deserialize)]
struct EmbeddingsByType {
    #[serde(default)]
    float: Option<Vec<Vec<f32>>>,
}

#[async_trait]
impl EmbeddingClient for CohereClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        tracing::debug!(
            model = %self.model,
            texts = texts.len(),
            input_type = ?input_type,
            "Generating embeddings"
        );

        let body = EmbedRequest {
            texts: &texts,
            model: &self.model,
            input_type,
            embedding_types: ["float"],
        };
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = EmbeddingClientError::GenerationFailed { status, body };
            tracing::error!(error = %error, "Cohere embed request failed");
            return Err(error);
        }

        let payload: EmbedResponse = response.json().await?;
        payload.embeddings.float.ok_or_else(|| {
            EmbeddingClientError::InvalidResponse("response carried no float embeddings".into())
        })
    }
}

/// Build an embedding client from the global configuration.
pub fn get_embedding_client()
-> Result<Box<dyn EmbeddingClient + Send + Sync>, EmbeddingClientError> {
    let config = get_config();
    Ok(Box::new(CohereClient::new(
        config.cohere_base_url.clone(),
        config.cohere_api_key.clone(),
        config.embedding_model.clone(),
    )?))
}
