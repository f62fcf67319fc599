//! HTTP surface for docqna.
//!
//! Three JSON endpoints sit on top of the pipeline:
//!
//! - `POST /ingest` – Body `{ "folderId" }`. Pulls the folder's PDFs from Drive, chunks and embeds
//!   them, and stores the vectors. Returns `{ message, documents, chunks }`.
//! - `POST /ask` – Body `{ "question" }`. Returns `{ question, context, answer }`.
//! - `POST /clear` – Deletes every stored record. Returns `{ success, message }`.
//!
//! Missing or blank inputs yield `400`; pipeline failures are logged and reported as a generic
//! `500` carrying `{ "error" }`.

use crate::processing::{Answer, PipelineApi, ProcessingError};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the HTTP router exposing the pipeline.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ingest", post(ingest::<S>))
        .route("/ask", post(ask::<S>))
        .route("/clear", post(clear::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Deserialize)]
struct IngestRequest {
    #[serde(default, rename = "folderId")]
    folder_id: Option<String>,
}

#[derive(Serialize)]
struct IngestResponse {
    message: &'static str,
    documents: usize,
    chunks: usize,
}

async fn ingest<S>(
    State(service): State<Arc<S>>,
    payload: Option<Json<IngestRequest>>,
) -> Result<Json<IngestResponse>, AppError>
where
    S: PipelineApi,
{
    let folder_id = payload
        .and_then(|Json(request)| request.folder_id)
        .filter(|value| !value.trim().is_empty())
        .ok_or(AppError::BadRequest("Missing folderId in request body"))?;

    let outcome = service
        .ingest(&folder_id)
        .await
        .map_err(|source| AppError::internal("Failed to ingest and update vector DB", source))?;

    Ok(Json(IngestResponse {
        message: "Ingestion, chunking, embedding, and upload successful",
        documents: outcome.documents,
        chunks: outcome.chunks,
    }))
}

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
}

async fn ask<S>(
    State(service): State<Arc<S>>,
    payload: Option<Json<AskRequest>>,
) -> Result<Json<Answer>, AppError>
where
    S: PipelineApi,
{
    let question = payload
        .and_then(|Json(request)| request.question)
        .filter(|value| !value.trim().is_empty())
        .ok_or(AppError::BadRequest("Missing question in request body"))?;

    let answer = service
        .ask(&question)
        .await
        .map_err(|source| AppError::internal("Failed to generate answer", source))?;
    Ok(Json(answer))
}

#[derive(Serialize)]
struct ClearResponse {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn clear<S>(State(service): State<Arc<S>>) -> (StatusCode, Json<ClearResponse>)
where
    S: PipelineApi,
{
    match service.clear().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ClearResponse {
                success: true,
                message: "Collection cleared",
                error: None,
            }),
        ),
        Err(error) => {
            tracing::error!(error = %error, "Error while clearing collection");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ClearResponse {
                    success: false,
                    message: "Failed to clear collection",
                    error: Some(error.to_string()),
                }),
            )
        }
    }
}

enum AppError {
    BadRequest(&'static str),
    Internal {
        message: &'static str,
        source: ProcessingError,
    },
}

impl AppError {
    fn internal(message: &'static str, source: ProcessingError) -> Self {
        Self::Internal { message, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal { message, source } => {
                tracing::error!(error = %source, "{message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
