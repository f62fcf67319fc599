use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use docqna::{
    api,
    drive::{Document, DocumentSource, DriveError},
    embedding::CohereClient,
    llm::GroqClient,
    processing::{PipelineService, PipelineSettings},
    qdrant::QdrantService,
};
use httpmock::{
    Method::{POST, PUT},
    MockServer,
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct FixedFolder(Vec<Document>);

#[async_trait]
impl DocumentSource for FixedFolder {
    async fn fetch_documents(&self, _folder_id: &str) -> Result<Vec<Document>, DriveError> {
        Ok(self.0.clone())
    }
}

fn pipeline(server: &MockServer, documents: Vec<Document>, batch_size: usize) -> PipelineService {
    let base_url = server.base_url();
    PipelineService::with_components(
        Box::new(FixedFolder(documents)),
        Box::new(CohereClient::new(&base_url, "cohere-key", "embed-v4.0").expect("cohere")),
        QdrantService::new(&base_url, Some("qdrant-key".into())).expect("qdrant"),
        Box::new(GroqClient::new(&base_url, "groq-key", "llama-3.1-8b-instant").expect("groq")),
        PipelineSettings {
            collection: "document-qna".into(),
            chunk_size: 250,
            chunk_overlap: 50,
            batch_size,
            top_k: 4,
            vector_size: 2,
        },
    )
}

async fn post(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[tokio::test]
async fn ingest_embeds_in_batches_and_upserts_each() {
    let server = MockServer::start_async().await;
    // Three documents of 300 chars → six chunks → batches of [4, 2]. The first batch holds the
    // chunks of "alpha" and "bravo", the second those of "charlie".
    let documents = ["alpha", "bravo", "charlie"]
        .into_iter()
        .map(|word| Document {
            name: format!("{word}.pdf"),
            id: word.to_string(),
            text: format!("{word} ").repeat(300 / (word.len() + 1) + 1),
        })
        .collect();

    let embed_four = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v2/embed")
                .json_body_partial(r#"{ "input_type": "search_document" }"#)
                .body_contains("alpha");
            then.status(200).json_body(json!({
                "embeddings": { "float": [[0.1, 0.2], [0.1, 0.2], [0.1, 0.2], [0.1, 0.2]] }
            }));
        })
        .await;
    let embed_two = server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/embed").body_contains("charlie");
            then.status(200).json_body(json!({
                "embeddings": { "float": [[0.3, 0.4], [0.3, 0.4]] }
            }));
        })
        .await;
    let upsert = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/collections/document-qna/points")
                .query_param("wait", "true")
                .header("api-key", "qdrant-key");
            then.status(200)
                .json_body(json!({ "result": { "status": "completed" } }));
        })
        .await;

    let app = api::create_router(Arc::new(pipeline(&server, documents, 4)));
    let (status, body) = post(app, "/ingest", json!({ "folderId": "folder" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"], 3);
    assert_eq!(body["chunks"], 6);
    assert_eq!(embed_four.hits_async().await, 1);
    assert_eq!(embed_two.hits_async().await, 1);
    assert_eq!(upsert.hits_async().await, 2);
}

#[tokio::test]
async fn mismatched_embedding_count_fails_ingest_without_upsert() {
    let server = MockServer::start_async().await;
    let documents = vec![Document {
        name: "doc.pdf".into(),
        id: "1".into(),
        text: "a".repeat(300),
    }];

    server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/embed");
            then.status(200)
                .json_body(json!({ "embeddings": { "float": [[0.1, 0.2]] } }));
        })
        .await;
    let upsert = server
        .mock_async(|when, then| {
            when.method(PUT).path("/collections/document-qna/points");
            then.status(200);
        })
        .await;

    let app = api::create_router(Arc::new(pipeline(&server, documents, 96)));
    let (status, body) = post(app, "/ingest", json!({ "folderId": "folder" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to ingest and update vector DB");
    assert_eq!(upsert.hits_async().await, 0);
}

#[tokio::test]
async fn ask_retrieves_context_and_returns_completion() {
    let server = MockServer::start_async().await;

    let embed = server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/embed").json_body(json!({
                "texts": ["Who wrote it?"],
                "model": "embed-v4.0",
                "input_type": "search_query",
                "embedding_types": ["float"]
            }));
            then.status(200)
                .json_body(json!({ "embeddings": { "float": [[0.9, 0.1]] } }));
        })
        .await;
    let search = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/collections/document-qna/points/query")
                .json_body(json!({ "query": [0.9, 0.1], "limit": 4, "with_payload": true }));
            then.status(200).json_body(json!({
                "result": { "points": [
                    { "id": "p1", "score": 0.8, "payload": { "text": "Written by Ada." } },
                    { "id": "p2", "score": 0.6, "payload": { "text": "Published in 1843." } }
                ] }
            }));
        })
        .await;
    let chat = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains("Context:\\nWritten by Ada.\\n\\nPublished in 1843.\\n\\nQuestion: Who wrote it?");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Ada wrote it." } }]
            }));
        })
        .await;

    let app = api::create_router(Arc::new(pipeline(&server, vec![], 96)));
    let (status, body) = post(app, "/ask", json!({ "question": "Who wrote it?" })).await;

    embed.assert_async().await;
    search.assert_async().await;
    chat.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "question": "Who wrote it?",
            "context": "Written by Ada.\n\nPublished in 1843.",
            "answer": "Ada wrote it."
        })
    );
}

#[tokio::test]
async fn clear_removes_every_point() {
    let server = MockServer::start_async().await;
    let delete = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/collections/document-qna/points/delete")
                .json_body(json!({ "filter": { "must": [] } }));
            then.status(200)
                .json_body(json!({ "result": { "status": "completed" } }));
        })
        .await;

    let app = api::create_router(Arc::new(pipeline(&server, vec![], 96)));
    let (status, body) = post(app, "/clear", json!({})).await;

    delete.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
