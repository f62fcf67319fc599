//! HTTP client wrapper for interacting with Qdrant.

use crate::config::get_config;
use crate::qdrant::types::{
    EmbeddingRecord, QdrantError, QueryRequest, QueryResponse, QueryResponseResult, ScoredPoint,
    UpsertRequest,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a client for the given base URL and optional API key.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("docqna/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().is_some_and(|value| !value.is_empty()),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Construct a new client using configuration derived from the environment.
    pub fn from_config() -> Result<Self, QdrantError> {
        let config = get_config();
        Self::new(&config.qdrant_url, config.qdrant_api_key.clone())
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::info!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection created");
        })
        .await
    }

    /// Write one batch of records and wait until Qdrant has applied it.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        records: Vec<EmbeddingRecord>,
    ) -> Result<usize, QdrantError> {
        if records.is_empty() {
            return Ok(0);
        }

        let point_count = records.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )
            .query(&[("wait", true)])
            .json(&UpsertRequest { points: &records })
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                points = point_count,
                "Points upserted"
            );
        })
        .await?;

        Ok(point_count)
    }

    /// Return the `limit` nearest points to `vector`, best match first.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let body = QueryRequest {
            query: &vector,
            limit,
            with_payload: true,
        };

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };

        Ok(points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect())
    }

    /// Delete every point stored in the collection, keeping the collection itself.
    pub async fn delete_all_points(&self, collection_name: &str) -> Result<(), QdrantError> {
        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/delete"),
            )
            .query(&[("wait", true)])
            .json(&json!({ "filter": { "must": [] } }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::info!(collection = collection_name, "Collection cleared");
        })
        .await
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };

    fn service_for(server: &MockServer, api_key: Option<&str>) -> QdrantService {
        QdrantService::new(&server.base_url(), api_key.map(str::to_string)).expect("client")
    }

    #[tokio::test]
    async fn search_points_emits_expected_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/query")
                    .json_body(json!({
                        "query": [0.1, 0.2],
                        "limit": 4,
                        "with_payload": true
                    }));
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            { "id": "a1", "score": 0.9, "payload": { "text": "first" } },
                            { "id": 7, "score": 0.4, "payload": { "text": "" } }
                        ]
                    }
                }));
            })
            .await;

        let hits = service_for(&server, None)
            .search_points("demo", vec![0.1, 0.2], 4)
            .await
            .expect("search");

        mock.assert_async().await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a1");
        assert_eq!(hits[0].text(), Some("first"));
        assert_eq!(hits[1].id, "7");
        assert_eq!(hits[1].text(), None);
    }

    #[tokio::test]
    async fn upsert_points_waits_and_sends_api_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/demo/points")
                    .query_param("wait", "true")
                    .header("api-key", "secret")
                    .json_body_partial(r#"{ "points": [ { "payload": { "text": "chunk" } } ] }"#);
                then.status(200)
                    .json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        let written = service_for(&server, Some("secret"))
            .upsert_points(
                "demo",
                vec![EmbeddingRecord::new("chunk".into(), vec![0.5, 0.5])],
            )
            .await
            .expect("upsert");

        mock.assert_async().await;
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn upsert_points_sends_vectors_in_f32_precision() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/demo/points")
                    .body_contains(r#""vector":[0.1,0.2,0.3]"#);
                then.status(200)
                    .json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        service_for(&server, None)
            .upsert_points(
                "demo",
                vec![EmbeddingRecord::new("chunk".into(), vec![0.1, 0.2, 0.3])],
            )
            .await
            .expect("upsert");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upsert_failure_reports_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/demo/points");
                then.status(400).body("wrong vector size");
            })
            .await;

        let error = service_for(&server, None)
            .upsert_points("demo", vec![EmbeddingRecord::new("c".into(), vec![1.0])])
            .await
            .expect_err("bad request");

        assert!(matches!(
            error,
            QdrantError::UnexpectedStatus { status, .. } if status == StatusCode::BAD_REQUEST
        ));
    }

    #[tokio::test]
    async fn delete_all_points_uses_match_all_filter() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/delete")
                    .query_param("wait", "true")
                    .json_body(json!({ "filter": { "must": [] } }));
                then.status(200)
                    .json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        service_for(&server, None)
            .delete_all_points("demo")
            .await
            .expect("delete");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn creates_collection_only_when_missing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/demo");
                then.status(404).body("not found");
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/demo")
                    .json_body(json!({ "vectors": { "size": 8, "distance": "Cosine" } }));
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;

        service_for(&server, None)
            .create_collection_if_not_exists("demo", 8)
            .await
            .expect("create");

        create.assert_async().await;
    }
}
