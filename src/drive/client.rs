//! Drive v3 REST client: folder listing and file download.

use super::DriveError;
use super::auth::TokenSource;
use reqwest::{Client, Method};
use serde::Deserialize;
use std::sync::Arc;

const PDF_MIME_TYPE: &str = "application/pdf";
const PAGE_SIZE: &str = "50";

/// File metadata returned by a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Drive file identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// MIME type reported by Drive.
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Authenticated Drive API client.
pub struct DriveClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl DriveClient {
    /// Build a client against the Drive v3 API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Result<Self, DriveError> {
        let http = Client::builder().user_agent("docqna/drive").build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            tokens,
        })
    }

    /// List every non-trashed PDF whose parent is `folder_id`, following pagination.
    pub async fn list_pdfs(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = pdf_query(folder_id);
        let mut page_token: Option<String> = None;
        let mut files = Vec::new();

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", "nextPageToken, files(id, name, mimeType)"),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .request(Method::GET, "files")
                .await?
                .query(&params)
                .send()
                .await?;
            let response = ensure_success(response).await?;

            let FileList {
                files: page,
                next_page_token,
            } = response.json().await?;
            files.extend(page);

            match next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }

    /// Download the raw content of a file.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let response = self
            .request(Method::GET, &format!("files/{file_id}"))
            .await?
            .query(&[("alt", "media")])
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, DriveError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        Ok(self.http.request(method, url).bearer_auth(token))
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DriveError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(DriveError::UnexpectedStatus { status, body })
}

fn pdf_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and trashed = false and mimeType = '{PDF_MIME_TYPE}'")
}
