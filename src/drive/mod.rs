//! Google Drive ingestion: list a folder's PDFs, download them, and extract their text.

pub mod auth;
pub mod client;
pub mod pdf;

use crate::config::get_config;
use async_trait::async_trait;
use auth::{DRIVE_READONLY_SCOPE, ServiceAccountAuth, ServiceAccountCredentials, TokenSource};
use client::DriveClient;
use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while reading documents from Drive.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Service-account credentials are missing or unusable.
    #[error("Drive credentials error: {0}")]
    Credentials(String),
    /// Token exchange failed.
    #[error("Drive authentication failed: {0}")]
    Auth(String),
    /// HTTP layer failed before receiving a response.
    #[error("Drive request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Drive responded with an unexpected status code.
    #[error("Unexpected Drive response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by Drive.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// PDF text extraction failed.
    #[error("Failed to extract text from {file}: {message}")]
    Pdf {
        /// Name of the offending file.
        file: String,
        /// Extraction failure description.
        message: String,
    },
}

/// A PDF pulled from Drive together with its extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name as shown in Drive.
    pub name: String,
    /// Drive file identifier.
    pub id: String,
    /// Full extracted text.
    pub text: String,
}

/// Supplies the documents of a folder to the ingestion pipeline.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch every document in `folder_id`.
    async fn fetch_documents(&self, folder_id: &str) -> Result<Vec<Document>, DriveError>;
}

/// Drive-backed document source.
///
/// Missing credentials fail the call. Once credentials are available, any listing, download,
/// or extraction failure is logged and reported as an empty folder.
pub struct GoogleDriveSource {
    client: Option<DriveClient>,
}

impl GoogleDriveSource {
    /// Wrap an authenticated Drive client.
    pub fn new(client: DriveClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Source that fails every fetch because no credentials were configured.
    pub fn unconfigured() -> Self {
        Self { client: None }
    }

    /// Build the source from `GOOGLE_APPLICATION_CREDENTIALS` and `DRIVE_API_URL`.
    pub fn from_config() -> Result<Self, DriveError> {
        let config = get_config();
        let Some(raw) = config.google_credentials.as_deref() else {
            tracing::warn!("GOOGLE_APPLICATION_CREDENTIALS is not set; ingestion is disabled");
            return Ok(Self::unconfigured());
        };

        Self::from_credentials(raw, &config.drive_api_url)
    }

    /// Build the source from a service-account JSON document.
    ///
    /// Malformed JSON or an unusable private key is reported here rather than at fetch time.
    pub fn from_credentials(raw: &str, drive_api_url: &str) -> Result<Self, DriveError> {
        let credentials = ServiceAccountCredentials::from_json(raw)?;
        tracing::debug!(client_email = %credentials.client_email, "Loaded Drive service account");
        let tokens: Arc<dyn TokenSource> =
            Arc::new(ServiceAccountAuth::new(credentials, DRIVE_READONLY_SCOPE)?);
        Ok(Self::new(DriveClient::new(drive_api_url.to_string(), tokens)?))
    }

    async fn collect(client: &DriveClient, folder_id: &str) -> Result<Vec<Document>, DriveError> {
        let files = client.list_pdfs(folder_id).await?;
        if files.is_empty() {
            tracing::warn!(folder_id, "No PDF files found in folder");
            return Ok(Vec::new());
        }

        for file in &files {
            tracing::info!(name = %file.name, id = %file.id, "Found PDF");
        }

        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            let bytes = client.download(&file.id).await?;
            let text = pdf::extract_text(&file.name, bytes).await?;
            tracing::info!(name = %file.name, chars = text.chars().count(), "Extracted PDF text");
            documents.push(Document {
                name: file.name,
                id: file.id,
                text,
            });
        }

        Ok(documents)
    }
}

#[async_trait]
impl DocumentSource for GoogleDriveSource {
    async fn fetch_documents(&self, folder_id: &str) -> Result<Vec<Document>, DriveError> {
        let Some(client) = &self.client else {
            return Err(DriveError::Credentials(
                "GOOGLE_APPLICATION_CREDENTIALS is not set".into(),
            ));
        };

        match Self::collect(client, folder_id).await {
            Ok(documents) => Ok(documents),
            Err(error) => {
                tracing::error!(folder_id, error = %error, "Error fetching files from Drive");
                Ok(Vec::new())
            }
        }
    }
}
