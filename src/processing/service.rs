//! Pipeline service coordinating Drive ingestion, chunking, embedding, Qdrant, and the chat model.

use crate::{
    config::{Config, get_config},
    drive::{Document, DocumentSource, GoogleDriveSource},
    embedding::{EmbeddingClient, InputType, get_embedding_client},
    llm::{ChatClient, get_chat_client},
    processing::{
        batching::partition_batches,
        chunking::chunk_text,
        types::{Answer, IngestOutcome, ProcessingError},
    },
    qdrant::{EmbeddingRecord, QdrantService, ScoredPoint},
};
use async_trait::async_trait;

/// Tunables of the pipeline, taken from configuration at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Qdrant collection holding the chunks.
    pub collection: String,
    /// Window length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    pub chunk_overlap: usize,
    /// Maximum texts per embedding request.
    pub batch_size: usize,
    /// Passages retrieved per question.
    pub top_k: usize,
    /// Vector size used when creating the collection.
    pub vector_size: u64,
}

impl PipelineSettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            collection: config.qdrant_collection_name.clone(),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            batch_size: config.embedding_batch_size,
            top_k: config.search_top_k,
            vector_size: config.embedding_dimension as u64,
        }
    }
}

/// Owns long-lived handles to every external service and runs the three pipeline operations.
///
/// Build it once at startup and share it through an `Arc`; all handles are safe for concurrent
/// use by in-flight requests.
pub struct PipelineService {
    documents: Box<dyn DocumentSource>,
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    qdrant_service: QdrantService,
    chat_client: Box<dyn ChatClient + Send + Sync>,
    settings: PipelineSettings,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Pull a Drive folder's PDFs, chunk them, and store their embeddings.
    async fn ingest(&self, folder_id: &str) -> Result<IngestOutcome, ProcessingError>;

    /// Answer a question from the stored passages.
    async fn ask(&self, question: &str) -> Result<Answer, ProcessingError>;

    /// Delete every stored record.
    async fn clear(&self) -> Result<(), ProcessingError>;
}

impl PipelineService {
    /// Build the service from global configuration and make sure the collection exists.
    pub async fn new() -> Result<Self, ProcessingError> {
        let config = get_config();
        tracing::info!("Initializing pipeline clients");
        let service = Self::with_components(
            Box::new(GoogleDriveSource::from_config()?),
            get_embedding_client()?,
            QdrantService::from_config()?,
            get_chat_client()?,
            PipelineSettings::from_config(config),
        );
        service.ensure_collection().await?;
        tracing::info!(collection = %service.settings.collection, "Pipeline ready");
        Ok(service)
    }

    /// Assemble a service from explicit components.
    pub fn with_components(
        documents: Box<dyn DocumentSource>,
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
        qdrant_service: QdrantService,
        chat_client: Box<dyn ChatClient + Send + Sync>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            documents,
            embedding_client,
            qdrant_service,
            chat_client,
            settings,
        }
    }

    /// Create the collection when it is missing.
    pub async fn ensure_collection(&self) -> Result<(), ProcessingError> {
        self.qdrant_service
            .create_collection_if_not_exists(&self.settings.collection, self.settings.vector_size)
            .await?;
        Ok(())
    }

    /// Pull every PDF of `folder_id`, chunk it, and upload the chunks' embeddings.
    pub async fn ingest(&self, folder_id: &str) -> Result<IngestOutcome, ProcessingError> {
        tracing::info!(folder_id, "Starting ingestion");
        let documents = self.documents.fetch_documents(folder_id).await?;
        let chunks = self.chunk_documents(&documents)?;
        let outcome = IngestOutcome {
            documents: documents.len(),
            chunks: chunks.len(),
        };

        self.embed_and_upload(chunks).await?;
        tracing::info!(
            folder_id,
            documents = outcome.documents,
            chunks = outcome.chunks,
            "Ingestion completed"
        );
        Ok(outcome)
    }

    /// Chunk every document in order and concatenate the results.
    pub fn chunk_documents(&self, documents: &[Document]) -> Result<Vec<String>, ProcessingError> {
        let mut chunks = Vec::new();
        for document in documents {
            let document_chunks = chunk_text(
                &document.text,
                self.settings.chunk_size,
                self.settings.chunk_overlap,
            )?;
            tracing::debug!(
                name = %document.name,
                chunks = document_chunks.len(),
                "Chunked document"
            );
            chunks.extend(document_chunks);
        }
        Ok(chunks)
    }

    /// Embed chunks batch by batch and upsert each batch before starting the next.
    ///
    /// The first failing batch aborts the upload; batches already written stay in the collection.
    /// Returns the number of batches written.
    pub async fn embed_and_upload(&self, chunks: Vec<String>) -> Result<usize, ProcessingError> {
        let batches = partition_batches(&chunks, self.settings.batch_size)?;
        let total = batches.len();
        tracing::info!(chunks = chunks.len(), batches = total, "Uploading chunks");

        for (index, batch) in batches.enumerate() {
            let number = index + 1;
            tracing::info!(batch = number, batches = total, size = batch.len(), "Processing batch");

            let vectors = self
                .embedding_client
                .generate_embeddings(batch.to_vec(), InputType::SearchDocument)
                .await?;
            if vectors.len() != batch.len() {
                let error = ProcessingError::EmbeddingCountMismatch {
                    batch: number,
                    expected: batch.len(),
                    actual: vectors.len(),
                };
                tracing::error!(error = %error, "Aborting upload");
                return Err(error);
            }

            let records = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(text, vector)| EmbeddingRecord::new(text, vector))
                .collect();
            self.qdrant_service
                .upsert_points(&self.settings.collection, records)
                .await?;
            tracing::info!(batch = number, batches = total, "Batch uploaded");
        }

        Ok(total)
    }

    /// Embed `question` in query mode and return the nearest passages as one context string.
    pub async fn retrieve_context(&self, question: &str) -> Result<String, ProcessingError> {
        let vector = self
            .embedding_client
            .generate_embeddings(vec![question.to_string()], InputType::SearchQuery)
            .await?
            .into_iter()
            .next()
            .ok_or(ProcessingError::EmptyEmbedding)?;

        let hits = self
            .qdrant_service
            .search_points(&self.settings.collection, vector, self.settings.top_k)
            .await?;
        tracing::debug!(hits = hits.len(), "Retrieved passages");
        Ok(assemble_context(&hits))
    }

    /// Answer `question` from the stored passages.
    pub async fn ask(&self, question: &str) -> Result<Answer, ProcessingError> {
        let context = self.retrieve_context(question).await?;
        let answer = self.chat_client.answer(&context, question).await?;
        tracing::info!(
            context_chars = context.len(),
            answer_chars = answer.len(),
            "Question answered"
        );
        Ok(Answer {
            question: question.to_string(),
            context,
            answer,
        })
    }

    /// Delete every record of the collection.
    pub async fn clear(&self) -> Result<(), ProcessingError> {
        self.qdrant_service
            .delete_all_points(&self.settings.collection)
            .await?;
        Ok(())
    }
}

/// Join the non-empty payload texts of `hits` with blank lines, preserving rank order.
pub fn assemble_context(hits: &[ScoredPoint]) -> String {
    hits.iter()
        .filter_map(ScoredPoint::text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn ingest(&self, folder_id: &str) -> Result<IngestOutcome, ProcessingError> {
        PipelineService::ingest(self, folder_id).await
    }

    async fn ask(&self, question: &str) -> Result<Answer, ProcessingError> {
        PipelineService::ask(self, question).await
    }

    async fn clear(&self) -> Result<(), ProcessingError> {
        PipelineService::clear(self).await
    }
}
