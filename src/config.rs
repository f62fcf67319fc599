use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

const DEFAULT_COLLECTION: &str = "document-qna";
const DEFAULT_COHERE_URL: &str = "https://api.cohere.com";
const DEFAULT_EMBEDDING_MODEL: &str = "embed-v4.0";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 96;
const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_CHAT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_DRIVE_URL: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_CHUNK_SIZE: usize = 250;
const DEFAULT_CHUNK_OVERLAP: usize = 50;
const DEFAULT_SEARCH_TOP_K: usize = 4;
const DEFAULT_PORT: u16 = 3000;

/// Runtime configuration for the docqna server and CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Name of the Qdrant collection holding document chunks.
    pub qdrant_collection_name: String,
    /// API key for the Cohere embedding endpoint.
    pub cohere_api_key: String,
    /// Base URL of the Cohere API.
    pub cohere_base_url: String,
    /// Embedding model identifier passed to Cohere.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Maximum number of texts sent in one embedding request.
    pub embedding_batch_size: usize,
    /// API key for the Groq chat-completion endpoint.
    pub groq_api_key: String,
    /// Base URL of the OpenAI-compatible Groq API.
    pub groq_base_url: String,
    /// Chat model used to answer questions.
    pub chat_model: String,
    /// Raw service-account credentials JSON used for Drive access.
    pub google_credentials: Option<String>,
    /// Base URL of the Drive v3 API.
    pub drive_api_url: String,
    /// Sliding-window length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    pub chunk_overlap: usize,
    /// Number of passages retrieved for each question.
    pub search_top_k: usize,
    /// HTTP server port.
    pub server_port: u16,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chunk_size = parse_or("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = parse_or("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidValue(
                "CHUNK_OVERLAP must be smaller than a non-zero CHUNK_SIZE".to_string(),
            ));
        }

        let embedding_batch_size = parse_or("EMBEDDING_BATCH_SIZE", DEFAULT_EMBEDDING_BATCH_SIZE)?;
        if embedding_batch_size == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_BATCH_SIZE".to_string()));
        }

        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_api_key: load_env_optional("QDRANT_KEY"),
            qdrant_collection_name: load_env_optional("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            cohere_api_key: load_env("COHERE_API_KEY")?,
            cohere_base_url: load_env_optional("COHERE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_COHERE_URL.to_string()),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            embedding_batch_size,
            groq_api_key: load_env("GROQ_API_KEY")?,
            groq_base_url: load_env_optional("GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_URL.to_string()),
            chat_model: load_env_optional("CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            google_credentials: load_env_optional("GOOGLE_APPLICATION_CREDENTIALS"),
            drive_api_url: load_env_optional("DRIVE_API_URL")
                .unwrap_or_else(|| DEFAULT_DRIVE_URL.to_string()),
            chunk_size,
            chunk_overlap,
            search_top_k: parse_or("SEARCH_TOP_K", DEFAULT_SEARCH_TOP_K)?,
            server_port: parse_or("PORT", DEFAULT_PORT)?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        embedding_model = %config.embedding_model,
        chat_model = %config.chat_model,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        server_port = config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
