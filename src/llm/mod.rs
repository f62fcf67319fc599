//! Chat-completion client used to answer questions from retrieved context.
//!
//! The Groq adapter talks to the OpenAI-compatible `chat/completions` endpoint directly over
//! HTTP. Prompt assembly lives here so every provider sees the same instruction and layout.

use crate::config::get_config;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Instruction sent as the system message of every completion.
pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant. Answer the user using only the provided context.";

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 1024;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum ChatClientError {
    /// HTTP layer failed before receiving a response.
    #[error("Chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider returned an error response.
    #[error("Chat API error {status}: {body}")]
    GenerationFailed {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider response carried no usable completion.
    #[error("Malformed chat response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Answer `question` using only `context`, returning the completion text verbatim.
    async fn answer(&self, context: &str, question: &str) -> Result<String, ChatClientError>;
}

/// Render the user message carrying context and question.
pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}

/// Groq chat-completion client.
pub struct GroqClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GroqClient {
    /// Build a client against an OpenAI-compatible `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ChatClientError> {
        let http = Client::builder().user_agent("docqna/chat").build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatClient for GroqClient {
    async fn answer(&self, context: &str, question: &str) -> Result<String, ChatClientError> {
        let prompt = build_user_prompt(context, question);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        tracing::debug!(model = %self.model, context_chars = context.len(), "Requesting completion");
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
            return Err(ChatClientError::GenerationFailed { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ChatClientError::InvalidResponse("no completion choices".into()))
    }
}

/// Build a chat client from the global configuration.
pub fn get_chat_client() -> Result<Box<dyn ChatClient + Send + Sync>, ChatClientError> {
    let config = get_config();
    Ok(Box::new(GroqClient::new(
        config.groq_base_url.clone(),
        config.groq_api_key.clone(),
        config.chat_model.clone(),
    )?))
}
