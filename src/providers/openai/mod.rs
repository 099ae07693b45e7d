
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{KbError, Result};

/// Client for an OpenAI-compatible embeddings and chat completions API.
///
/// Provider failures surface immediately as [`KbError::Provider`]; there is
/// no internal retry. Retry and backoff policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    batch_size: u32,
    agent: ureq::Agent,
}

/// One message in a chat completion conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        // Rejects malformed base URLs up front
        config
            .openai
            .api_url()
            .map_err(|e| KbError::Configuration(e.to_string()))?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.openai.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            embedding_model: config.openai.embedding_model.clone(),
            chat_model: config.openai.chat_model.clone(),
            batch_size: config.openai.batch_size,
            agent,
        })
    }

    /// Embed a single text
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| KbError::Provider("Embeddings response was empty".to_string()))
    }

    /// Embed many texts, batching requests at the configured batch size.
    /// Output order matches input order.
    #[inline]
    pub fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            vectors.extend(self.embed_batch(batch)?);
        }

        Ok(vectors)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: self.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let response_text = self.post_json("/embeddings", &request, "Embeddings")?;

        let mut response: EmbeddingsResponse = serde_json::from_str(&response_text)
            .map_err(|e| KbError::Provider(format!("Failed to parse embeddings response: {}", e)))?;

        if response.data.len() != texts.len() {
            return Err(KbError::Provider(format!(
                "Embeddings count mismatch: requested {}, received {}",
                texts.len(),
                response.data.len()
            )));
        }

        // The API documents no response ordering; align by index
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Request a single chat completion at the given sampling temperature
    #[inline]
    pub fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        debug!(
            "Requesting chat completion with {} messages (model: {}, temperature: {})",
            messages.len(),
            self.chat_model,
            temperature
        );

        let request = ChatRequest {
            model: self.chat_model.clone(),
            messages: messages.to_vec(),
            temperature,
        };

        let response_text = self.post_json("/chat/completions", &request, "Chat completion")?;

        let response: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            KbError::Provider(format!("Failed to parse chat completion response: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                KbError::Provider("Chat completion returned no choices".to_string())
            })
    }

    fn post_json<T: Serialize>(&self, path: &str, request: &T, what: &str) -> Result<String> {
        let url = self.endpoint(path)?;
        let request_json = serde_json::to_string(request)
            .map_err(|e| KbError::Provider(format!("Failed to serialize {} request: {}", what, e)))?;

        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| classify_error(e, what))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| KbError::Configuration(format!("Failed to build provider URL: {}", e)))
    }
}

/// Map a transport-level failure onto the provider error taxonomy
fn classify_error(error: ureq::Error, what: &str) -> KbError {
    match error {
        ureq::Error::StatusCode(code) => match code {
            401 | 403 => KbError::Provider(format!(
                "{} request rejected: authentication failed (HTTP {})",
                what, code
            )),
            429 => KbError::Provider(format!("{} request rejected: rate limited (HTTP 429)", what)),
            code => KbError::Provider(format!("{} request failed with HTTP {}", what, code)),
        },
        ureq::Error::Timeout(_) => KbError::Provider(format!("{} request timed out", what)),
        other => KbError::Provider(format!("{} request failed: {}", what, other)),
    }
}
