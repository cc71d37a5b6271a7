//! OpenAI-compatible HTTP provider.
//!
//! Speaks the `/v1/embeddings` and `/v1/chat/completions` protocol served
//! by LM Studio, Ollama, and llama.cpp server. One instance implements both
//! capability traits; requests carry an explicit timeout so a stalled
//! server surfaces as an error instead of hanging the engine.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, LanguageModel};
use crate::core::errors::RagError;

#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    embedding_model: String,
    chat_model: String,
    timeout: Duration,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        base_url: &str,
        embedding_model: &str,
        chat_model: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model: embedding_model.to_string(),
            chat_model: chat_model.to_string(),
            timeout,
            client: Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let res = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "provider returned {status}: {text}"
            )));
        }

        let payload: EmbeddingsResponse = res
            .json()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        payload
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| RagError::Embedding("provider returned no embedding".to_string()))
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.chat_model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| RagError::Generation(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!(
                "provider returned {status}: {text}"
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|err| RagError::Generation(err.to_string()))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.to_string())
            .ok_or_else(|| RagError::Generation("malformed completion response".to_string()))
    }
}
