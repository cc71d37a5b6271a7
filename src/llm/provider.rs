use async_trait::async_trait;

use crate::core::errors::RagError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// provider name for logs (e.g. "openai-compat", "stub")
    fn name(&self) -> &str;

    /// Map text to a fixed-dimension vector.
    ///
    /// Must be deterministic for identical input within one index's
    /// lifetime. The dimension is fixed by the provider; the index adopts
    /// it at build time.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// provider name for logs
    fn name(&self) -> &str;

    /// Single-shot completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}
