//! Retrieval-augmented orchestration over the active index.
//!
//! `RagSearch` owns the injected providers and turns a question into a
//! ranked context window and one generation request. It also carries the
//! index lifecycle operations that tie building, persistence, and the
//! session handle together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::chunk::{AnswerResult, ChunkStore, RetrievedChunk};
use super::context::{ContextBuilder, ContextPiece};
use super::index::VectorIndex;
use super::persist;
use super::session::IndexHandle;
use crate::core::errors::RagError;
use crate::llm::provider::{EmbeddingProvider, LanguageModel};

/// Returned without a model call when retrieval yields nothing to cite.
pub const NO_CONTEXT_ANSWER: &str = "No relevant content was found in the indexed documents.";

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Where `build_index` persists the session index.
    pub index_dir: PathBuf,
    /// Fixed character budget for the assembled context window.
    pub max_context_chars: usize,
}

impl SearchConfig {
    pub fn new(index_dir: PathBuf) -> Self {
        Self {
            index_dir,
            max_context_chars: 4000,
        }
    }
}

pub struct RagSearch {
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn LanguageModel>,
    config: SearchConfig,
}

impl RagSearch {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
        config: SearchConfig,
    ) -> Self {
        Self {
            embedder,
            model,
            config,
        }
    }

    /// Build a fresh index from `store`, persist it, and install it as the
    /// active index.
    ///
    /// Any failure before `install` leaves both the previously active index
    /// and the previously persisted directory untouched.
    pub async fn build_index(
        &self,
        handle: &IndexHandle,
        store: ChunkStore,
    ) -> Result<Arc<VectorIndex>, RagError> {
        let index = VectorIndex::build(store, self.embedder.as_ref()).await?;
        persist::persist(&index, &self.config.index_dir)?;
        Ok(handle.install(index))
    }

    /// Load a persisted index and install it as the active index.
    ///
    /// A load failure leaves the currently active index in place.
    pub fn load_index(
        &self,
        handle: &IndexHandle,
        path: &Path,
    ) -> Result<Arc<VectorIndex>, RagError> {
        let index = persist::load(path)?;
        Ok(handle.install(index))
    }

    /// Answer `question` from the `k` most relevant indexed chunks.
    pub async fn answer(
        &self,
        handle: &IndexHandle,
        question: &str,
        k: usize,
    ) -> Result<AnswerResult, RagError> {
        let index = handle.snapshot().ok_or(RagError::NoIndex)?;

        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let query_embedding = self.embedder.embed(question).await?;
        let hits = index.query(&query_embedding, k)?;

        if hits.is_empty() {
            tracing::info!(k, "retrieval returned nothing, answering without the model");
            return Ok(AnswerResult {
                text: NO_CONTEXT_ANSWER.to_string(),
                retrieved: Vec::new(),
                truncated: false,
            });
        }

        let pieces: Vec<ContextPiece<'_>> = hits
            .iter()
            .map(|hit| ContextPiece {
                text: &hit.chunk.text,
                source_path: &hit.chunk.source_path,
                sequence_no: hit.chunk.sequence_no,
            })
            .collect();
        let context = ContextBuilder::new(self.config.max_context_chars).build(&pieces);
        if context.truncated {
            tracing::warn!(
                budget = self.config.max_context_chars,
                "context window truncated"
            );
        }

        let prompt = answer_prompt(question, &context.text);
        let generated = self.model.generate(&prompt).await?;

        let retrieved = hits
            .iter()
            .map(|hit| RetrievedChunk {
                source_path: hit.chunk.source_path.clone(),
                sequence_no: hit.chunk.sequence_no,
                score: hit.distance,
            })
            .collect();

        Ok(AnswerResult {
            text: generated.trim().to_string(),
            retrieved,
            truncated: context.truncated,
        })
    }

    /// Produce a concise summary of the whole indexed corpus, without a
    /// retrieval step: chunks enter the context in corpus order.
    pub async fn summarize(&self, handle: &IndexHandle) -> Result<String, RagError> {
        let index = handle.snapshot().ok_or(RagError::NoIndex)?;

        let chunks = index.chunks();
        if chunks.is_empty() {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let pieces: Vec<ContextPiece<'_>> = chunks
            .iter()
            .map(|chunk| ContextPiece {
                text: &chunk.text,
                source_path: &chunk.source_path,
                sequence_no: chunk.sequence_no,
            })
            .collect();
        let context = ContextBuilder::new(self.config.max_context_chars).build(&pieces);

        let prompt = summary_prompt(&context.text);
        let generated = self.model.generate(&prompt).await?;

        Ok(generated.trim().to_string())
    }
}

fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        "Use only the following context to answer the question. \
         If the context does not contain the answer, say so.\n\n\
         Context:\n{context}\n\nQuestion: {question}\n\nAnswer:"
    )
}

fn summary_prompt(context: &str) -> String {
    format!(
        "Produce a concise summary of the following documents.\n\n\
         Documents:\n{context}\n\nSummary:"
    )
}
