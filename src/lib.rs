//! Retrieval-augmented question answering over a small document corpus.
//!
//! The engine builds an embedding-backed similarity index from a set of
//! document chunks, persists it as a self-describing directory, and answers
//! natural-language questions by retrieving the nearest chunks and handing a
//! bounded context window to a language model.

pub mod core;
pub mod llm;
pub mod rag;

pub use crate::core::config::{AppPaths, EngineConfig};
pub use crate::core::errors::RagError;
pub use crate::rag::chunk::{AnswerResult, Chunk, ChunkStore, RetrievedChunk};
pub use crate::rag::index::VectorIndex;
pub use crate::rag::search::{RagSearch, SearchConfig};
pub use crate::rag::session::IndexHandle;
