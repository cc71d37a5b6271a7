//! Retrieval engine: chunk model, vector index, persistence, and the
//! retrieval-augmented orchestrator.
//!
//! - `chunk`: data model shared by the index and the caller-facing API
//! - `loader`: directory-to-chunks collaborator used by the CLI
//! - `index`: in-memory similarity index with cosine ranking
//! - `persist`: self-describing on-disk index format
//! - `session`: handle owning the atomically swappable active index
//! - `context`: bounded context-window assembly
//! - `search`: question answering and summarization over the active index

pub mod chunk;
pub mod context;
pub mod index;
pub mod loader;
pub mod persist;
pub mod search;
pub mod session;

pub use chunk::{AnswerResult, Chunk, ChunkStore, RetrievedChunk};
pub use index::VectorIndex;
pub use search::{RagSearch, SearchConfig};
pub use session::IndexHandle;
