//! Provider capabilities the engine depends on.
//!
//! The embedding model and the language model are opaque collaborators:
//! narrow traits injected at construction so that a remote API, a local
//! server, or a test stub satisfy the same contract.

pub mod openai;
pub mod provider;

pub use openai::OpenAiCompatProvider;
pub use provider::{EmbeddingProvider, LanguageModel};
