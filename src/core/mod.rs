pub mod config;
pub mod errors;
pub mod logging;

pub use config::{AppPaths, EngineConfig};
pub use errors::RagError;
