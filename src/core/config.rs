use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Resolved filesystem locations for one engine instance.
///
/// `current_session` subdirectories mirror the session lifecycle: both are
/// wiped and recreated wholesale when a new document set is indexed.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_dir: PathBuf,
    /// Uploaded documents for the active session.
    pub data_dir: PathBuf,
    /// Persisted vector index for the active session.
    pub index_dir: PathBuf,
    pub log_dir: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let base_dir = discover_base_dir();
        let data_dir = base_dir.join("data").join("current_session");
        let index_dir = base_dir.join("index").join("current_session");
        let log_dir = base_dir.join("logs");
        let config_path = base_dir.join("config.yml");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            base_dir,
            data_dir,
            index_dir,
            log_dir,
            config_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_base_dir() -> PathBuf {
    if let Ok(dir) = env::var("NOTEBOOK_RAG_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("NotebookRag");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("NotebookRag");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("notebook-rag")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Engine configuration with defaults suitable for a local
/// OpenAI-compatible provider (LM Studio, Ollama, llama.cpp server).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks of one source.
    pub chunk_overlap: usize,
    /// Default number of chunks retrieved per question.
    pub top_k: usize,
    /// Fixed character budget for the assembled context window.
    pub max_context_chars: usize,
    /// Timeout for embedding and generation requests, in seconds.
    pub request_timeout_secs: u64,
    /// Base URL of the OpenAI-compatible provider.
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
            max_context_chars: 4000,
            request_timeout_secs: 30,
            base_url: "http://127.0.0.1:1234".to_string(),
            embedding_model: "text-embedding-nomic-embed-text-v1.5".to_string(),
            chat_model: "qwen2.5-7b-instruct".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from the YAML file at `path`, falling back to defaults when the
    /// file does not exist. A present-but-invalid file is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&raw)?;
        Ok(config)
    }
}
