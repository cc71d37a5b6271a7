use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use notebook_rag::core::config::{AppPaths, EngineConfig};
use notebook_rag::core::errors::RagError;
use notebook_rag::core::logging;
use notebook_rag::llm::openai::OpenAiCompatProvider;
use notebook_rag::rag::loader::{self, LoaderConfig};
use notebook_rag::rag::search::{RagSearch, SearchConfig};
use notebook_rag::rag::session::IndexHandle;

const USAGE: &str = "Usage: notebook-rag <command> [args]

Commands:
  index [dir]           index every document under [dir] (default: the
                        session data directory) and persist the result
  ask <question> [k]    answer a question from the indexed documents
  summarize             summarize the indexed documents
";

fn usage_exit() -> ! {
    eprint!("{USAGE}");
    std::process::exit(1)
}

#[tokio::main]
async fn main() -> ExitCode {
    let paths = AppPaths::new();
    logging::init(&paths);

    let config = match EngineConfig::load(&paths.config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        usage_exit();
    };

    match run(command, &args[1..], &paths, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.error_code(), "{err}");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(
    command: &str,
    args: &[String],
    paths: &AppPaths,
    config: &EngineConfig,
) -> Result<(), RagError> {
    let provider = Arc::new(OpenAiCompatProvider::new(
        &config.base_url,
        &config.embedding_model,
        &config.chat_model,
        Duration::from_secs(config.request_timeout_secs),
    ));
    let search = RagSearch::new(
        provider.clone(),
        provider,
        SearchConfig {
            index_dir: paths.index_dir.clone(),
            max_context_chars: config.max_context_chars,
        },
    );
    let handle = IndexHandle::new();

    match command {
        "index" => {
            let dir = args
                .first()
                .map(|raw| Path::new(raw).to_path_buf())
                .unwrap_or_else(|| paths.data_dir.clone());
            let loader_config = LoaderConfig {
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
            };
            let store = loader::load_all_documents(&dir, &loader_config)?;
            println!(
                "Loaded {} chunks from {} documents",
                store.len(),
                store.source_count()
            );

            let index = search.build_index(&handle, store).await?;
            println!(
                "Indexed {} chunks into {}",
                index.len(),
                paths.index_dir.display()
            );
        }
        "ask" => {
            let Some(question) = args.first() else {
                usage_exit();
            };
            let k = match args.get(1) {
                Some(raw) => raw.parse().unwrap_or_else(|_| usage_exit()),
                None => config.top_k,
            };

            search.load_index(&handle, &paths.index_dir)?;
            let result = search.answer(&handle, question, k).await?;

            println!("{}", result.text);
            if !result.retrieved.is_empty() {
                println!("\nSources:");
                for hit in &result.retrieved {
                    println!(
                        "  {} (chunk {}, distance {:.3})",
                        hit.source_path, hit.sequence_no, hit.score
                    );
                }
            }
            if result.truncated {
                eprintln!(
                    "note: context was truncated to the {} character budget",
                    config.max_context_chars
                );
            }
        }
        "summarize" => {
            search.load_index(&handle, &paths.index_dir)?;
            let summary = search.summarize(&handle).await?;
            println!("{summary}");
        }
        _ => usage_exit(),
    }

    Ok(())
}
