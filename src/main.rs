//! # Para-Brain CLI (`brain`)
//!
//! The `brain` binary is the local interface to the knowledge search index
//! and the notebook RAG engine.
//!
//! ## Usage
//!
//! ```bash
//! brain --config ./config/brain.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `brain search "<query>"` | Fuzzy-search the built-in knowledge base |
//! | `brain category <name>` | List knowledge items in a category |
//! | `brain related "<topic>"` | Show topics related to a query |
//! | `brain notebook new <title>` | Create a notebook |
//! | `brain notebook list` | List notebooks |
//! | `brain sources <notebook>` | List a notebook's uploaded sources |
//! | `brain ingest <notebook> <file>` | Ingest a PDF or text file |
//! | `brain ingest-knowledge <notebook>` | Bulk-ingest the curated corpus |
//! | `brain ask <notebook> "<question>"` | Retrieve best-matching contexts |
//!
//! The config file is optional; all settings have defaults. Logging is
//! controlled with `RUST_LOG` (e.g. `RUST_LOG=para_brain=debug`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use para_brain::config;
use para_brain::embedding::create_embedder;
use para_brain::knowledge::load_knowledge_base;
use para_brain::models::{Retrieval, SearchResult};
use para_brain::pipeline::RagPipeline;
use para_brain::search::SearchIndex;
use para_brain::store::RagStore;

/// Para-Brain: knowledge search and local RAG for a PARA/CODE
/// second-brain assistant.
#[derive(Parser)]
#[command(
    name = "brain",
    about = "Knowledge search and notebook RAG for a PARA/CODE second-brain assistant",
    version,
    long_about = "Para-Brain serves ranked answers from a built-in productivity-methodology \
    knowledge base and retrieves cited contexts from user notebooks (PDF and text uploads \
    are chunked, embedded locally, and ranked by cosine similarity)."
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/brain.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Fuzzy-search the built-in knowledge base.
    ///
    /// Returns up to 10 ranked articles. Curated content is preferred, and
    /// known-sensitive topics (health goals, questions about the template
    /// itself) are re-ranked deterministically.
    Search {
        /// The search query.
        query: String,

        /// Search only the curated collections.
        #[arg(long)]
        curated: bool,
    },

    /// List knowledge items in a category (e.g. PARA, CODE, NOTES).
    Category {
        /// Category label; matched case-insensitively or by containment.
        name: String,
    },

    /// Show topics related to a query, gathered from the top results.
    Related {
        /// The topic to expand.
        topic: String,
    },

    /// Manage notebooks.
    Notebook {
        #[command(subcommand)]
        action: NotebookAction,
    },

    /// List the sources uploaded to a notebook.
    Sources {
        /// Notebook id (`nb_...`).
        notebook: String,
    },

    /// Ingest a file into a notebook.
    ///
    /// PDFs are extracted and paginated; everything else is treated as UTF-8
    /// plain text. The file is chunked, embedded, and persisted.
    Ingest {
        /// Notebook id (`nb_...`).
        notebook: String,

        /// Path to the file to ingest.
        file: PathBuf,

        /// Override the MIME type (inferred from the extension otherwise).
        #[arg(long)]
        mime: Option<String>,
    },

    /// Bulk-ingest the curated knowledge corpus into a notebook as one
    /// synthetic document.
    IngestKnowledge {
        /// Notebook id (`nb_...`).
        notebook: String,
    },

    /// Retrieve the best-matching contexts for a question.
    ///
    /// Prints the ranked contexts and their citations (file, page,
    /// similarity). Prompting an LLM with the contexts is up to the caller.
    Ask {
        /// Notebook id (`nb_...`).
        notebook: String,

        /// The question to answer.
        question: String,

        /// Number of contexts to retrieve (capped by config).
        #[arg(long)]
        top_k: Option<usize>,
    },
}

/// Notebook management subcommands.
#[derive(Subcommand)]
enum NotebookAction {
    /// Create a notebook and print its id.
    New {
        /// Human-readable notebook title.
        title: String,
    },
    /// List all notebooks, oldest first.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Search { query, curated } => {
            let index = SearchIndex::new(load_knowledge_base()?);
            let results = if curated {
                index.search_curated(&query)
            } else {
                index.search(&query)
            };
            print_search_results(&results);
        }
        Commands::Category { name } => {
            let index = SearchIndex::new(load_knowledge_base()?);
            let items = index.search_by_category(&name);
            if items.is_empty() {
                println!("No items in category '{}'.", name);
            }
            for item in items {
                println!("[{}] {}  ({})", item.category, item.title, item.id);
            }
        }
        Commands::Related { topic } => {
            let index = SearchIndex::new(load_knowledge_base()?);
            let topics = index.find_related_topics(&topic);
            if topics.is_empty() {
                println!("No related topics.");
            }
            for topic in topics {
                println!("- {}", topic);
            }
        }
        Commands::Notebook { action } => {
            let store = build_store(&cfg)?;
            match action {
                NotebookAction::New { title } => {
                    let notebook = store.create_notebook(&title).await?;
                    println!("{}  {}", notebook.id, notebook.title);
                }
                NotebookAction::List => {
                    let notebooks = store.list_notebooks().await?;
                    if notebooks.is_empty() {
                        println!("No notebooks.");
                    }
                    for notebook in notebooks {
                        println!(
                            "{}  {}  created: {}",
                            notebook.id,
                            notebook.title,
                            notebook.created_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
        }
        Commands::Sources { notebook } => {
            let store = build_store(&cfg)?;
            let sources = store.list_sources(&notebook).await?;
            if sources.is_empty() {
                println!("No sources.");
            }
            for source in sources {
                let pages = source
                    .page_count
                    .map(|n| format!("  pages: {}", n))
                    .unwrap_or_default();
                println!(
                    "{}  {}  uploaded: {}{}",
                    source.id,
                    source.file_name,
                    source.uploaded_at.format("%Y-%m-%d %H:%M"),
                    pages
                );
            }
        }
        Commands::Ingest {
            notebook,
            file,
            mime,
        } => {
            let pipeline = build_pipeline(&cfg)?;
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload".to_string());
            let mime_type = mime.unwrap_or_else(|| infer_mime(&file_name));
            let receipt = pipeline
                .ingest_file(&notebook, &file_name, &bytes, &mime_type)
                .await?;
            match receipt.source_id {
                Some(source_id) => {
                    println!("ingested {} chunks from {} ({})", receipt.added, file_name, source_id)
                }
                None => println!("no extractable text in {}", file_name),
            }
        }
        Commands::IngestKnowledge { notebook } => {
            let pipeline = build_pipeline(&cfg)?;
            let receipt = pipeline.ingest_knowledge(&notebook).await?;
            println!("ingested {} knowledge chunks", receipt.added);
        }
        Commands::Ask {
            notebook,
            question,
            top_k,
        } => {
            let pipeline = build_pipeline(&cfg)?;
            let retrieval = pipeline.ask(&notebook, &question, top_k).await?;
            print_retrieval(&retrieval);
        }
    }

    Ok(())
}

fn build_store(cfg: &config::Config) -> anyhow::Result<Arc<RagStore>> {
    let embedder = create_embedder(&cfg.embedding)?;
    Ok(Arc::new(RagStore::new(
        cfg.index.path.clone(),
        embedder,
        cfg.chunking.clone(),
    )))
}

fn build_pipeline(cfg: &config::Config) -> anyhow::Result<RagPipeline> {
    Ok(RagPipeline::new(build_store(cfg)?, cfg.retrieval.clone()))
}

/// Minimal MIME inference; the store only dispatches on PDF vs not-PDF.
fn infer_mime(file_name: &str) -> String {
    if file_name.to_lowercase().ends_with(".pdf") {
        "application/pdf".to_string()
    } else {
        "text/plain".to_string()
    }
}

fn print_search_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, result) in results.iter().enumerate() {
        let excerpt: String = result.item.content.chars().take(120).collect();
        println!(
            "{}. [{:.3}] {} / {}",
            i + 1,
            result.score,
            result.item.category,
            result.item.title
        );
        println!("    excerpt: \"{}\"", excerpt);
        println!("    id: {}", result.item.id);
        println!();
    }
}

fn print_retrieval(retrieval: &Retrieval) {
    if retrieval.contexts.is_empty() {
        println!("No contexts.");
        return;
    }
    for (i, (context, citation)) in retrieval
        .contexts
        .iter()
        .zip(retrieval.citations.iter())
        .enumerate()
    {
        println!(
            "({}) [{:.3}] {} p.{}",
            i + 1,
            citation.score,
            citation.file_name,
            citation.page
        );
        println!("    {}", context.replace('\n', " "));
        println!();
    }
}
