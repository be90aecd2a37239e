//! `qbank` command line: preprocess, index, and search the question bank.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use qbank::{Embedder, EmbeddingModel, Settings, corpus, vector};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "qbank", about = "Normalize and index a tagged question bank", version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./qbank.toml if present)
    #[arg(short, long, global = true, env = "QBANK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flatten the raw question JSON into the processed record file
    Preprocess {
        /// Raw corpus (JSON list of questions)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Processed record file to write
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Embed processed records and upsert them into the vector store
    Index {
        /// Processed record file to read
        #[arg(long)]
        input: Option<PathBuf>,
        /// LanceDB directory
        #[arg(long)]
        store: Option<PathBuf>,
        /// Remove stored questions that are not in the input
        #[arg(long)]
        prune: bool,
    },
    /// Find the questions closest to a free-text query
    Search {
        query: String,
        /// LanceDB directory
        #[arg(long)]
        store: Option<PathBuf>,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Preprocess { source, output } => {
            let source = source.unwrap_or_else(|| settings.raw_path.clone());
            let output = output.unwrap_or_else(|| settings.processed_path.clone());
            corpus::preprocess(&source, &output)?;
            Ok(())
        }
        Command::Index {
            input,
            store,
            prune,
        } => {
            let input = input.unwrap_or_else(|| settings.processed_path.clone());
            let store = store.unwrap_or_else(|| settings.store_dir.clone());
            let embedder = load_embedder(&settings)?;
            let runtime = build_runtime()?;
            runtime.block_on(async {
                vector::index_records_file(&input, &store, &settings, embedder, prune).await?;
                anyhow::Ok(())
            })
        }
        Command::Search {
            query,
            store,
            limit,
        } => {
            let store = store.unwrap_or_else(|| settings.store_dir.clone());
            let limit = limit.unwrap_or(settings.search_limit);
            let embedder = load_embedder(&settings)?;
            let runtime = build_runtime()?;
            runtime.block_on(async {
                let table = vector::open_table(&store, &settings).await?;
                let hits = vector::QuestionSearch::new(table, embedder)?
                    .search(&query, limit)
                    .await?;

                for hit in hits {
                    println!(
                        "{:.4}\t{}\t{}",
                        hit.distance, hit.entry.id, hit.entry.content
                    );
                }
                anyhow::Ok(())
            })
        }
    }
}

/// Load the embedding model once for the whole run.
fn load_embedder(settings: &Settings) -> anyhow::Result<Arc<dyn Embedder>> {
    let model = EmbeddingModel::new(
        &settings.model_cache_dir,
        settings.embedding_dim,
        settings.normalize_embeddings,
    )?;
    Ok(Arc::new(model))
}

fn build_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
