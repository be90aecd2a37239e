//! Question vector index.
//!
//! Stores one LanceDB row per question id, embedding the record's `content`
//! and keeping the remaining fields as metadata. Built on `fastembed` and
//! `lancedb`.

pub mod indexer;
pub mod models;
pub mod search;
pub mod table;

use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{DbError, Result};
use std::path::Path;
use std::sync::Arc;

pub use indexer::{IndexStats, QuestionIndexer};
pub use models::{IndexEntry, QuestionMetadata, SearchHit, StoredEntry};
pub use search::QuestionSearch;
pub use table::QuestionTable;

/// Connect to the store at `store_dir` and open the configured table.
pub async fn open_table(store_dir: &Path, settings: &Settings) -> Result<QuestionTable> {
    std::fs::create_dir_all(store_dir).map_err(|e| {
        DbError::LanceDb(format!("cannot create {}: {e}", store_dir.display()))
    })?;

    let uri = store_dir.to_string_lossy();
    let connection = lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| DbError::LanceDb(e.to_string()))?;

    QuestionTable::open_or_create(&connection, &settings.table_name, settings.embedding_dim).await
}

/// Read flat records from `input` and index them into the store.
pub async fn index_records_file(
    input: &Path,
    store_dir: &Path,
    settings: &Settings,
    embedder: Arc<dyn Embedder>,
    prune_stale: bool,
) -> Result<IndexStats> {
    let records = crate::corpus::read_records(input)?;
    tracing::info!(
        input = %input.display(),
        records = records.len(),
        "loaded processed records"
    );

    let table = open_table(store_dir, settings).await?;
    QuestionIndexer::new(table, embedder, settings.batch_size)?
        .with_prune_stale(prune_stale)
        .build_index(&records)
        .await
}
