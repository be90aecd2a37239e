//! Question indexing pipeline: embed flat records and upsert them by id.

use crate::corpus::FlatRecord;
use crate::embedding::Embedder;
use crate::error::{EmbeddingError, Result};
use crate::vector::models::IndexEntry;
use crate::vector::table::QuestionTable;
use std::collections::HashSet;
use std::sync::Arc;

/// Statistics from an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Records written (including ones that overwrote an earlier record in
    /// the same batch).
    pub indexed: usize,
    /// Records whose id already appeared earlier in the batch.
    pub duplicates: usize,
    /// Entries removed because their id was not in the batch.
    pub removed_stale: usize,
}

/// Writes flat records into the question table.
pub struct QuestionIndexer {
    table: QuestionTable,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    prune_stale: bool,
}

impl QuestionIndexer {
    /// Fails if the embedder's vector length differs from the table's.
    pub fn new(
        table: QuestionTable,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
    ) -> Result<Self> {
        table.check_embedder(embedder.as_ref())?;
        Ok(Self {
            table,
            embedder,
            batch_size: batch_size.max(1),
            prune_stale: false,
        })
    }

    /// Also delete entries whose ids are absent from the indexed batch.
    pub fn with_prune_stale(mut self, prune_stale: bool) -> Self {
        self.prune_stale = prune_stale;
        self
    }

    /// Index every record. Re-running with the same ids replaces entries.
    ///
    /// Records must already be normalized. Any embedding or store failure
    /// aborts the run; entries written before the failure stay in place.
    pub async fn build_index(&self, records: &[FlatRecord]) -> Result<IndexStats> {
        let mut stats = IndexStats::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(records.len());

        tracing::info!(
            records = records.len(),
            batch_size = self.batch_size,
            "indexing questions"
        );

        for batch in records.chunks(self.batch_size) {
            let texts = batch.iter().map(|record| record.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(texts).await?;
            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: embeddings.len(),
                }
                .into());
            }

            for (record, embedding) in batch.iter().zip(embeddings) {
                let entry = IndexEntry::new(record, embedding);
                if !seen.insert(entry.id.clone()) {
                    tracing::warn!(
                        question_id = %entry.id,
                        "duplicate question id in batch, later record overwrites earlier"
                    );
                    stats.duplicates += 1;
                }
                self.table.upsert(&entry).await?;
                stats.indexed += 1;
            }

            tracing::debug!(indexed = stats.indexed, "batch stored");
        }

        if self.prune_stale && records.is_empty() {
            tracing::warn!("no records to index, refusing to prune the whole table");
        } else if self.prune_stale {
            stats.removed_stale = self.remove_stale_entries(&seen).await?;
        }

        self.table.create_index().await?;
        self.table.optimize().await?;

        tracing::info!(
            indexed = stats.indexed,
            duplicates = stats.duplicates,
            removed_stale = stats.removed_stale,
            "question indexing complete"
        );

        Ok(stats)
    }

    /// Remove entries from the table whose ids were not indexed this run.
    async fn remove_stale_entries(&self, indexed_ids: &HashSet<String>) -> Result<usize> {
        let existing_ids = self.table.list_ids().await?;
        let stale_ids: Vec<String> = existing_ids
            .into_iter()
            .filter(|id| !indexed_ids.contains(id))
            .collect();

        if !stale_ids.is_empty() {
            tracing::warn!(
                stale = stale_ids.len(),
                kept = indexed_ids.len(),
                "removing entries absent from this run"
            );
        }

        for stale_id in &stale_ids {
            self.table.delete(stale_id).await?;
        }

        Ok(stale_ids.len())
    }
}
