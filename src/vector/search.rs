//! Similarity search over indexed questions.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector::models::SearchHit;
use crate::vector::table::QuestionTable;
use std::sync::Arc;

/// Embeds a free-text query and returns the nearest questions.
#[derive(Clone)]
pub struct QuestionSearch {
    table: QuestionTable,
    embedder: Arc<dyn Embedder>,
}

impl QuestionSearch {
    /// Fails if the embedder's vector length differs from the table's.
    pub fn new(table: QuestionTable, embedder: Arc<dyn Embedder>) -> Result<Self> {
        table.check_embedder(embedder.as_ref())?;
        Ok(Self { table, embedder })
    }

    /// Up to `limit` hits, closest first. A blank query returns nothing.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let trimmed_query = query.trim();
        if trimmed_query.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_one(trimmed_query).await?;
        let hits = self.table.query(&embedding, limit.max(1)).await?;

        tracing::debug!(query = trimmed_query, hits = hits.len(), "question search");
        Ok(hits)
    }
}
