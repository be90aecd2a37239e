//! LanceDB table holding one vector row per question id.
//!
//! LanceDB has no id-keyed upsert on `add`, so [`QuestionTable::upsert`]
//! deletes any row with the same id before appending. Each id is written in
//! its own delete + append pair; an interrupted run can leave the current id
//! missing but never duplicated.

use crate::embedding::Embedder;
use crate::error::{DbError, EmbeddingError, Result};
use crate::vector::models::{IndexEntry, QuestionMetadata, SearchHit, StoredEntry};
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{Array, ArrayRef, RecordBatch, RecordBatchIterator};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

/// Below this row count the ANN index cannot be trained; brute-force search
/// is used instead.
const MIN_ROWS_FOR_INDEX: usize = 256;

/// LanceDB table of question vectors.
#[derive(Clone)]
pub struct QuestionTable {
    table: lancedb::Table,
    dimension: usize,
}

impl QuestionTable {
    /// Open existing table or create a new one.
    ///
    /// A table is only created when none exists under `table_name`. Any
    /// other open failure is returned so the stored vectors are never
    /// discarded. An existing table built for a different embedding
    /// dimension is an error too.
    pub async fn open_or_create(
        connection: &lancedb::Connection,
        table_name: &str,
        dimension: usize,
    ) -> Result<Self> {
        match connection.open_table(table_name).execute().await {
            Ok(table) => {
                let table = Self { table, dimension };
                table.check_dimension().await?;
                Ok(table)
            }
            Err(lancedb::Error::TableNotFound { .. }) => {
                tracing::debug!(table_name, "table not found, creating");
                let table = Self::create_empty_table(connection, table_name, dimension).await?;
                Ok(Self { table, dimension })
            }
            Err(error) => {
                tracing::error!(%error, table_name, "failed to open existing table");
                Err(DbError::LanceDb(format!("cannot open table `{table_name}`: {error}")).into())
            }
        }
    }

    async fn create_empty_table(
        connection: &lancedb::Connection,
        table_name: &str,
        dimension: usize,
    ) -> Result<lancedb::Table> {
        let schema = Arc::new(schema(dimension)?);
        let batches = RecordBatchIterator::new(vec![].into_iter().map(Ok), schema);

        connection
            .create_table(table_name, Box::new(batches))
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()).into())
    }

    async fn check_dimension(&self) -> Result<()> {
        let schema = self
            .table
            .schema()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;
        let stored = schema
            .field_with_name("embedding")
            .ok()
            .and_then(|field| match field.data_type() {
                arrow_schema::DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            });

        match stored {
            Some(size) if size == self.dimension => Ok(()),
            Some(size) => Err(DbError::DimensionMismatch {
                id: "<table schema>".into(),
                expected: self.dimension,
                actual: size,
            }
            .into()),
            None => Err(DbError::LanceDb("table has no fixed-size embedding column".into()).into()),
        }
    }

    /// Vector length this table stores.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Fail unless `embedder` produces vectors of this table's length.
    pub fn check_embedder(&self, embedder: &dyn Embedder) -> Result<()> {
        if embedder.dimension() != self.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                embedder: embedder.dimension(),
                table: self.dimension(),
            }
            .into());
        }
        Ok(())
    }

    /// Insert an entry, replacing any existing row with the same id.
    pub async fn upsert(&self, entry: &IndexEntry) -> Result<()> {
        if entry.embedding.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                id: entry.id.clone(),
                expected: self.dimension,
                actual: entry.embedding.len(),
            }
            .into());
        }

        let metadata = serde_json::to_string(&entry.metadata).map_err(|e| DbError::Metadata {
            id: entry.id.clone(),
            reason: e.to_string(),
        })?;

        use arrow_array::{FixedSizeListArray, StringArray};

        let schema = Arc::new(schema(self.dimension)?);
        let embedding_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            vec![Some(entry.embedding.iter().map(|v| Some(*v)).collect::<Vec<_>>())],
            list_size(self.dimension)?,
        );

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![entry.id.as_str()])) as ArrayRef,
                Arc::new(StringArray::from(vec![entry.content.as_str()])) as ArrayRef,
                Arc::new(StringArray::from(vec![metadata.as_str()])) as ArrayRef,
                Arc::new(embedding_array) as ArrayRef,
            ],
        )
        .map_err(|e| DbError::LanceDb(e.to_string()))?;

        self.delete(&entry.id).await?;

        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
        self.table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        Ok(())
    }

    /// Delete the row with this id, if any.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.table
            .delete(&id_predicate(id))
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        Ok(())
    }

    /// Fetch a single entry by id.
    pub async fn get(&self, id: &str) -> Result<Option<StoredEntry>> {
        let results: Vec<RecordBatch> = self
            .table
            .query()
            .only_if(id_predicate(id))
            .select(lancedb::query::Select::columns(&["id", "content", "metadata"]))
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        let mut entries = Vec::new();
        for batch in &results {
            entries.extend(decode_entries(batch)?.into_iter().map(|(entry, _)| entry));
        }

        Ok(entries.into_iter().next())
    }

    /// Nearest entries to `vector`, sorted by distance ascending.
    pub async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        if vector.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                id: "<query>".into(),
                expected: self.dimension,
                actual: vector.len(),
            }
            .into());
        }

        let results: Vec<RecordBatch> = self
            .table
            .query()
            .nearest_to(vector)
            .map_err(|e| DbError::LanceDb(e.to_string()))?
            .limit(limit)
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        let mut hits = Vec::new();
        for batch in &results {
            for (entry, distance) in decode_entries(batch)? {
                if let Some(distance) = distance {
                    hits.push(SearchHit { entry, distance });
                }
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        Ok(hits)
    }

    /// Count all rows in the table.
    pub async fn count(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()).into())
    }

    /// List all entry ids currently stored in the table.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let results: Vec<RecordBatch> = self
            .table
            .query()
            .select(lancedb::query::Select::columns(&["id"]))
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        let mut ids = Vec::new();
        for batch in results {
            if let Some(id_col) = batch.column_by_name("id") {
                let values: &arrow_array::StringArray = id_col.as_string::<i32>();
                for index in 0..values.len() {
                    if values.is_valid(index) {
                        ids.push(values.value(index).to_string());
                    }
                }
            }
        }

        Ok(ids)
    }

    /// Build the ANN index on the embedding column once the table is large
    /// enough to train it. Re-running is harmless.
    pub async fn create_index(&self) -> Result<()> {
        let rows = self.count().await?;
        if rows < MIN_ROWS_FOR_INDEX {
            tracing::debug!(rows, "too few rows for a vector index, using flat search");
            return Ok(());
        }

        match self
            .table
            .create_index(&["embedding"], lancedb::index::Index::Auto)
            .execute()
            .await
        {
            Ok(()) => {
                tracing::debug!(rows, "vector index created on embedding column");
                Ok(())
            }
            Err(error) => {
                let message = error.to_string();
                if message.contains("already") {
                    tracing::trace!("vector index already exists");
                    Ok(())
                } else {
                    Err(DbError::LanceDb(format!("Failed to create vector index: {message}")).into())
                }
            }
        }
    }

    /// Compact files and prune old versions.
    ///
    /// Every delete + append creates a new lance version; without this the
    /// version count grows on every run.
    pub async fn optimize(&self) -> Result<()> {
        self.table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;
        Ok(())
    }
}

/// Arrow schema for the question vectors table.
fn schema(dimension: usize) -> Result<arrow_schema::Schema> {
    Ok(arrow_schema::Schema::new(vec![
        arrow_schema::Field::new("id", arrow_schema::DataType::Utf8, false),
        arrow_schema::Field::new("content", arrow_schema::DataType::Utf8, false),
        arrow_schema::Field::new("metadata", arrow_schema::DataType::Utf8, false),
        arrow_schema::Field::new(
            "embedding",
            arrow_schema::DataType::FixedSizeList(
                Arc::new(arrow_schema::Field::new(
                    "item",
                    arrow_schema::DataType::Float32,
                    true,
                )),
                list_size(dimension)?,
            ),
            false,
        ),
    ]))
}

fn list_size(dimension: usize) -> Result<i32> {
    i32::try_from(dimension)
        .map_err(|_| DbError::LanceDb(format!("embedding dimension {dimension} is too large")).into())
}

fn id_predicate(id: &str) -> String {
    format!("id = '{}'", id.replace('\'', "''"))
}

/// Decode `(entry, distance)` rows. `distance` is present only for vector
/// query results.
fn decode_entries(batch: &RecordBatch) -> Result<Vec<(StoredEntry, Option<f32>)>> {
    let (Some(id_col), Some(content_col), Some(metadata_col)) = (
        batch.column_by_name("id"),
        batch.column_by_name("content"),
        batch.column_by_name("metadata"),
    ) else {
        return Ok(Vec::new());
    };

    let ids: &arrow_array::StringArray = id_col.as_string::<i32>();
    let contents: &arrow_array::StringArray = content_col.as_string::<i32>();
    let metadata: &arrow_array::StringArray = metadata_col.as_string::<i32>();
    let distances: Option<&arrow_array::PrimitiveArray<Float32Type>> = batch
        .column_by_name("_distance")
        .map(|column| column.as_primitive::<Float32Type>());

    let mut rows = Vec::with_capacity(ids.len());
    for index in 0..ids.len() {
        if !ids.is_valid(index) || !contents.is_valid(index) || !metadata.is_valid(index) {
            continue;
        }
        let id = ids.value(index).to_string();
        let parsed: QuestionMetadata =
            serde_json::from_str(metadata.value(index)).map_err(|e| DbError::Metadata {
                id: id.clone(),
                reason: e.to_string(),
            })?;
        let distance = distances
            .filter(|distances| distances.is_valid(index))
            .map(|distances| distances.value(index));

        rows.push((
            StoredEntry {
                id,
                content: contents.value(index).to_string(),
                metadata: parsed,
            },
            distance,
        ));
    }

    Ok(rows)
}
