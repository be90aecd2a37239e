//! Embedding generation via fastembed.

use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Text → vector collaborator used by indexing and search.
///
/// Implementations must be deterministic for a given model version and
/// return exactly one vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts.
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(vec![text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            }
            .into());
        }
        Ok(vectors.swap_remove(0))
    }
}

/// Embedding model wrapper with thread-safe sharing.
///
/// Loaded once by the driver and passed down behind an `Arc`. fastembed
/// inference is blocking, so async callers go through `spawn_blocking`.
pub struct EmbeddingModel {
    model: Arc<fastembed::TextEmbedding>,
    dimension: usize,
    normalize: bool,
}

impl EmbeddingModel {
    /// Load the default model, storing downloaded files in `cache_dir`.
    ///
    /// Limits ONNX intra-op threads to avoid excessive memory usage on
    /// machines with many cores. Fails if the model's output length differs
    /// from `dimension`.
    pub fn new(cache_dir: &Path, dimension: usize, normalize: bool) -> Result<Self> {
        if std::env::var("OMP_NUM_THREADS").is_err() {
            // SAFETY: Called once during single-threaded init before any ONNX
            // threads are spawned.
            unsafe { std::env::set_var("OMP_NUM_THREADS", "2") };
        }

        let options = fastembed::InitOptions::default()
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(true);

        let model = fastembed::TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        let probe = model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;
        let actual = probe.first().map(Vec::len).unwrap_or_default();
        if actual != dimension {
            return Err(EmbeddingError::ModelInit(format!(
                "model produces {actual}-dimensional vectors but {dimension} are configured"
            ))
            .into());
        }

        tracing::info!(
            cache_dir = %cache_dir.display(),
            dimension,
            normalize,
            "embedding model loaded"
        );

        Ok(Self {
            model: Arc::new(model),
            dimension,
            normalize,
        })
    }
}

#[async_trait]
impl Embedder for EmbeddingModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model.clone();
        let mut vectors = tokio::task::spawn_blocking(move || {
            model
                .embed(texts, None)
                .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::TaskFailed(e.to_string()))??;

        if self.normalize {
            vectors.iter_mut().for_each(|vector| l2_normalize(vector));
        }

        Ok(vectors)
    }
}

/// Scale `vector` to unit length. Zero vectors are left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}
