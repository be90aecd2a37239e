//! Question bank normalization and vector indexing.
//!
//! Two stages, run independently from the `qbank` binary:
//!
//! - [`corpus::preprocess`] flattens the raw, tag-annotated question export
//!   into one record per question and writes them as JSON Lines.
//! - [`vector::index_records_file`] embeds each record's content and upserts
//!   it into a LanceDB table keyed by question id, so re-runs replace rather
//!   than duplicate entries.

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod vector;

pub use config::Settings;
pub use embedding::{Embedder, EmbeddingModel};
pub use error::{Error, Result};
