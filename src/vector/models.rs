//! Entries stored in the question vector table.

use crate::corpus::{FlatRecord, RawId};
use serde::{Deserialize, Serialize};

/// Metadata stored alongside each vector, as a JSON column.
///
/// Ids keep their original JSON type; only the entry id is stringified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMetadata {
    pub question_id: RawId,
    pub correct_option_id: Option<RawId>,
    pub tag_ids: Vec<RawId>,
    pub domain: Option<String>,
    pub competency_name: Option<String>,
    pub competency_area: Option<String>,
    pub competency_definition: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
}

impl From<&FlatRecord> for QuestionMetadata {
    fn from(record: &FlatRecord) -> Self {
        Self {
            question_id: record.question_id.clone(),
            correct_option_id: record.correct_option_id.clone(),
            tag_ids: record.tag_ids.clone(),
            domain: record.domain.clone(),
            competency_name: record.competency_name.clone(),
            competency_area: record.competency_area.clone(),
            competency_definition: record.competency_definition.clone(),
            question_type: record.question_type.clone(),
        }
    }
}

/// A row to be written: one per question id.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub content: String,
    pub metadata: QuestionMetadata,
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    /// Pair a record with its embedding.
    pub fn new(record: &FlatRecord, embedding: Vec<f32>) -> Self {
        Self {
            id: record.entry_id(),
            content: record.content.clone(),
            metadata: QuestionMetadata::from(record),
            embedding,
        }
    }
}

/// A row read back from the table, without its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub id: String,
    pub content: String,
    pub metadata: QuestionMetadata,
}

/// One ranked result of a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entry: StoredEntry,
    /// Distance to the query vector; smaller is closer.
    pub distance: f32,
}
