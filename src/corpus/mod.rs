//! Raw question corpus: loading, normalization, and the flat record file.
//!
//! `preprocess` is the raw → flat half of the pipeline. Each question is
//! normalized independently; questions without an id or text are skipped
//! and counted rather than failing the run.

pub mod loader;
pub mod models;
pub mod normalizer;
pub mod records;

use std::path::Path;

pub use loader::{decode_question, load_corpus};
pub use models::{FlatRecord, Normalized, RawId, RawQuestion, SkipReason, TagFields};
pub use normalizer::{build_content, extract_correct_option, extract_tag_fields, normalize};
pub use records::{read_records, write_records};

/// Counts from a preprocessing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessStats {
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
}

/// Normalize every item of an already-loaded corpus.
pub fn normalize_all(items: Vec<serde_json::Value>) -> (Vec<FlatRecord>, PreprocessStats) {
    let mut stats = PreprocessStats {
        total: items.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(items.len());

    for item in items {
        let outcome = match decode_question(item) {
            Ok(raw) => normalize(&raw),
            Err(error) => {
                let reason = SkipReason::Undecodable;
                tracing::warn!(%error, %reason, "skipping question");
                Normalized::Skipped(reason)
            }
        };
        match outcome {
            Normalized::Record(record) => records.push(record),
            Normalized::Skipped(_) => stats.skipped += 1,
        }
    }

    stats.written = records.len();
    (records, stats)
}

/// Read the raw corpus at `source`, normalize it, and write flat records to
/// `destination`.
pub fn preprocess(source: &Path, destination: &Path) -> crate::error::Result<PreprocessStats> {
    tracing::info!(source = %source.display(), "starting preprocessing");

    let items = load_corpus(source)?;
    let (records, stats) = normalize_all(items);
    write_records(destination, &records)?;

    tracing::info!(
        total = stats.total,
        written = stats.written,
        skipped = stats.skipped,
        destination = %destination.display(),
        "preprocessing complete"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const CORPUS: &str = indoc! {r#"
        [
          {
            "question": {"questionid": 101, "questiontext": "What is X?"},
            "option": [
              {"answerid": 10, "optiontext": "A", "answerstatus": "Incorrect"},
              {"answerid": 11, "optiontext": "Y", "answerstatus": "Correct"}
            ],
            "tag": [
              {"tagid": 1, "tagname": "Domain: Cardiology"},
              {"tagid": 2, "tagname": "Type: MCQ"},
              {"tagid": 3, "tagname": "Random"}
            ]
          },
          {"question": {"questionid": 102, "questiontext": ""}},
          {"question": {"questiontext": "Orphan"}},
          {"option": []},
          "not a question",
          {"question": {"questionid": "Q-7", "questiontext": "Why?"}, "tag": null}
        ]
    "#};

    #[test]
    fn preprocess_writes_records_and_counts_skips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("raw.json");
        let destination = dir.path().join("processed").join("records.jsonl");
        std::fs::write(&source, CORPUS).expect("write corpus");

        let stats = preprocess(&source, &destination).expect("preprocess");
        assert_eq!(
            stats,
            PreprocessStats {
                total: 6,
                written: 2,
                skipped: 4,
            }
        );

        let records = read_records(&destination).expect("reload");
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.question_id, RawId::Integer(101));
        assert_eq!(first.correct_option_id, Some(RawId::Integer(11)));
        assert_eq!(first.domain.as_deref(), Some("Cardiology"));
        assert_eq!(first.question_type.as_deref(), Some("MCQ"));
        assert_eq!(
            first.tag_ids,
            vec![RawId::Integer(1), RawId::Integer(2), RawId::Integer(3)]
        );
        assert_eq!(
            first.content,
            "Question: What is X?. Correct answer: Y. Tags: Domain: Cardiology, Type: MCQ, Random."
        );

        let second = &records[1];
        assert_eq!(second.question_id, RawId::Text("Q-7".into()));
        assert_eq!(second.correct_option_id, None);
        assert!(second.tag_ids.is_empty());
        assert_eq!(second.content, "Question: Why?. Correct answer: . Tags: .");
    }

    #[test]
    fn off_type_fields_do_not_drop_the_question() {
        let items = vec![serde_json::json!({
            "question": {"questionid": 18446744073709551615u64, "questiontext": "Which lead?"},
            "option": [{"answerid": 4, "optiontext": 7, "answerstatus": "Correct"}],
            "tag": [
                {"tagid": 1.0, "tagname": "Domain: Cardiology"},
                {"tagid": true, "tagname": "Type: MCQ"}
            ]
        })];

        let (records, stats) = normalize_all(items);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.skipped, 0);

        let record = &records[0];
        assert_eq!(record.question_id, RawId::Unsigned(u64::MAX));
        assert_eq!(record.entry_id(), "18446744073709551615");
        assert_eq!(record.correct_option_id, Some(RawId::Integer(4)));
        assert_eq!(record.domain.as_deref(), Some("Cardiology"));
        assert_eq!(record.tag_ids.len(), 2);
        assert_eq!(
            record.content,
            "Question: Which lead?. Correct answer: 7. Tags: Domain: Cardiology, Type: MCQ."
        );
    }

    #[test]
    fn preprocess_fails_before_writing_on_missing_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("records.jsonl");

        let result = preprocess(&dir.path().join("raw.json"), &destination);
        assert!(result.is_err());
        assert!(!destination.exists());
    }
}
