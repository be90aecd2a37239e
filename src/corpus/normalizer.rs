//! Turns raw questions into flat records.
//!
//! Everything here is a pure function of its input apart from diagnostic
//! events. Ambiguities in the tag taxonomy resolve to `None` rather than
//! errors; the only gate is a present question id and text.

use crate::corpus::models::{
    FlatRecord, Normalized, RawId, RawOption, RawQuestion, RawTag, SkipReason, TagFields,
};

/// Option status marking the correct answer. Compared case-sensitively.
const CORRECT_STATUS: &str = "Correct";

/// Semantic field a tag can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Domain,
    CompetencyName,
    CompetencyArea,
    CompetencyDefinition,
    Type,
}

impl TagField {
    /// Fields in classification priority order.
    pub const PRIORITY: [TagField; 5] = [
        TagField::Domain,
        TagField::CompetencyName,
        TagField::CompetencyArea,
        TagField::CompetencyDefinition,
        TagField::Type,
    ];

    /// Lowercase prefix searched for in the tag name.
    pub fn prefix(&self) -> &'static str {
        match self {
            TagField::Domain => "domain:",
            TagField::CompetencyName => "competency name:",
            TagField::CompetencyArea => "competency area:",
            TagField::CompetencyDefinition => "competency definition:",
            TagField::Type => "type:",
        }
    }

    /// First field whose prefix occurs anywhere in `name`, ignoring case.
    pub fn classify(name: &str) -> Option<TagField> {
        let lowered = name.to_lowercase();
        Self::PRIORITY
            .into_iter()
            .find(|field| lowered.contains(field.prefix()))
    }

    fn slot<'a>(&self, fields: &'a mut TagFields) -> &'a mut Option<String> {
        match self {
            TagField::Domain => &mut fields.domain,
            TagField::CompetencyName => &mut fields.competency_name,
            TagField::CompetencyArea => &mut fields.competency_area,
            TagField::CompetencyDefinition => &mut fields.competency_definition,
            TagField::Type => &mut fields.question_type,
        }
    }
}

/// Id and text of the first option marked correct, or `(None, "")`.
pub fn extract_correct_option(options: &[RawOption]) -> (Option<RawId>, String) {
    options
        .iter()
        .find(|option| option.status.as_deref() == Some(CORRECT_STATUS))
        .map(|option| (option.id.clone(), option.text.clone().unwrap_or_default()))
        .unwrap_or((None, String::new()))
}

/// Collect every tag id in order and fill the five semantic fields.
///
/// The field value is whatever follows the first colon of the tag name,
/// trimmed. A later tag for the same field replaces the earlier value.
pub fn extract_tag_fields(tags: &[RawTag]) -> TagFields {
    let mut fields = TagFields::default();

    for tag in tags {
        if let Some(id) = &tag.id {
            fields.tag_ids.push(id.clone());
        }

        let name = tag.name.as_deref().unwrap_or_default();
        let Some(field) = TagField::classify(name) else {
            continue;
        };
        // The classified prefix always contains a colon.
        let value = name
            .split_once(':')
            .map(|(_, rest)| rest.trim().to_string())
            .unwrap_or_default();

        let slot = field.slot(&mut fields);
        if let Some(previous) = slot.as_deref() {
            tracing::debug!(
                field = field.prefix(),
                previous,
                replacement = %value,
                "duplicate tag prefix, keeping the later value"
            );
        }
        *slot = Some(value);
    }

    fields
}

/// Text that gets embedded for a question.
///
/// The exact shape matters: changing it silently moves previously indexed
/// questions in embedding space.
pub fn build_content(question_text: &str, correct_answer: &str, tags: &[RawTag]) -> String {
    let tag_text = tags
        .iter()
        .map(|tag| tag.name.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ");

    format!("Question: {question_text}. Correct answer: {correct_answer}. Tags: {tag_text}.")
}

/// Normalize one raw question, or report why it was skipped.
pub fn normalize(raw: &RawQuestion) -> Normalized {
    let question_id = match raw.question.id.as_ref() {
        Some(id) if !id.is_empty() => id.clone(),
        _ => return skip(SkipReason::MissingId, None),
    };
    let question_text = match raw.question.text.as_deref() {
        Some(text) if !text.is_empty() => text,
        _ => return skip(SkipReason::MissingText, Some(&question_id)),
    };

    let (correct_option_id, correct_text) = extract_correct_option(&raw.options);
    let tag_fields = extract_tag_fields(&raw.tags);

    Normalized::Record(FlatRecord {
        content: build_content(question_text, &correct_text, &raw.tags),
        question_id,
        correct_option_id,
        tag_ids: tag_fields.tag_ids,
        domain: tag_fields.domain,
        competency_name: tag_fields.competency_name,
        competency_area: tag_fields.competency_area,
        competency_definition: tag_fields.competency_definition,
        question_type: tag_fields.question_type,
    })
}

pub(crate) fn skip(reason: SkipReason, question_id: Option<&RawId>) -> Normalized {
    match question_id {
        Some(id) => tracing::warn!(question_id = %id, %reason, "skipping question"),
        None => tracing::warn!(%reason, "skipping question"),
    }
    Normalized::Skipped(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::models::RawQuestionBlock;

    fn tag(id: i64, name: &str) -> RawTag {
        RawTag {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    fn option(id: i64, text: &str, status: &str) -> RawOption {
        RawOption {
            id: Some(id.into()),
            text: Some(text.into()),
            status: Some(status.into()),
        }
    }

    fn question(id: Option<RawId>, text: Option<&str>) -> RawQuestion {
        RawQuestion {
            question: RawQuestionBlock {
                id,
                text: text.map(str::to_string),
            },
            options: vec![option(10, "A", "Incorrect"), option(11, "B", "Correct")],
            tags: vec![tag(1, "Domain: Cardiology"), tag(2, "Type: MCQ")],
        }
    }

    #[test]
    fn recognized_prefixes_fill_fields_and_all_ids_are_kept() {
        let fields = extract_tag_fields(&[
            tag(1, "Domain: Cardiology"),
            tag(2, "Type: MCQ"),
            tag(3, "Random"),
        ]);

        assert_eq!(fields.domain.as_deref(), Some("Cardiology"));
        assert_eq!(fields.question_type.as_deref(), Some("MCQ"));
        assert_eq!(fields.competency_name, None);
        assert_eq!(fields.competency_area, None);
        assert_eq!(fields.competency_definition, None);
        assert_eq!(fields.tag_ids, vec![RawId::from(1), RawId::from(2), RawId::from(3)]);
    }

    #[test]
    fn prefix_match_ignores_case_but_keeps_value_casing() {
        let fields = extract_tag_fields(&[
            tag(1, "COMPETENCY NAME:  Clinical Reasoning "),
            tag(2, "competency area: Diagnosis"),
            tag(3, "Competency Definition: Applies ECG criteria: rate, rhythm"),
        ]);

        assert_eq!(fields.competency_name.as_deref(), Some("Clinical Reasoning"));
        assert_eq!(fields.competency_area.as_deref(), Some("Diagnosis"));
        // Only the first colon splits.
        assert_eq!(
            fields.competency_definition.as_deref(),
            Some("Applies ECG criteria: rate, rhythm")
        );
    }

    #[test]
    fn later_duplicate_prefix_wins() {
        let fields = extract_tag_fields(&[
            tag(1, "Domain: Cardiology"),
            tag(2, "Domain: Neurology"),
        ]);
        assert_eq!(fields.domain.as_deref(), Some("Neurology"));
        assert_eq!(fields.tag_ids, vec![RawId::from(1), RawId::from(2)]);
    }

    #[test]
    fn classification_uses_priority_order() {
        // Contains both "domain:" and "type:"; domain is checked first.
        assert_eq!(
            TagField::classify("Sub-type: Domain: Cardio"),
            Some(TagField::Domain)
        );
        assert_eq!(TagField::classify("Question Type: SBA"), Some(TagField::Type));
        assert_eq!(TagField::classify("Domain Cardiology"), None);
    }

    #[test]
    fn tags_without_ids_or_names_are_tolerated() {
        let fields = extract_tag_fields(&[
            RawTag {
                id: None,
                name: Some("Type: MCQ".into()),
            },
            RawTag {
                id: Some("t-9".into()),
                name: None,
            },
        ]);
        assert_eq!(fields.question_type.as_deref(), Some("MCQ"));
        assert_eq!(fields.tag_ids, vec![RawId::Text("t-9".into())]);
    }

    #[test]
    fn correct_option_is_found() {
        let options = [option(10, "A", "Incorrect"), option(11, "B", "Correct")];
        assert_eq!(
            extract_correct_option(&options),
            (Some(11.into()), "B".to_string())
        );
    }

    #[test]
    fn first_correct_option_wins() {
        let options = [option(10, "A", "Correct"), option(11, "B", "Correct")];
        assert_eq!(
            extract_correct_option(&options),
            (Some(10.into()), "A".to_string())
        );
    }

    #[test]
    fn no_correct_option_yields_empty_answer() {
        let options = [option(10, "A", "Incorrect"), option(11, "B", "correct")];
        assert_eq!(extract_correct_option(&options), (None, String::new()));
        assert_eq!(extract_correct_option(&[]), (None, String::new()));
    }

    #[test]
    fn content_template_is_exact() {
        let tags = [tag(1, "Domain: Cardiology"), tag(2, "Type: MCQ")];
        assert_eq!(
            build_content("What is X?", "Y", &tags),
            "Question: What is X?. Correct answer: Y. Tags: Domain: Cardiology, Type: MCQ."
        );
    }

    #[test]
    fn content_with_no_tags_or_answer() {
        assert_eq!(
            build_content("Why?", "", &[]),
            "Question: Why?. Correct answer: . Tags: ."
        );
    }

    #[test]
    fn normalize_builds_full_record() {
        let Normalized::Record(record) = normalize(&question(Some(7.into()), Some("What is X?")))
        else {
            panic!("expected a record");
        };

        assert_eq!(record.question_id, RawId::Integer(7));
        assert_eq!(record.correct_option_id, Some(11.into()));
        assert_eq!(record.domain.as_deref(), Some("Cardiology"));
        assert_eq!(record.question_type.as_deref(), Some("MCQ"));
        assert_eq!(record.tag_ids, vec![RawId::from(1), RawId::from(2)]);
        assert_eq!(
            record.content,
            "Question: What is X?. Correct answer: B. Tags: Domain: Cardiology, Type: MCQ."
        );
    }

    #[test]
    fn normalize_preserves_text_ids() {
        let Normalized::Record(record) = normalize(&question(Some("Q-1".into()), Some("Why?")))
        else {
            panic!("expected a record");
        };
        assert_eq!(record.question_id, RawId::Text("Q-1".into()));
        assert_eq!(record.entry_id(), "Q-1");
    }

    #[test]
    fn normalize_skips_missing_id_or_text() {
        assert_eq!(
            normalize(&question(None, Some("Why?"))),
            Normalized::Skipped(SkipReason::MissingId)
        );
        assert_eq!(
            normalize(&question(Some("".into()), Some("Why?"))),
            Normalized::Skipped(SkipReason::MissingId)
        );
        assert_eq!(
            normalize(&question(Some(3.into()), None)),
            Normalized::Skipped(SkipReason::MissingText)
        );
        assert_eq!(
            normalize(&question(Some(3.into()), Some(""))),
            Normalized::Skipped(SkipReason::MissingText)
        );
    }
}
