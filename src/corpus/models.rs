//! Raw corpus shapes and the flat records produced from them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier as it appears in the source corpus.
///
/// Kept type-preserving so ids survive the intermediate record file
/// unchanged. `Display` is the string form used as the vector entry id.
/// Variant order matters for untagged decoding: integers that fit `i64`
/// stay `Integer`, larger ones become `Unsigned`, and floats land in
/// `Number`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Integer(i64),
    Unsigned(u64),
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
}

impl RawId {
    /// Empty string ids count as absent.
    pub fn is_empty(&self) -> bool {
        matches!(self, RawId::Text(text) if text.is_empty())
    }
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawId::Integer(value) => write!(f, "{value}"),
            RawId::Unsigned(value) => write!(f, "{value}"),
            RawId::Number(value) => write!(f, "{value}"),
            RawId::Text(value) => f.write_str(value),
            RawId::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for RawId {
    fn from(value: i64) -> Self {
        RawId::Integer(value)
    }
}

impl From<&str> for RawId {
    fn from(value: &str) -> Self {
        RawId::Text(value.to_string())
    }
}

/// One question as exported by the question bank.
///
/// Only a non-object `question` block fails decoding. Leaf fields of the
/// wrong JSON type read as absent, and list entries that are not objects
/// are dropped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawQuestion {
    #[serde(deserialize_with = "null_as_default")]
    pub question: RawQuestionBlock,
    #[serde(rename = "option", deserialize_with = "lenient_list")]
    pub options: Vec<RawOption>,
    #[serde(rename = "tag", deserialize_with = "lenient_list")]
    pub tags: Vec<RawTag>,
}

/// The nested `question` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawQuestionBlock {
    #[serde(rename = "questionid", deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(rename = "questiontext", deserialize_with = "lenient_text")]
    pub text: Option<String>,
}

/// One answer option.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOption {
    #[serde(rename = "answerid", deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(rename = "optiontext", deserialize_with = "lenient_text")]
    pub text: Option<String>,
    #[serde(rename = "answerstatus", deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

/// One taxonomy tag, e.g. `{"tagid": 7, "tagname": "Domain: Cardiology"}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTag {
    #[serde(rename = "tagid", deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(rename = "tagname", deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

/// Semantic fields pulled out of a question's tag list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub tag_ids: Vec<RawId>,
    pub domain: Option<String>,
    pub competency_name: Option<String>,
    pub competency_area: Option<String>,
    pub competency_definition: Option<String>,
    pub question_type: Option<String>,
}

/// A normalized question, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub question_id: RawId,
    /// Text submitted to the embedding model.
    pub content: String,
    pub correct_option_id: Option<RawId>,
    pub tag_ids: Vec<RawId>,
    pub domain: Option<String>,
    pub competency_name: Option<String>,
    pub competency_area: Option<String>,
    pub competency_definition: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
}

impl FlatRecord {
    /// Id of the vector entry this record maps to.
    pub fn entry_id(&self) -> String {
        self.question_id.to_string()
    }
}

/// Why a raw question was left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    MissingText,
    /// The item could not be decoded into the expected nested shape.
    Undecodable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::MissingId => "missing question id",
            SkipReason::MissingText => "missing question text",
            SkipReason::Undecodable => "undecodable question shape",
        };
        f.write_str(reason)
    }
}

/// Outcome of normalizing one raw question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Record(FlatRecord),
    Skipped(SkipReason),
}

/// `null` decodes to the type's default instead of failing the item.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A value of the wrong JSON type decodes to `None` instead of failing the item.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Strings as-is, other scalars in their JSON text form, anything else `None`.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

/// Non-list values read as empty; entries that are not objects are dropped.
fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_question_tolerates_missing_and_null_fields() {
        let value = serde_json::json!({
            "question": {"questionid": 42, "extra": true},
            "option": null,
        });
        let raw: RawQuestion = serde_json::from_value(value).expect("decode");
        assert_eq!(raw.question.id, Some(RawId::Integer(42)));
        assert_eq!(raw.question.text, None);
        assert!(raw.options.is_empty());
        assert!(raw.tags.is_empty());
    }

    #[test]
    fn ids_keep_their_json_type() {
        let numeric: RawId = serde_json::from_str("9007199254740993").expect("decode");
        assert_eq!(numeric, RawId::Integer(9_007_199_254_740_993));
        assert_eq!(numeric.to_string(), "9007199254740993");

        let text: RawId = serde_json::from_str("\"Q-17\"").expect("decode");
        assert_eq!(text, RawId::Text("Q-17".into()));
        assert_eq!(serde_json::to_string(&text).expect("encode"), "\"Q-17\"");
    }

    #[test]
    fn off_type_leaf_fields_read_as_absent_or_text() {
        let value = serde_json::json!({
            "question": {"questionid": 18446744073709551615u64, "questiontext": 12},
            "option": [
                {"answerid": 1.5, "optiontext": 7, "answerstatus": "Correct"},
                "stray",
                {"answerid": [1], "optiontext": {"nested": true}}
            ],
            "tag": [
                {"tagid": 1.0, "tagname": "Domain: Cardiology"},
                {"tagid": true, "tagname": false},
                {"tagid": {"x": 1}, "tagname": "Type: MCQ"}
            ],
        });
        let raw: RawQuestion = serde_json::from_value(value).expect("decode");

        assert_eq!(raw.question.id, Some(RawId::Unsigned(u64::MAX)));
        assert_eq!(raw.question.text.as_deref(), Some("12"));

        assert_eq!(raw.options.len(), 2);
        assert_eq!(raw.options[0].text.as_deref(), Some("7"));
        assert_eq!(raw.options[0].id.as_ref().map(ToString::to_string).as_deref(), Some("1.5"));
        assert_eq!(raw.options[1].id, None);
        assert_eq!(raw.options[1].text, None);

        let tag_ids: Vec<Option<String>> = raw
            .tags
            .iter()
            .map(|tag| tag.id.as_ref().map(ToString::to_string))
            .collect();
        assert_eq!(tag_ids, vec![Some("1.0".into()), Some("true".into()), None]);
        assert_eq!(raw.tags[1].name.as_deref(), Some("false"));
    }

    #[test]
    fn non_list_option_and_tag_fields_read_as_empty() {
        let value = serde_json::json!({
            "question": {"questionid": 3, "questiontext": "Why?"},
            "option": {"answerid": 1},
            "tag": "Domain: Cardiology",
        });
        let raw: RawQuestion = serde_json::from_value(value).expect("decode");
        assert!(raw.options.is_empty());
        assert!(raw.tags.is_empty());
    }

    #[test]
    fn wide_and_float_ids_keep_their_form_through_json() {
        for text in ["18446744073709551615", "-3", "2.5", "true"] {
            let id: RawId = serde_json::from_str(text).expect("decode");
            assert_eq!(id.to_string(), text);
            assert_eq!(serde_json::to_string(&id).expect("encode"), text);
            let again: RawId = serde_json::from_str(&serde_json::to_string(&id).expect("encode"))
                .expect("decode again");
            assert_eq!(again, id);
        }
    }

    #[test]
    fn flat_record_serializes_type_field_name() {
        let record = FlatRecord {
            question_id: 1.into(),
            content: "c".into(),
            correct_option_id: None,
            tag_ids: vec![],
            domain: None,
            competency_name: None,
            competency_area: None,
            competency_definition: None,
            question_type: Some("MCQ".into()),
        };
        let json = serde_json::to_value(&record).expect("encode");
        assert_eq!(json["type"], "MCQ");
        assert!(json["domain"].is_null());
    }
}
