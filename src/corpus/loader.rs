//! Reads the raw question corpus.

use crate::corpus::models::RawQuestion;
use crate::error::{CorpusError, Result};
use serde::de::Error as _;
use serde_json::Value;
use std::path::Path;

/// Load the corpus root and check it is a list.
///
/// Items are returned undecoded so one malformed question cannot fail the
/// whole file; see [`decode_question`].
pub fn load_corpus(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        return Err(CorpusError::MissingSource {
            path: path.to_path_buf(),
        }
        .into());
    }

    let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: Value = serde_json::from_str(&raw).map_err(|source| CorpusError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match root {
        Value::Array(items) => Ok(items),
        other => Err(CorpusError::MalformedRoot {
            path: path.to_path_buf(),
            found: json_kind(&other),
        }
        .into()),
    }
}

/// Decode one corpus item.
///
/// Fails only when the item or its `question` block is not an object;
/// every other field degrades to absent. The error names the offending
/// shape so the caller can report it with the skip.
pub fn decode_question(value: Value) -> std::result::Result<RawQuestion, serde_json::Error> {
    let block = match &value {
        Value::Object(fields) => fields.get("question"),
        other => {
            return Err(serde_json::Error::custom(format!(
                "expected a question object, found {}",
                json_kind(other)
            )));
        }
    };
    match block {
        None | Some(Value::Null | Value::Object(_)) => {}
        Some(other) => {
            return Err(serde_json::Error::custom(format!(
                "expected `question` to be an object, found {}",
                json_kind(other)
            )));
        }
    }

    serde_json::from_value(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
