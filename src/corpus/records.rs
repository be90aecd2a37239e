//! Intermediate flat record file, one JSON object per line.
//!
//! Lets indexing be re-run without re-parsing the raw corpus. Ids are written
//! in their original JSON type so they reload unchanged.

use crate::corpus::models::FlatRecord;
use crate::error::{CorpusError, RecordStoreError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Write `records` to `path`, creating the parent directory if needed.
pub fn write_records(path: &Path, records: &[FlatRecord]) -> Result<()> {
    let io_error = |source| RecordStoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record).map_err(|source| {
            RecordStoreError::Encode {
                question_id: record.entry_id(),
                source,
            }
        })?;
        writer.write_all(b"\n").map_err(io_error)?;
    }
    writer.flush().map_err(io_error)?;

    Ok(())
}

/// Reload records written by [`write_records`]. Blank lines are ignored.
pub fn read_records(path: &Path) -> Result<Vec<FlatRecord>> {
    if !path.exists() {
        return Err(CorpusError::MissingSource {
            path: path.to_path_buf(),
        }
        .into());
    }

    let io_error = |source| RecordStoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_error)?);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| RecordStoreError::Decode {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}
