// CSV export import
//
// Flat per-message exports: one row per message, an identifier column and
// a delimited labels column; every remaining column rides along as typed
// custom metadata.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use caselink_engine::config::CsvColumns;
use caselink_engine::model::{Field, FieldKind, Record};
use caselink_engine::EngineError;

use crate::split_labels;

/// Lazy record stream over one CSV export file.
///
/// Each row yields one record. A malformed row (wrong field count, empty
/// identifier) is a recoverable record-level error; the stream continues
/// with the next row.
pub struct CsvRecords {
    rows: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
    headers: Vec<String>,
    identifier_idx: usize,
    labels_idx: usize,
    label_delimiter: char,
    date_time_fields: Vec<String>,
    path: PathBuf,
}

impl std::fmt::Debug for CsvRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvRecords")
            .field("headers", &self.headers)
            .field("identifier_idx", &self.identifier_idx)
            .field("labels_idx", &self.labels_idx)
            .field("label_delimiter", &self.label_delimiter)
            .field("date_time_fields", &self.date_time_fields)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CsvRecords {
    pub fn open(path: &Path, columns: &CsvColumns) -> Result<Self, EngineError> {
        let content = read_file_as_utf8(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(Cursor::new(content.into_bytes()));

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| EngineError::FileParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let idx = |name: &str| -> Result<usize, EngineError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| EngineError::MissingColumn {
                    path: path.display().to_string(),
                    column: name.into(),
                })
        };

        let identifier_idx = idx(&columns.identifier)?;
        let labels_idx = idx(&columns.labels)?;

        Ok(Self {
            rows: reader.into_records(),
            headers,
            identifier_idx,
            labels_idx,
            label_delimiter: columns.label_delimiter,
            date_time_fields: columns.date_time_fields.clone(),
            path: path.to_path_buf(),
        })
    }

    fn row_error(&self, message: String) -> EngineError {
        EngineError::RecordParse {
            path: self.path.display().to_string(),
            message,
        }
    }

    fn build_record(&self, row: &csv::StringRecord) -> Result<Record, EngineError> {
        let identifier = row.get(self.identifier_idx).unwrap_or("").trim();
        if identifier.is_empty() {
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            return Err(self.row_error(format!("line {line}: empty identifier column")));
        }

        let mut record = Record {
            identifier: identifier.to_string(),
            labels: split_labels(
                row.get(self.labels_idx).unwrap_or(""),
                self.label_delimiter,
            )
            .collect(),
            fields: Vec::new(),
        };

        for (i, header) in self.headers.iter().enumerate() {
            if i == self.identifier_idx || i == self.labels_idx {
                continue;
            }
            let value = row.get(i).unwrap_or("");
            if value.is_empty() {
                continue;
            }
            let kind = if self.date_time_fields.iter().any(|f| f == header) {
                FieldKind::DateTime
            } else {
                FieldKind::Text
            };
            record.fields.push(Field {
                name: header.clone(),
                kind,
                raw_value: value.to_string(),
            });
        }

        Ok(record)
    }
}

impl Iterator for CsvRecords {
    type Item = Result<Record, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rows.next()? {
            Ok(row) => Some(self.build_record(&row)),
            Err(e) => Some(Err(self.row_error(e.to_string()))),
        }
    }
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252 exports).
pub fn read_file_as_utf8(path: &Path) -> Result<String, EngineError> {
    let mut file = std::fs::File::open(path).map_err(|e| EngineError::FileParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| EngineError::FileParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}
