use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Declared kind of an exported metadata field. Conversion to a typed value
/// happens at write-time, not parse-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    DateTime,
    Number,
    Boolean,
}

impl FieldKind {
    /// Map an export's declared data-type name onto a kind.
    /// Unknown declarations degrade to `Text` so the raw value survives.
    pub fn from_declared(declared: &str) -> FieldKind {
        match declared.to_ascii_lowercase().as_str() {
            "datetime" => Self::DateTime,
            "integer" | "decimal" | "number" => Self::Number,
            "boolean" => Self::Boolean,
            _ => Self::Text,
        }
    }
}

/// One typed custom-metadata field carried by a record, still raw.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub raw_value: String,
}

/// A single normalized provenance entry from any export format.
#[derive(Debug, Clone)]
pub struct Record {
    /// External file name or message key used to locate the case item.
    pub identifier: String,
    pub labels: BTreeSet<String>,
    pub fields: Vec<Field>,
}

/// A converted field value, ready for the annotation collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    DateTime(DateTime<FixedOffset>),
    Number(f64),
    Boolean(bool),
}

/// A lazily parsed stream of records from one export file.
///
/// The iterator is finite and not restartable. A file-fatal error (see
/// `EngineError::is_file_fatal`) is yielded once, after which the stream
/// ends; record-level errors are yielded inline and the stream continues.
pub struct RecordSource {
    pub path: PathBuf,
    pub records: Box<dyn Iterator<Item = Result<Record, EngineError>>>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Opaque handle to one item in the review case (the host's item GUID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemRef(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Matched,
    NoMatch,
}

/// Result of resolving one record against the case.
/// `status` is `Matched` iff `items` is non-empty.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub record: Record,
    pub items: Vec<ItemRef>,
    pub status: MatchStatus,
}

// ---------------------------------------------------------------------------
// MBOX cross-reference
// ---------------------------------------------------------------------------

/// Per-message association derived from a secondary MBOX scan.
#[derive(Debug, Clone)]
pub struct XrefEntry {
    /// Sequential index within the MBOX (0, 1, 2, ...).
    pub sequence: u64,
    /// Byte offset of the message's `From ` separator line.
    pub offset: u64,
    /// Originating address from the `From:` header.
    pub from_address: String,
    /// Labels from the `X-Gmail-Labels:` header.
    pub labels: BTreeSet<String>,
}

/// Cross-reference keyed by RFC-822 message id, used to complete records
/// from exports captured before the collection tool embedded sender data.
#[derive(Debug, Default)]
pub struct Xref {
    entries: BTreeMap<String, XrefEntry>,
}

impl Xref {
    pub fn insert(&mut self, message_id: String, entry: XrefEntry) {
        self.entries.insert(message_id, entry);
    }

    pub fn get(&self, message_id: &str) -> Option<&XrefEntry> {
        self.entries.get(message_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge cross-reference data into a record whose identifier matches a
    /// message id: union the labels, and supply a `From` field when the
    /// record does not already carry one. Returns whether anything matched.
    pub fn enrich(&self, record: &mut Record) -> bool {
        let key = record
            .identifier
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');
        let Some(entry) = self.entries.get(key) else {
            return false;
        };
        record.labels.extend(entry.labels.iter().cloned());
        let has_from = record
            .fields
            .iter()
            .any(|f| f.name.eq_ignore_ascii_case("from"));
        if !has_from && !entry.from_address.is_empty() {
            record.fields.push(Field {
                name: "From".into(),
                kind: FieldKind::Text,
                raw_value: entry.from_address.clone(),
            });
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Outcome of parsing one export file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub records: usize,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub errors: u64,
    pub warnings: u64,
    pub matches: u64,
    pub records_parsed: usize,
    pub elapsed_ms: u64,
    /// Every distinct field name observed across all parsed records.
    pub distinct_field_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub summary: RunSummary,
    /// Query expression over matched item identifiers, for the caller to
    /// open as a review result set. Empty when nothing matched.
    pub query: String,
    pub files: Vec<FileReport>,
}
