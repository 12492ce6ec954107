//! `caselink-io` — export-file parsing.
//!
//! Turns heterogeneous export files (nested XML documents, flat CSV rows,
//! MBOX cross-reference) into lazy streams over the engine's record model.

pub mod csv;
pub mod mbox;
pub mod xml;

use caselink_engine::config::{ExportFormat, FileEntry, RunConfig};
use caselink_engine::model::{Record, RecordSource};
use caselink_engine::EngineError;

/// Open one configured export file as a record source.
///
/// Open failures are not surfaced here; they become the source's first
/// (and only) item, so the pipeline can fold them into its per-file
/// report like any other file-level failure.
pub fn source_for(entry: &FileEntry, config: &RunConfig) -> RecordSource {
    let records: Box<dyn Iterator<Item = Result<Record, EngineError>>> = match entry.format {
        ExportFormat::Xml => match xml::XmlRecords::open(&entry.path, &config.labels_field) {
            Ok(records) => Box::new(records),
            Err(err) => Box::new(std::iter::once(Err(err))),
        },
        ExportFormat::Csv => match csv::CsvRecords::open(&entry.path, &config.csv) {
            Ok(records) => Box::new(records),
            Err(err) => Box::new(std::iter::once(Err(err))),
        },
    };
    RecordSource {
        path: entry.path.clone(),
        records,
    }
}

/// Open every configured export file, in config order.
pub fn open_sources(config: &RunConfig) -> Vec<RecordSource> {
    config
        .files
        .iter()
        .map(|entry| source_for(entry, config))
        .collect()
}

/// Split a delimited label list, dropping surrounding whitespace and
/// empty entries.
pub(crate) fn split_labels(raw: &str, delimiter: char) -> impl Iterator<Item = String> + '_ {
    raw.split(delimiter)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}
