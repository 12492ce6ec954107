use std::path::PathBuf;

use serde::Deserialize;

use crate::convert::DEFAULT_DATE_TIME_FORMAT;
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One reconciliation run, as supplied by the embedding UI layer.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub name: String,
    /// Apply each record label as a case tag.
    #[serde(default = "default_true")]
    pub apply_label_tags: bool,
    /// Prepended to every label to form the final tag, `<prefix>|<label>`.
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,
    #[serde(default)]
    pub copy_tags_to_descendants: bool,
    #[serde(default)]
    pub copy_custom_metadata_to_descendants: bool,
    /// Set when the collection predates header enrichment; requires
    /// `mbox_path` so the cross-reference can be built.
    #[serde(default)]
    pub data_predates_header_enrichment: bool,
    #[serde(default)]
    pub mbox_path: Option<PathBuf>,
    /// chrono pattern for date-time field values.
    #[serde(default = "default_date_time_format")]
    pub date_time_format: String,
    /// Field name that carries the label list in XML exports.
    #[serde(default = "default_labels_field")]
    pub labels_field: String,
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub csv: CsvColumns,
}

// ---------------------------------------------------------------------------
// Input files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Format is always caller-specified; there is no auto-detection.
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Xml,
    Csv,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xml => write!(f, "xml"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV column mapping
// ---------------------------------------------------------------------------

/// Column mapping for flat per-message exports. Defaults fit the mail
/// export shape (`Rfc822MessageId` + comma-separated `Labels`).
#[derive(Debug, Clone, Deserialize)]
pub struct CsvColumns {
    #[serde(default = "default_identifier_column")]
    pub identifier: String,
    #[serde(default = "default_labels_column")]
    pub labels: String,
    /// Delimiter between labels inside the labels column.
    #[serde(default = "default_label_delimiter")]
    pub label_delimiter: char,
    /// Columns whose values are date-times rather than plain text.
    #[serde(default = "default_date_time_fields")]
    pub date_time_fields: Vec<String>,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            identifier: default_identifier_column(),
            labels: default_labels_column(),
            label_delimiter: default_label_delimiter(),
            date_time_fields: default_date_time_fields(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_tag_prefix() -> String {
    "Labels".into()
}

fn default_date_time_format() -> String {
    DEFAULT_DATE_TIME_FORMAT.into()
}

fn default_labels_field() -> String {
    "Labels".into()
}

fn default_identifier_column() -> String {
    "Rfc822MessageId".into()
}

fn default_labels_column() -> String {
    "Labels".into()
}

fn default_label_delimiter() -> char {
    ','
}

fn default_date_time_fields() -> Vec<String> {
    vec!["DateSent".into(), "DateReceived".into()]
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.files.is_empty() {
            return Err(EngineError::ConfigValidation(
                "at least one input file is required".into(),
            ));
        }

        if self.apply_label_tags && self.tag_prefix.is_empty() {
            return Err(EngineError::ConfigValidation(
                "tag_prefix must not be empty when apply_label_tags is set".into(),
            ));
        }

        if self.data_predates_header_enrichment && self.mbox_path.is_none() {
            return Err(EngineError::ConfigValidation(
                "mbox_path is required when data_predates_header_enrichment is set".into(),
            ));
        }

        if self.date_time_format.is_empty() {
            return Err(EngineError::ConfigValidation(
                "date_time_format must not be empty".into(),
            ));
        }

        if self.csv.identifier.is_empty() || self.csv.labels.is_empty() {
            return Err(EngineError::ConfigValidation(
                "csv identifier and labels columns must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
