use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (no files, empty tag prefix, etc.).
    ConfigValidation(String),
    /// A mapped column is missing from a CSV header row.
    MissingColumn { path: String, column: String },
    /// Whole file unreadable or malformed. The run skips the file.
    FileParse { path: String, message: String },
    /// One record unparsable. The run skips the record and keeps the file.
    RecordParse { path: String, message: String },
    /// One field value does not convert to its declared kind.
    FieldConvert { field: String, value: String, message: String },
    /// The search collaborator failed for one record.
    Search { identifier: String, message: String },
    /// A tag or custom-metadata write failed.
    Annotate { target: String, message: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { path, column } => {
                write!(f, "{path}: missing column '{column}'")
            }
            Self::FileParse { path, message } => {
                write!(f, "cannot parse file '{path}': {message}")
            }
            Self::RecordParse { path, message } => {
                write!(f, "{path}: skipped record: {message}")
            }
            Self::FieldConvert { field, value, message } => {
                write!(f, "field '{field}': cannot convert '{value}': {message}")
            }
            Self::Search { identifier, message } => {
                write!(f, "search failed for '{identifier}': {message}")
            }
            Self::Annotate { target, message } => {
                write!(f, "annotation failed for '{target}': {message}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// Whether this error invalidates the rest of its source file.
    pub fn is_file_fatal(&self) -> bool {
        matches!(
            self,
            Self::FileParse { .. } | Self::MissingColumn { .. } | Self::Io(_)
        )
    }
}
