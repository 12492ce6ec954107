//! `caselink inspect` / `caselink validate` — case-free front-end over the
//! export parsers: parse everything a run config names and report what it
//! contains, without touching any review case.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use caselink_engine::config::{FileEntry, RunConfig};
use caselink_engine::model::Xref;
use caselink_io::{mbox, source_for};

use crate::exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_PARSE_ERRORS};
use crate::CliError;

#[derive(Debug, Serialize)]
pub struct InspectFile {
    pub path: String,
    pub records: usize,
    pub errors: usize,
    pub failed: bool,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub name: String,
    pub records: usize,
    pub parse_errors: usize,
    pub files: Vec<InspectFile>,
    /// Label -> number of records carrying it.
    pub labels: BTreeMap<String, usize>,
    pub distinct_field_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xref_messages: Option<usize>,
}

fn cli_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError {
        code,
        message: msg.into(),
    }
}

fn load_config(config_path: &Path) -> Result<RunConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| cli_err(EXIT_ERROR, format!("cannot read config: {e}")))?;
    RunConfig::from_toml(&config_str).map_err(|e| cli_err(EXIT_INVALID_CONFIG, e.to_string()))
}

/// Resolve a configured path relative to the config file's directory.
fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

pub fn cmd_inspect(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."));

    let xref: Option<Xref> = match config.mbox_path {
        Some(ref mbox_path) => mbox::build_xref(
            &resolve(base_dir, mbox_path),
            config.data_predates_header_enrichment,
        )
        .map_err(|e| cli_err(EXIT_ERROR, e.to_string()))?,
        None => None,
    };

    let mut report = InspectReport {
        name: config.name.clone(),
        records: 0,
        parse_errors: 0,
        files: Vec::new(),
        labels: BTreeMap::new(),
        distinct_field_names: Vec::new(),
        xref_messages: xref.as_ref().map(|x| x.len()),
    };
    let mut field_names = std::collections::BTreeSet::new();

    for entry in &config.files {
        let entry = FileEntry {
            path: resolve(base_dir, &entry.path),
            format: entry.format,
        };
        let source = source_for(&entry, &config);
        let path = source.path.display().to_string();

        let mut records = 0usize;
        let mut errors = 0usize;
        let mut failed = false;

        for item in source.records {
            match item {
                Ok(mut record) => {
                    records += 1;
                    if let Some(ref xref) = xref {
                        xref.enrich(&mut record);
                    }
                    for label in &record.labels {
                        *report.labels.entry(label.clone()).or_insert(0) += 1;
                    }
                    for field in &record.fields {
                        field_names.insert(field.name.clone());
                    }
                }
                Err(err) => {
                    errors += 1;
                    eprintln!("  {err}");
                    if err.is_file_fatal() {
                        failed = true;
                        break;
                    }
                }
            }
        }

        report.records += records;
        report.parse_errors += errors;
        report.files.push(InspectFile {
            path,
            records,
            errors,
            failed,
        });
    }

    report.distinct_field_names = field_names.into_iter().collect();

    // Output
    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| cli_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| cli_err(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    eprintln!(
        "{} record(s) from {} file(s) — {} parse error(s), {} distinct label(s)",
        report.records,
        report.files.len(),
        report.parse_errors,
        report.labels.len(),
    );
    if let Some(messages) = report.xref_messages {
        eprintln!("mbox cross-reference: {messages} message(s) indexed");
    }
    if !report.distinct_field_names.is_empty() {
        eprintln!("distinct field names:");
        for name in &report.distinct_field_names {
            eprintln!("  {name}");
        }
    }

    if report.parse_errors > 0 {
        return Err(cli_err(EXIT_PARSE_ERRORS, "parse errors found"));
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: '{}' with {} file(s), tag prefix '{}'",
        config.name,
        config.files.len(),
        config.tag_prefix,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn inspect_reports_clean_export() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("messages.csv"),
            "Rfc822MessageId,Labels,Subject\n<one@example.com>,Inbox,Hello\n",
        )
        .unwrap();
        let config_path = dir.path().join("run.toml");
        fs::write(
            &config_path,
            r#"
[[files]]
path = "messages.csv"
format = "csv"
"#,
        )
        .unwrap();

        // relative export paths resolve against the config's directory
        assert!(cmd_inspect(config_path, false, None).is_ok());
    }

    #[test]
    fn inspect_flags_parse_errors() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("messages.csv"),
            "Rfc822MessageId,Labels,Subject\n,Inbox,Hello\n",
        )
        .unwrap();
        let config_path = dir.path().join("run.toml");
        fs::write(
            &config_path,
            r#"
[[files]]
path = "messages.csv"
format = "csv"
"#,
        )
        .unwrap();

        let err = cmd_inspect(config_path, false, None).unwrap_err();
        assert_eq!(err.code, EXIT_PARSE_ERRORS);
    }

    #[test]
    fn invalid_config_has_its_own_exit_code() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("run.toml");
        fs::write(&config_path, "files = []").unwrap();

        let err = cmd_validate(config_path).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
    }

    #[test]
    fn unreadable_config_is_general_error() {
        let err = cmd_validate(PathBuf::from("/no/such/run.toml")).unwrap_err();
        assert_eq!(err.code, EXIT_ERROR);
    }
}
