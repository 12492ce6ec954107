use std::collections::BTreeSet;
use std::time::Instant;

use crate::annotate;
use crate::case::{BulkAnnotator, CaseSearch};
use crate::config::RunConfig;
use crate::matcher;
use crate::model::{
    FileReport, MatchOutcome, MatchStatus, RecordSource, RunResult, RunSummary, Xref,
};
use crate::progress::{CancelToken, ProgressEvent, ProgressSink};
use crate::stats::RunStats;

/// Run one reconciliation: stream records out of every source in caller
/// order, resolve each against the case, then tag and annotate the matched
/// items in batches.
///
/// Strictly sequential; every failure short of a caller-level precondition
/// is absorbed into the counters so a batch with a few bad files still
/// completes. The caller keeps ownership of the collaborators.
pub fn run(
    config: &RunConfig,
    sources: Vec<RecordSource>,
    xref: Option<&Xref>,
    search: &dyn CaseSearch,
    annotator: &mut dyn BulkAnnotator,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
) -> RunResult {
    let start = Instant::now();
    let mut stats = RunStats::default();
    let mut field_names: BTreeSet<String> = BTreeSet::new();
    let mut matched: Vec<MatchOutcome> = Vec::new();
    let mut reports: Vec<FileReport> = Vec::new();
    let mut records_parsed = 0usize;

    for source in sources {
        if cancel.is_cancelled() {
            break;
        }
        let path = source.path.display().to_string();
        progress.emit(ProgressEvent::FileStarted { path: path.clone() });

        let mut count = 0usize;
        let mut failure: Option<String> = None;

        for item in source.records {
            match item {
                Ok(mut record) => {
                    count += 1;
                    records_parsed += 1;
                    if let Some(xref) = xref {
                        xref.enrich(&mut record);
                    }
                    for field in &record.fields {
                        field_names.insert(field.name.clone());
                    }
                    match matcher::match_record(record, search) {
                        Ok(outcome) => match outcome.status {
                            MatchStatus::Matched => {
                                stats.matches += 1;
                                matched.push(outcome);
                            }
                            MatchStatus::NoMatch => {
                                stats.warnings += 1;
                                progress.emit(ProgressEvent::NoMatch {
                                    identifier: outcome.record.identifier.clone(),
                                });
                            }
                        },
                        Err(err) => {
                            stats.errors += 1;
                            progress.emit(ProgressEvent::Message(err.to_string()));
                        }
                    }
                }
                Err(err) if err.is_file_fatal() => {
                    stats.errors += 1;
                    let message = err.to_string();
                    progress.emit(ProgressEvent::FileFailed {
                        path: path.clone(),
                        message: message.clone(),
                    });
                    failure = Some(message);
                    progress.emit(ProgressEvent::Counts {
                        errors: stats.errors,
                        warnings: stats.warnings,
                        matches: stats.matches,
                    });
                    break;
                }
                Err(err) => {
                    stats.errors += 1;
                    progress.emit(ProgressEvent::Message(err.to_string()));
                }
            }
            progress.emit(ProgressEvent::Counts {
                errors: stats.errors,
                warnings: stats.warnings,
                matches: stats.matches,
            });
            if cancel.is_cancelled() {
                break;
            }
        }

        progress.emit(ProgressEvent::FileFinished {
            path: path.clone(),
            records: count,
        });
        reports.push(FileReport {
            path,
            records: count,
            failed: failure.is_some(),
            message: failure,
        });
    }

    if !cancel.is_cancelled() {
        annotate::annotate(&matched, config, annotator, &mut stats, progress, cancel);
    }

    let query = build_query_expression(&matched);
    RunResult {
        summary: RunSummary {
            errors: stats.errors,
            warnings: stats.warnings,
            matches: stats.matches,
            records_parsed,
            elapsed_ms: start.elapsed().as_millis() as u64,
            distinct_field_names: field_names.into_iter().collect(),
        },
        query,
        files: reports,
    }
}

/// OR-list of matched item identifiers, for the caller to open as a
/// review result set. Empty when nothing matched.
pub fn build_query_expression(outcomes: &[MatchOutcome]) -> String {
    let guids: BTreeSet<&str> = outcomes
        .iter()
        .filter(|o| o.status == MatchStatus::Matched)
        .flat_map(|o| o.items.iter().map(|item| item.0.as_str()))
        .collect();
    if guids.is_empty() {
        return String::new();
    }
    let joined: Vec<&str> = guids.into_iter().collect();
    format!("guid:({})", joined.join(" OR "))
}
