use std::collections::{BTreeMap, BTreeSet};

use crate::case::BulkAnnotator;
use crate::config::RunConfig;
use crate::convert;
use crate::error::EngineError;
use crate::model::{ItemRef, MatchOutcome, MatchStatus};
use crate::progress::{CancelToken, ProgressEvent, ProgressSink};
use crate::stats::RunStats;

/// Fold every matched outcome into label groups across the whole batch.
/// An item appears in as many groups as its record carries labels.
pub fn group_by_label(outcomes: &[MatchOutcome]) -> BTreeMap<String, BTreeSet<ItemRef>> {
    let mut groups: BTreeMap<String, BTreeSet<ItemRef>> = BTreeMap::new();
    for outcome in outcomes {
        if outcome.status != MatchStatus::Matched {
            continue;
        }
        for label in &outcome.record.labels {
            groups
                .entry(label.clone())
                .or_default()
                .extend(outcome.items.iter().cloned());
        }
    }
    groups
}

/// Apply labels as tags and write custom metadata onto matched items.
///
/// Grouping happens across the entire batch before any write is issued, so
/// each distinct label costs exactly one bulk tag call however many records
/// carry it. Metadata is written per record because field values vary by
/// record; every matched item of a record receives its fields.
pub fn annotate(
    outcomes: &[MatchOutcome],
    config: &RunConfig,
    annotator: &mut dyn BulkAnnotator,
    stats: &mut RunStats,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
) {
    let groups = group_by_label(outcomes);

    if config.apply_label_tags {
        for (label, items) in &groups {
            if cancel.is_cancelled() {
                return;
            }
            let tag = format!("{}|{}", config.tag_prefix, label);
            let items: Vec<ItemRef> = items.iter().cloned().collect();
            match annotator.add_tag(&tag, &items, config.copy_tags_to_descendants) {
                Ok(()) => progress.emit(ProgressEvent::TagApplied {
                    tag,
                    items: items.len(),
                }),
                Err(message) => {
                    // partial completion is still useful: keep going
                    stats.errors += 1;
                    let err = EngineError::Annotate {
                        target: tag,
                        message,
                    };
                    progress.emit(ProgressEvent::Message(err.to_string()));
                }
            }
        }
    }

    for outcome in outcomes {
        if cancel.is_cancelled() {
            return;
        }
        if outcome.status != MatchStatus::Matched {
            continue;
        }
        for field in &outcome.record.fields {
            let value = match convert::convert(field, &config.date_time_format) {
                Ok(value) => value,
                Err(err) => {
                    stats.errors += 1;
                    progress.emit(ProgressEvent::Message(err.to_string()));
                    continue;
                }
            };
            for item in &outcome.items {
                if let Err(message) = annotator.set_custom_metadata(
                    item,
                    &field.name,
                    &value,
                    config.copy_custom_metadata_to_descendants,
                ) {
                    stats.errors += 1;
                    let err = EngineError::Annotate {
                        target: format!("{} on {}", field.name, item.0),
                        message,
                    };
                    progress.emit(ProgressEvent::Message(err.to_string()));
                }
            }
        }
    }
}
