use crate::case::CaseSearch;
use crate::error::EngineError;
use crate::model::{MatchOutcome, MatchStatus, Record};

/// Build the exact-match lookup for a record identifier.
///
/// The identifier is quoted so the search collaborator treats it as one
/// phrase against the file-name field rather than tokenizing it.
pub fn build_query(identifier: &str) -> String {
    let escaped = identifier.replace('\\', "\\\\").replace('"', "\\\"");
    format!("name:\"{escaped}\"")
}

/// Resolve one record to zero, one, or many case items.
///
/// An empty result is a well-formed `NoMatch` outcome; only a failure of
/// the search collaborator itself is an error, and that error drops this
/// record alone, not the run.
pub fn match_record(record: Record, search: &dyn CaseSearch) -> Result<MatchOutcome, EngineError> {
    let query = build_query(&record.identifier);
    let items = search
        .search(&query)
        .map_err(|message| EngineError::Search {
            identifier: record.identifier.clone(),
            message,
        })?;
    let status = if items.is_empty() {
        MatchStatus::NoMatch
    } else {
        MatchStatus::Matched
    };
    Ok(MatchOutcome {
        record,
        items,
        status,
    })
}
