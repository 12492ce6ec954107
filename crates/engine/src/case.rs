//! Collaborator traits implemented by the embedding review application.
//!
//! The engine never reaches for ambient case state; the host passes these
//! in at run time. Failures cross the boundary as opaque strings and are
//! wrapped into `EngineError` variants by the pipeline.

use crate::model::{FieldValue, ItemRef};

/// Case search service. Must support exact phrase matching on a
/// file-name-equivalent field and return an empty set, not an error,
/// when nothing matches.
pub trait CaseSearch {
    fn search(&self, query: &str) -> Result<Vec<ItemRef>, String>;
}

/// Bulk tagging and custom-metadata service.
///
/// Every call is a single blocking operation; retries, if any, are the
/// collaborator's responsibility. Descendant propagation is the host's
/// contract — the engine only sets the flag.
pub trait BulkAnnotator {
    fn add_tag(
        &mut self,
        tag: &str,
        items: &[ItemRef],
        propagate_to_descendants: bool,
    ) -> Result<(), String>;

    fn set_custom_metadata(
        &mut self,
        item: &ItemRef,
        field_name: &str,
        value: &FieldValue,
        propagate_to_descendants: bool,
    ) -> Result<(), String>;
}
