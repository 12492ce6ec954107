//! `caselink-engine` — provenance reconciliation engine.
//!
//! Pure engine crate: receives pre-parsed record streams, matches them
//! against a review case through injected collaborator traits, and applies
//! labels as tags and typed custom metadata in batches. No file IO.

pub mod annotate;
pub mod case;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod progress;
pub mod stats;

pub use config::RunConfig;
pub use engine::run;
pub use error::EngineError;
pub use model::{ItemRef, MatchOutcome, Record, RecordSource, RunResult};
pub use progress::{CancelToken, ProgressEvent, ProgressSink};
