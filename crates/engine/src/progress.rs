//! Progress notification and run-control types.
//!
//! Components report through a `ProgressSink` the caller supplies instead
//! of writing to any log; the embedding application decides whether events
//! become a progress dialog, a log file, or nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    FileStarted { path: String },
    FileFailed { path: String, message: String },
    FileFinished { path: String, records: usize },
    /// Free-form diagnostic line (skipped records, failed writes, ...).
    Message(String),
    NoMatch { identifier: String },
    /// Running totals, emitted after every unit of work.
    Counts { errors: u64, warnings: u64, matches: u64 },
    TagApplied { tag: String, items: usize },
}

pub trait ProgressSink {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Cooperative cancellation handle shared between the caller and a run.
///
/// The pipeline checks it between records, files, and write batches; the
/// record in flight finishes, and no writes are issued once cancellation
/// has been observed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CollectSink(RefCell<Vec<ProgressEvent>>);

    impl ProgressSink for CollectSink {
        fn emit(&self, event: ProgressEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    #[test]
    fn sinks_observe_every_event() {
        let sink = CollectSink(RefCell::new(Vec::new()));
        sink.emit(ProgressEvent::Message("one".into()));
        sink.emit(ProgressEvent::NoMatch { identifier: "a.txt".into() });
        assert_eq!(sink.0.borrow().len(), 2);
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
