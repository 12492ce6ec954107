/// Error/warning/match counters for one run.
///
/// Owned exclusively by the run that created them; incremented
/// monotonically while the run progresses, read-only afterwards.
#[derive(Debug, Default)]
pub struct RunStats {
    pub errors: u64,
    pub warnings: u64,
    pub matches: u64,
}
