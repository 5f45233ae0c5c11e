// shrinkray/src/processors/progress.rs
use crate::core::{BatchReport, FailureEntry, ProcessResult, ProgressSnapshot};
use std::time::{Duration, Instant};

const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_EVERY: usize = 16;

/// Single-consumer ingestion point for worker results.
///
/// Owns the running report; nothing else mutates it. Ingestion is serialized
/// by the scheduler's delivery path, so no locking is needed. The caller's
/// progress callback fires at a throttled cadence: when the minimum interval
/// has elapsed since the last emission, or every N results, whichever comes
/// first, plus a final emission from `finalize`.
pub struct Aggregator<F>
where
    F: FnMut(&ProgressSnapshot),
{
    report: BatchReport,
    notify: Option<F>,
    min_interval: Duration,
    every: usize,
    since_last_emit: usize,
    last_emit: Instant,
    current_file: String,
    started: Instant,
}

impl<F> Aggregator<F>
where
    F: FnMut(&ProgressSnapshot),
{
    pub fn new(total: usize, notify: Option<F>) -> Self {
        Self {
            report: BatchReport {
                total,
                ..Default::default()
            },
            notify,
            min_interval: DEFAULT_MIN_INTERVAL,
            every: DEFAULT_EVERY,
            since_last_emit: 0,
            last_emit: Instant::now(),
            current_file: String::new(),
            started: Instant::now(),
        }
    }

    pub fn with_throttle(mut self, min_interval: Duration, every: usize) -> Self {
        self.min_interval = min_interval;
        self.every = every.max(1);
        self
    }

    pub fn ingest(&mut self, result: ProcessResult) {
        self.current_file = result
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match result {
            ProcessResult::Success {
                bytes_before,
                bytes_after,
                ..
            } => {
                self.report.succeeded += 1;
                self.report.bytes_before += bytes_before;
                self.report.bytes_after += bytes_after;
            }
            ProcessResult::Failure {
                path,
                kind,
                message,
            } => {
                self.report.failed += 1;
                self.report.failures.push(FailureEntry {
                    path,
                    kind,
                    message,
                });
            }
        }
        self.report.processed += 1;
        self.since_last_emit += 1;

        if self.since_last_emit >= self.every || self.last_emit.elapsed() >= self.min_interval {
            self.emit();
        }
    }

    pub fn record_warning(&mut self, warning: FailureEntry) {
        self.report.warnings.push(warning);
    }

    /// Close out the report. `claimed` is the number of items the scheduler
    /// dispatched; the difference to `total` is recorded as skipped, which
    /// is only ever non-zero for cancelled batches.
    pub fn finalize(mut self, claimed: usize, cancelled: bool) -> BatchReport {
        self.emit();
        self.report.skipped = self.report.total.saturating_sub(claimed);
        self.report.cancelled = cancelled;
        self.report.duration = self.started.elapsed();
        self.report
    }

    fn emit(&mut self) {
        self.since_last_emit = 0;
        self.last_emit = Instant::now();

        if let Some(notify) = self.notify.as_mut() {
            let snapshot = ProgressSnapshot {
                processed: self.report.processed,
                total: self.report.total,
                current_file: self.current_file.clone(),
                bytes_before: self.report.bytes_before,
                bytes_after: self.report.bytes_after,
            };
            notify(&snapshot);
        }
    }
}
