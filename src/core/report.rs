// shrinkray/src/core/report.rs
use std::path::PathBuf;
use std::time::Duration;

/// One enumerated input: path plus the metadata read up front. Immutable
/// once the batch starts; workers only borrow it.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub path: PathBuf,
    pub size: u64,
    pub format: Option<image::ImageFormat>,
}

impl SourceItem {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Stage a per-item failure was mapped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Enumeration,
    Decode,
    Resize,
    Encode,
    Exif,
    Write,
    Timeout,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Enumeration => "enumeration",
            ErrorKind::Decode => "decode",
            ErrorKind::Resize => "resize",
            ErrorKind::Encode => "encode",
            ErrorKind::Exif => "exif",
            ErrorKind::Write => "write",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Outcome of one `SourceItem`, produced exactly once by a worker and
/// consumed exactly once by the aggregator.
#[derive(Debug, Clone)]
pub enum ProcessResult {
    Success {
        path: PathBuf,
        output_path: PathBuf,
        bytes_before: u64,
        bytes_after: u64,
        elapsed: Duration,
    },
    Failure {
        path: PathBuf,
        kind: ErrorKind,
        message: String,
    },
}

impl ProcessResult {
    pub fn path(&self) -> &PathBuf {
        match self {
            ProcessResult::Success { path, .. } => path,
            ProcessResult::Failure { path, .. } => path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResult::Success { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FailureEntry {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

/// Snapshot handed to the progress callback. Consistent at the moment of
/// emission; byte counters cover succeeded items only.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub current_file: String,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl ProgressSnapshot {
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_before == 0 {
            return 1.0;
        }
        self.bytes_after as f64 / self.bytes_before as f64
    }
}

/// Aggregate outcome of a whole batch. Mutated only by the aggregator's
/// ingestion path, immutable once returned.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items never claimed because cancellation was observed first. Neither
    /// successes nor failures.
    pub skipped: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub failures: Vec<FailureEntry>,
    pub warnings: Vec<FailureEntry>,
    pub duration: Duration,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn savings_percent(&self) -> f64 {
        if self.bytes_before == 0 {
            return 0.0;
        }
        let savings = (self.bytes_before as f64 - self.bytes_after as f64)
            / self.bytes_before as f64
            * 100.0;
        savings.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savings_percent_handles_empty_batch() {
        let report = BatchReport::default();
        assert_eq!(report.savings_percent(), 0.0);
    }

    #[test]
    fn savings_percent_is_clamped() {
        let report = BatchReport {
            bytes_before: 100,
            bytes_after: 250,
            ..Default::default()
        };
        assert_eq!(report.savings_percent(), 0.0);

        let report = BatchReport {
            bytes_before: 200,
            bytes_after: 50,
            ..Default::default()
        };
        assert_eq!(report.savings_percent(), 75.0);
    }

    #[test]
    fn snapshot_ratio_handles_zero_bytes() {
        let snapshot = ProgressSnapshot {
            processed: 0,
            total: 10,
            current_file: String::new(),
            bytes_before: 0,
            bytes_after: 0,
        };
        assert_eq!(snapshot.compression_ratio(), 1.0);
    }
}
