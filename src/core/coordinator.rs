// shrinkray/src/core/coordinator.rs
use crate::core::{
    BatchReport, ErrorKind, FailureEntry, ProcessingConfig, ProgressSnapshot, Result,
    ShrinkrayError, SourceItem,
};
use crate::processors::{Aggregator, CancelToken, Scheduler};
use crate::utils;
use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Owns one batch: validates the configuration up front, enumerates inputs
/// into `SourceItem`s, and wires the scheduler to the aggregator.
pub struct BatchCoordinator {
    config: ProcessingConfig,
}

impl BatchCoordinator {
    /// Fails fast on an invalid configuration; no worker is ever started
    /// for one.
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Expand files and directories (recursively) into source items.
    /// Unreadable or unsupported entries become warnings, never aborts.
    pub fn enumerate(&self, inputs: &[PathBuf]) -> (Vec<SourceItem>, Vec<FailureEntry>) {
        let mut items = Vec::new();
        let mut warnings = Vec::new();

        for input in inputs {
            if input.is_dir() {
                for entry in WalkDir::new(input) {
                    match entry {
                        Ok(entry) => {
                            if !entry.file_type().is_file() {
                                continue;
                            }
                            let path = entry.into_path();
                            if !utils::is_supported_format(&path) {
                                continue;
                            }
                            match source_item(&path) {
                                Ok(item) => items.push(item),
                                Err(e) => warnings.push(enumeration_warning(path, e)),
                            }
                        }
                        Err(e) => {
                            let path = e
                                .path()
                                .map(Path::to_path_buf)
                                .unwrap_or_else(|| input.clone());
                            log::warn!("Skipping unreadable entry {}: {e}", path.display());
                            warnings.push(FailureEntry {
                                path,
                                kind: ErrorKind::Enumeration,
                                message: e.to_string(),
                            });
                        }
                    }
                }
            } else if input.is_file() {
                if !utils::is_supported_format(input) {
                    log::warn!("Skipping unsupported file {}", input.display());
                    warnings.push(FailureEntry {
                        path: input.clone(),
                        kind: ErrorKind::Enumeration,
                        message: "Unsupported image format".to_string(),
                    });
                    continue;
                }
                match source_item(input) {
                    Ok(item) => items.push(item),
                    Err(e) => warnings.push(enumeration_warning(input.clone(), e)),
                }
            } else {
                log::warn!("Skipping missing path {}", input.display());
                warnings.push(FailureEntry {
                    path: input.clone(),
                    kind: ErrorKind::Enumeration,
                    message: "Path does not exist or is not readable".to_string(),
                });
            }
        }

        // Workers complete out of order anyway; a sorted claim order keeps
        // runs reproducible.
        items.sort_by(|a, b| a.path.cmp(&b.path));

        (items, warnings)
    }

    /// Run the batch to completion or cancellation and return the final
    /// report. `on_progress` is invoked on the caller's thread.
    pub fn run<F>(
        &self,
        inputs: &[PathBuf],
        token: &CancelToken,
        on_progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&ProgressSnapshot),
    {
        let (items, warnings) = self.enumerate(inputs);

        let scheduler = Scheduler::new(self.config.workers)?;
        log::info!(
            "Processing {} images with {} workers into {}",
            items.len(),
            scheduler.workers(),
            self.config.output_dir.display()
        );

        let mut aggregator = Aggregator::new(items.len(), Some(on_progress));
        for warning in warnings {
            aggregator.record_warning(warning);
        }

        let claimed = scheduler.run(&items, &self.config, token, |result| {
            aggregator.ingest(result)
        });

        Ok(aggregator.finalize(claimed, token.is_cancelled()))
    }

    /// Start the batch on a background thread for interactive callers.
    pub fn spawn(self, inputs: Vec<PathBuf>) -> BatchHandle {
        let token = CancelToken::new();
        let worker_token = token.clone();
        let (tx, rx) = crossbeam_channel::unbounded::<ProgressSnapshot>();

        let thread = std::thread::spawn(move || {
            self.run(&inputs, &worker_token, move |snapshot| {
                let _ = tx.send(snapshot.clone());
            })
        });

        BatchHandle {
            token,
            progress: rx,
            thread,
        }
    }
}

/// Cancellable handle to a running batch, with a pollable progress stream.
pub struct BatchHandle {
    token: CancelToken,
    progress: Receiver<ProgressSnapshot>,
    thread: std::thread::JoinHandle<Result<BatchReport>>,
}

impl BatchHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Snapshot stream; disconnects when the batch finishes.
    pub fn progress(&self) -> &Receiver<ProgressSnapshot> {
        &self.progress
    }

    /// Block until the batch finishes and take the report.
    pub fn wait(self) -> Result<BatchReport> {
        self.thread
            .join()
            .map_err(|_| ShrinkrayError::ProcessingError("Batch thread panicked".to_string()))?
    }
}

fn source_item(path: &Path) -> std::io::Result<SourceItem> {
    let metadata = std::fs::metadata(path)?;
    Ok(SourceItem {
        path: path.to_path_buf(),
        size: metadata.len(),
        format: image::ImageFormat::from_path(path).ok(),
    })
}

fn enumeration_warning(path: PathBuf, e: std::io::Error) -> FailureEntry {
    log::warn!("Skipping unreadable file {}: {e}", path.display());
    FailureEntry {
        path,
        kind: ErrorKind::Enumeration,
        message: e.to_string(),
    }
}
