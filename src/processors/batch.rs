// shrinkray/src/processors/batch.rs
use crate::core::{
    ErrorKind, ProcessResult, ProcessingConfig, Result, ShrinkrayError, SourceItem,
};
use crate::processors::Pipeline;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Advisory cancellation flag, observed by workers between items. Cloning
/// shares the flag.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Fixed-size worker pool over a shared pull-queue.
///
/// Each worker claims the next unclaimed item, runs the pipeline on it, and
/// pushes the result into a channel that is drained on the caller's thread,
/// so `on_result` is the single, serialized consumer. Completion order is
/// whatever the workers produce; callers must not assume input order.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl Scheduler {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| {
                ShrinkrayError::ProcessingError(format!("Failed to create thread pool: {e}"))
            })?;

        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run the batch to completion (or cancellation), streaming results to
    /// `on_result`. Returns the number of items actually claimed; with
    /// cancellation this can be less than `items.len()`, and in-flight items
    /// still finish and are still delivered.
    pub fn run<F>(
        &self,
        items: &[SourceItem],
        config: &ProcessingConfig,
        token: &CancelToken,
        mut on_result: F,
    ) -> usize
    where
        F: FnMut(ProcessResult),
    {
        if items.is_empty() {
            return 0;
        }

        let next = AtomicUsize::new(0);
        let (tx, rx) = crossbeam_channel::unbounded::<ProcessResult>();

        std::thread::scope(|scope| {
            let next = &next;
            scope.spawn(move || {
                // All worker sends fan into `tx`; dropping the last clone
                // closes the channel and ends the drain loop below.
                let tx = tx;
                self.pool.scope(|pool_scope| {
                    for _ in 0..self.workers {
                        let tx = tx.clone();
                        pool_scope.spawn(move |_| {
                            let pipeline = Pipeline::new(config);
                            loop {
                                if token.is_cancelled() {
                                    log::debug!("Cancellation observed, worker exiting");
                                    break;
                                }
                                let index = next.fetch_add(1, Ordering::SeqCst);
                                if index >= items.len() {
                                    break;
                                }
                                let item = &items[index];
                                let result = run_guarded(&pipeline, item);
                                if tx.send(result).is_err() {
                                    break;
                                }
                            }
                        });
                    }
                });
            });

            // Single consumer: the caller's thread.
            for result in rx.iter() {
                on_result(result);
            }
        });

        next.load(Ordering::SeqCst).min(items.len())
    }
}

/// A panic escaping the pipeline must not take the worker pool down; it
/// becomes an `Unknown` failure for that item only.
fn run_guarded(pipeline: &Pipeline<'_>, item: &SourceItem) -> ProcessResult {
    match std::panic::catch_unwind(AssertUnwindSafe(|| pipeline.process(item))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_string());
            log::error!("Worker panicked on {}: {message}", item.path.display());
            ProcessResult::Failure {
                path: item.path.clone(),
                kind: ErrorKind::Unknown,
                message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn items_in(dir: &Path, count: usize) -> Vec<SourceItem> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("img_{i}.png"));
                let img = image::RgbImage::from_pixel(16, 16, image::Rgb([i as u8, 0, 0]));
                img.save(&path).unwrap();
                SourceItem {
                    size: std::fs::metadata(&path).unwrap().len(),
                    format: Some(image::ImageFormat::Png),
                    path,
                }
            })
            .collect()
    }

    #[test]
    fn delivers_one_result_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let items = items_in(dir.path(), 6);
        let config = ProcessingConfig {
            output_dir: dir.path().join("out"),
            ..Default::default()
        };

        let scheduler = Scheduler::new(3).unwrap();
        let mut results = Vec::new();
        let claimed = scheduler.run(&items, &config, &CancelToken::new(), |r| results.push(r));

        assert_eq!(claimed, 6);
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.is_success()));
    }

    #[test]
    fn failures_do_not_abort_other_items() {
        let dir = tempfile::tempdir().unwrap();
        let mut items = items_in(dir.path(), 4);
        let corrupt = dir.path().join("corrupt.jpg");
        std::fs::write(&corrupt, b"garbage").unwrap();
        items.push(SourceItem {
            size: 7,
            format: Some(image::ImageFormat::Jpeg),
            path: corrupt.clone(),
        });

        let config = ProcessingConfig {
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let scheduler = Scheduler::new(2).unwrap();

        let mut results = Vec::new();
        scheduler.run(&items, &config, &CancelToken::new(), |r| results.push(r));

        let failures: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(results.len(), 5);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path(), &corrupt);
    }

    #[test]
    fn pre_cancelled_token_claims_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let items = items_in(dir.path(), 4);
        let config = ProcessingConfig {
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let scheduler = Scheduler::new(2).unwrap();

        let token = CancelToken::new();
        token.cancel();

        let mut results = Vec::new();
        let claimed = scheduler.run(&items, &config, &token, |r| results.push(r));

        assert_eq!(claimed, 0);
        assert!(results.is_empty());
    }

    #[test]
    fn cancel_mid_batch_stops_dispatch_but_keeps_delivered_results() {
        let dir = tempfile::tempdir().unwrap();
        let items = items_in(dir.path(), 12);
        let config = ProcessingConfig {
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let scheduler = Scheduler::new(2).unwrap();

        let token = CancelToken::new();
        let mut results = Vec::new();
        let claimed = scheduler.run(&items, &config, &token, |r| {
            results.push(r);
            token.cancel();
        });

        // In-flight items finish; nothing is claimed after the signal is
        // observed by each worker.
        assert!(!results.is_empty());
        assert_eq!(results.len(), claimed);
        assert!(claimed <= items.len());
    }

    #[test]
    fn zero_workers_defaults_to_available_parallelism() {
        let scheduler = Scheduler::new(0).unwrap();
        assert!(scheduler.workers() >= 1);
    }
}
