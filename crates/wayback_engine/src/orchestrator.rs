use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use wayback_core::{
    index_targets, BatchReport, BatchState, FailureReason, Outcome, Target, TargetIndex,
    FAILURE_LOG_FILENAME,
};

use crate::fetch::{FetchRequest, Fetcher, ProgressSink};
use crate::filename::assign_filenames;
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};
use crate::resolve::Resolver;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::{EngineEvent, JobProgress, Stage};

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    /// Number of workers. Zero is treated as one.
    pub concurrency: usize,
    /// Applied around each resolve call.
    pub resolve_retry: RetryPolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            concurrency: DEFAULT_CONCURRENCY,
            resolve_retry: RetryPolicy::default(),
        }
    }
}

/// Result of [`Orchestrator::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRun {
    pub report: BatchReport,
    /// Path of the failure log, when one was written.
    pub failure_log: Option<PathBuf>,
    /// Failure log of an earlier run that was deleted because this run had
    /// no failures.
    pub removed_stale_log: Option<PathBuf>,
}

/// Drives every target through resolve and fetch on a bounded worker pool.
pub struct Orchestrator {
    resolver: Arc<dyn Resolver>,
    fetcher: Arc<dyn Fetcher>,
    settings: RunSettings,
}

/// Read-only work list shared by the workers. Each worker claims the next
/// unclaimed index, so no target is handed out twice.
struct WorkQueue {
    targets: Vec<Target>,
    filenames: Vec<String>,
    next: AtomicUsize,
}

impl WorkQueue {
    fn claim(&self) -> Option<(&Target, &str)> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        let target = self.targets.get(index)?;
        Some((target, self.filenames[index].as_str()))
    }
}

#[derive(Clone)]
struct WorkerContext {
    queue: Arc<WorkQueue>,
    resolver: Arc<dyn Resolver>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
    output_dir: PathBuf,
    resolve_retry: RetryPolicy,
    results: mpsc::UnboundedSender<(TargetIndex, Outcome)>,
}

impl Orchestrator {
    pub fn new(
        resolver: Arc<dyn Resolver>,
        fetcher: Arc<dyn Fetcher>,
        settings: RunSettings,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Processes `urls` and writes the failure log.
    ///
    /// Only a missing or unwritable output directory is an error; every
    /// per-target problem ends up as a `Failure` outcome in the report.
    pub async fn run(
        &self,
        urls: Vec<String>,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<BatchRun, PersistError> {
        let output_dir = self.settings.output_dir.clone();
        ensure_output_dir(&output_dir)?;

        let targets = index_targets(urls);
        let filenames = assign_filenames(&targets);
        let mut state = BatchState::new(targets.clone());
        let queue = Arc::new(WorkQueue {
            targets,
            filenames,
            next: AtomicUsize::new(0),
        });

        let worker_count = self.settings.concurrency.max(1).min(state.len().max(1));
        engine_info!(
            "processing {} targets with {} workers into {}",
            state.len(),
            worker_count,
            output_dir.display()
        );

        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let ctx = WorkerContext {
                queue: queue.clone(),
                resolver: self.resolver.clone(),
                fetcher: self.fetcher.clone(),
                sink: sink.clone(),
                cancel: cancel.clone(),
                output_dir: output_dir.clone(),
                resolve_retry: self.settings.resolve_retry,
                results: results_tx.clone(),
            };
            workers.spawn(run_worker(worker_id, ctx));
        }
        drop(results_tx);

        while let Some((index, outcome)) = results_rx.recv().await {
            if !state.record(index, outcome.clone()) {
                engine_warn!("duplicate outcome for target {} ignored", index);
                continue;
            }
            sink.emit(EngineEvent::Completed {
                index,
                url: queue.targets[index].url.clone(),
                outcome,
                progress: state.view(),
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                engine_error!("download worker stopped abnormally: {}", err);
            }
        }

        let cancelled = state.cancel_remaining(|target| queue.filenames[target.index].clone());
        if cancelled > 0 {
            engine_warn!("{} targets were not processed", cancelled);
        }

        let report = state.into_report();
        let (failure_log, removed_stale_log) = write_failure_log(&output_dir, &report);
        Ok(BatchRun {
            report,
            failure_log,
            removed_stale_log,
        })
    }
}

async fn run_worker(worker_id: usize, ctx: WorkerContext) {
    while !ctx.cancel.is_cancelled() {
        let Some((target, filename)) = ctx.queue.claim() else {
            break;
        };
        engine_debug!("worker {} took target {}", worker_id, target.index);

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Outcome::failure(filename, FailureReason::Cancelled),
            outcome = process_target(&ctx, target, filename) => outcome,
        };
        if ctx.results.send((target.index, outcome)).is_err() {
            break;
        }
    }
}

/// Resolve then fetch one target. Every error becomes a `Failure` outcome.
async fn process_target(ctx: &WorkerContext, target: &Target, filename: &str) -> Outcome {
    ctx.sink.emit(EngineEvent::Started {
        index: target.index,
        url: target.url.clone(),
        filename: filename.to_string(),
    });
    ctx.sink.emit(EngineEvent::Progress(JobProgress {
        index: target.index,
        stage: Stage::Resolving,
        bytes: None,
    }));

    let resolved = run_with_retry(
        &ctx.resolve_retry,
        |attempt, delay, err| {
            engine_warn!(
                "lookup for {} failed ({}), attempt {} in {:?}",
                target.url,
                err,
                attempt,
                delay
            );
            ctx.sink.emit(EngineEvent::Retrying {
                index: target.index,
                stage: Stage::Resolving,
                attempt,
                delay,
                kind: err.kind,
            });
        },
        |_| ctx.resolver.resolve(&target.url),
    )
    .await;
    let location = match resolved {
        Ok(location) => location,
        Err(err) => {
            engine_warn!("could not resolve {}: {}", target.url, err);
            return Outcome::failure(filename, err.kind);
        }
    };
    ctx.sink.emit(EngineEvent::Resolved {
        index: target.index,
        location: location.url.clone(),
    });

    let request = FetchRequest {
        index: target.index,
        location: location.url,
        output_dir: ctx.output_dir.clone(),
        filename: filename.to_string(),
    };
    let outcome = match ctx.fetcher.fetch(&request, ctx.sink.as_ref()).await {
        Ok(output) => {
            engine_info!(
                "downloaded {} -> {} ({} bytes, {} attempts)",
                target.url,
                output.path.display(),
                output.bytes_written,
                output.attempts
            );
            Outcome::success(filename)
        }
        Err(err) => {
            engine_warn!("download of {} failed: {}", target.url, err);
            Outcome::failure(filename, err.kind)
        }
    };
    ctx.sink.emit(EngineEvent::Progress(JobProgress {
        index: target.index,
        stage: Stage::Done,
        bytes: None,
    }));
    outcome
}

/// Writes `failed_urls.txt` when something failed, otherwise removes a stale
/// one left by an earlier run.
///
/// Returns `(written, removed)` paths.
fn write_failure_log(
    output_dir: &std::path::Path,
    report: &BatchReport,
) -> (Option<PathBuf>, Option<PathBuf>) {
    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    match report.failure_log() {
        Some(content) => match writer.write(FAILURE_LOG_FILENAME, &content) {
            Ok(path) => (Some(path), None),
            Err(err) => {
                engine_error!("could not write {}: {}", FAILURE_LOG_FILENAME, err);
                (None, None)
            }
        },
        None => match writer.remove(FAILURE_LOG_FILENAME) {
            Ok(true) => {
                engine_info!("removed stale {}", FAILURE_LOG_FILENAME);
                (None, Some(output_dir.join(FAILURE_LOG_FILENAME)))
            }
            Ok(false) => (None, None),
            Err(err) => {
                engine_warn!("could not remove stale {}: {}", FAILURE_LOG_FILENAME, err);
                (None, None)
            }
        },
    }
}
