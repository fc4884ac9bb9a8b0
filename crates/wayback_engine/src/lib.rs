//! Wayback engine: snapshot lookup, streamed downloads and the batch worker pool.
mod encode;
mod fetch;
mod filename;
mod orchestrator;
mod persist;
mod resolve;
mod retry;
mod types;

pub use encode::normalize_target;
pub use fetch::{
    FetchRequest, FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher,
    DEFAULT_USER_AGENT,
};
pub use filename::{assign_filenames, derive_filename, disambiguate, FALLBACK_FILENAME};
pub use orchestrator::{BatchRun, Orchestrator, RunSettings, DEFAULT_CONCURRENCY};
pub use persist::{ensure_output_dir, AtomicFileWriter, PartialDownload, PersistError};
pub use resolve::{
    ResolveMode, Resolver, ResolverSettings, WaybackResolver, DEFAULT_ARCHIVE_BASE,
    DEFAULT_AVAILABILITY_URL, DIRECT_MODE_TIMESTAMP,
};
pub use retry::{run_with_retry, RetryDecision, RetryPolicy};
pub use types::{
    EngineEvent, FetchError, FetchOutput, FetchResult, JobProgress, ResolveResult,
    ResolvedLocation, Stage,
};
