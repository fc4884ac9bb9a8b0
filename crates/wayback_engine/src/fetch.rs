use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use wayback_core::{FailureReason, TargetIndex};

use crate::persist::{PartialDownload, PersistError};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::{EngineEvent, FetchError, FetchOutput, FetchResult, JobProgress, Stage};

pub const DEFAULT_USER_AGENT: &str = concat!("wayback_dl/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Longest silence allowed while waiting for headers or body data.
    /// A body that keeps arriving is never cut off by it.
    pub read_timeout: Duration,
    /// Hard cap on one attempt, body included.
    pub total_timeout: Duration,
    /// Bytes buffered before each write to disk.
    pub buffer_size: usize,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(15),
            total_timeout: Duration::from_secs(3600),
            buffer_size: 64 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Receives engine events. Injected so runs can be rendered, logged or
/// recorded without global output.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub index: TargetIndex,
    /// Resolved archive URL.
    pub location: String,
    pub output_dir: PathBuf,
    /// Destination name, derived from the original target.
    pub filename: String,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Downloads `request.location` into `request.output_dir/request.filename`.
    ///
    /// On error no file with the destination name has been created.
    async fn fetch(&self, request: &FetchRequest, sink: &dyn ProgressSink) -> FetchResult;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .timeout(settings.total_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureReason::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn fetch_once(
        &self,
        request: &FetchRequest,
        attempt: u32,
        sink: &dyn ProgressSink,
    ) -> FetchResult {
        let url = reqwest::Url::parse(&request.location)
            .map_err(|err| FetchError::new(FailureReason::InvalidUrl, err.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureReason::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        sink.emit(EngineEvent::Progress(JobProgress {
            index: request.index,
            stage: Stage::Downloading,
            bytes: Some(0),
        }));

        let mut partial = PartialDownload::create(
            &request.output_dir,
            &request.filename,
            self.settings.buffer_size,
        )
        .map_err(map_persist_error)?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            partial
                .write_chunk(&chunk)
                .await
                .map_err(map_persist_error)?;
            sink.emit(EngineEvent::Progress(JobProgress {
                index: request.index,
                stage: Stage::Downloading,
                bytes: Some(partial.bytes_written()),
            }));
        }

        sink.emit(EngineEvent::Progress(JobProgress {
            index: request.index,
            stage: Stage::Writing,
            bytes: Some(partial.bytes_written()),
        }));
        let bytes_written = partial.bytes_written();
        let path = partial.commit().await.map_err(map_persist_error)?;
        engine_debug!("saved {} ({} bytes)", path.display(), bytes_written);

        Ok(FetchOutput {
            path,
            bytes_written,
            attempts: attempt,
            final_url,
            content_type,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &FetchRequest, sink: &dyn ProgressSink) -> FetchResult {
        run_with_retry(
            &self.settings.retry,
            |attempt, delay, err| {
                engine_warn!(
                    "download of {} failed ({}), attempt {} in {:?}",
                    request.location,
                    err,
                    attempt,
                    delay
                );
                sink.emit(EngineEvent::Retrying {
                    index: request.index,
                    stage: Stage::Downloading,
                    attempt,
                    delay,
                    kind: err.kind,
                });
            },
            |attempt| self.fetch_once(request, attempt, sink),
        )
        .await
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureReason::Timeout, err.to_string());
    }
    FetchError::new(FailureReason::Network, err.to_string())
}

fn map_persist_error(err: PersistError) -> FetchError {
    FetchError::new(FailureReason::Io, err.to_string())
}
