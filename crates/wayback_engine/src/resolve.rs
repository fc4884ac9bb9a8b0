use std::time::Duration;

use chrono::NaiveDateTime;
use engine_logging::{engine_debug, engine_trace};
use serde::Deserialize;
use url::Url;
use wayback_core::FailureReason;

use crate::encode::normalize_target;
use crate::fetch::map_reqwest_error;
use crate::{FetchError, ResolveResult, ResolvedLocation};

pub const DEFAULT_AVAILABILITY_URL: &str = "https://archive.org/wayback/available";
pub const DEFAULT_ARCHIVE_BASE: &str = "https://web.archive.org";
/// Timestamp used in direct mode when no snapshot time was requested. The
/// archive redirects to the capture nearest to it.
pub const DIRECT_MODE_TIMESTAMP: &str = "20230000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Ask the availability API for the closest snapshot.
    #[default]
    Lookup,
    /// Build the archive URL without a lookup request.
    Direct,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub availability_url: String,
    pub archive_base: String,
    pub timeout: Duration,
    /// Prefer snapshots close to this time.
    pub time: Option<NaiveDateTime>,
    pub mode: ResolveMode,
    pub user_agent: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            availability_url: DEFAULT_AVAILABILITY_URL.to_string(),
            archive_base: DEFAULT_ARCHIVE_BASE.to_string(),
            timeout: Duration::from_secs(10),
            time: None,
            mode: ResolveMode::Lookup,
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    /// Maps a target URL to its best archived location.
    ///
    /// Fails with `NotFound` when no snapshot exists. Transient failures are
    /// returned as-is; retrying is up to the caller.
    async fn resolve(&self, target: &str) -> ResolveResult;
}

#[derive(Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Deserialize, Default)]
struct ArchivedSnapshots {
    closest: Option<Closest>,
}

#[derive(Deserialize)]
struct Closest {
    url: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default = "default_available")]
    available: bool,
    #[serde(default)]
    status: Option<String>,
}

fn default_available() -> bool {
    true
}

impl Closest {
    fn is_usable(&self) -> bool {
        self.available
            && self
                .status
                .as_deref()
                .map_or(true, |status| status.starts_with('2'))
    }
}

#[derive(Debug, Clone)]
pub struct WaybackResolver {
    settings: ResolverSettings,
    client: reqwest::Client,
}

impl WaybackResolver {
    pub fn new(settings: ResolverSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureReason::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn requested_timestamp(&self) -> Option<String> {
        self.settings
            .time
            .map(|time| time.format("%Y%m%d%H%M%S").to_string())
    }

    /// Raw-content archive URL (`if_` flag) for a snapshot of `encoded`.
    fn archive_url(&self, timestamp: &str, encoded: &Url) -> String {
        format!(
            "{}/web/{}if_/{}",
            self.settings.archive_base.trim_end_matches('/'),
            timestamp,
            encoded
        )
    }

    fn resolve_direct(&self, encoded: &Url) -> ResolvedLocation {
        let timestamp = self
            .requested_timestamp()
            .unwrap_or_else(|| DIRECT_MODE_TIMESTAMP.to_string());
        ResolvedLocation {
            url: self.archive_url(&timestamp, encoded),
            timestamp: None,
        }
    }

    async fn resolve_lookup(&self, encoded: &Url) -> ResolveResult {
        let mut params = vec![("url", encoded.to_string())];
        if let Some(timestamp) = self.requested_timestamp() {
            params.push(("timestamp", timestamp));
        }
        let api_url = Url::parse_with_params(&self.settings.availability_url, &params)
            .map_err(|err| FetchError::new(FailureReason::InvalidUrl, err.to_string()))?;
        engine_trace!("availability lookup {}", api_url);

        let response = self
            .client
            .get(api_url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureReason::HttpStatus(status.as_u16()),
                format!("availability lookup returned {status}"),
            ));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: AvailabilityResponse = serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureReason::InvalidResponse, err.to_string()))?;

        let closest = match parsed.archived_snapshots.closest {
            Some(closest) if closest.is_usable() => closest,
            _ => {
                return Err(FetchError::new(
                    FailureReason::NotFound,
                    format!("no snapshot of {encoded}"),
                ))
            }
        };

        let timestamp = closest
            .timestamp
            .filter(|ts| !ts.is_empty() && ts.bytes().all(|b| b.is_ascii_digit()));
        let url = match &timestamp {
            Some(ts) => self.archive_url(ts, encoded),
            None => closest.url,
        };
        Ok(ResolvedLocation { url, timestamp })
    }
}

#[async_trait::async_trait]
impl Resolver for WaybackResolver {
    async fn resolve(&self, target: &str) -> ResolveResult {
        let encoded = normalize_target(target)?;
        let location = match self.settings.mode {
            ResolveMode::Direct => self.resolve_direct(&encoded),
            ResolveMode::Lookup => self.resolve_lookup(&encoded).await?,
        };
        engine_debug!("resolved {} -> {}", target, location.url);
        Ok(location)
    }
}
