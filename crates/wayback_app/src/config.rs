use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use engine_logging::engine_info;
use serde::Deserialize;
use wayback_engine::{
    FetchSettings, ResolveMode, ResolverSettings, RetryPolicy, RunSettings, DEFAULT_ARCHIVE_BASE,
    DEFAULT_AVAILABILITY_URL, DEFAULT_USER_AGENT,
};

use crate::cli::{parse_time, Cli};

/// Optional settings file. Anything left out falls back to the built-in
/// default, and command line flags override everything here.
///
/// ```ron
/// (
///     output: Some("archive"),
///     threads: Some(4),
///     retries: Some(5),
///     mode: Some(direct),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub output: Option<PathBuf>,
    pub threads: Option<usize>,
    pub retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub lookup_timeout_secs: Option<u64>,
    pub retry_server_errors: Option<bool>,
    pub mode: Option<ResolveMode>,
    pub time: Option<String>,
    pub availability_url: Option<String>,
    pub archive_base: Option<String>,
    pub user_agent: Option<String>,
}

/// Everything the engine needs for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub run: RunSettings,
    pub resolver: ResolverSettings,
    pub fetch: FetchSettings,
}

pub fn load(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("could not read config file {}", path.display()))?;
    let config: AppConfig = ron::from_str(&content)
        .with_context(|| format!("could not parse config file {}", path.display()))?;
    engine_info!("loaded settings from {}", path.display());
    Ok(config)
}

/// Combines flags, file values and defaults, in that order of precedence.
pub fn resolve_settings(cli: &Cli, file: &AppConfig) -> Result<Settings> {
    let run_defaults = RunSettings::default();
    let fetch_defaults = FetchSettings::default();
    let resolver_defaults = ResolverSettings::default();
    let retry_defaults = RetryPolicy::default();

    let concurrency = match cli.threads {
        Some(threads) => usize::from(threads),
        None => file.threads.unwrap_or(run_defaults.concurrency),
    };
    if concurrency == 0 {
        bail!("threads must be at least 1");
    }

    let retry = RetryPolicy {
        retries: cli.retries.or(file.retries).unwrap_or(retry_defaults.retries),
        delay: cli
            .retry_delay_ms
            .or(file.retry_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(retry_defaults.delay),
        retry_server_errors: cli.retry_server_errors
            || file
                .retry_server_errors
                .unwrap_or(retry_defaults.retry_server_errors),
    };

    let time = match (cli.time, file.time.as_deref()) {
        (Some(time), _) => Some(time),
        (None, Some(raw)) => Some(parse_file_time(raw)?),
        (None, None) => None,
    };

    let user_agent = file
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let read_timeout = match cli.timeout_secs.or(file.timeout_secs) {
        Some(0) => bail!("timeout must be at least 1 second"),
        Some(secs) => Duration::from_secs(secs),
        None => fetch_defaults.read_timeout,
    };

    Ok(Settings {
        run: RunSettings {
            output_dir: cli
                .output
                .clone()
                .or_else(|| file.output.clone())
                .unwrap_or(run_defaults.output_dir),
            concurrency,
            resolve_retry: retry,
        },
        resolver: ResolverSettings {
            availability_url: file
                .availability_url
                .clone()
                .unwrap_or_else(|| DEFAULT_AVAILABILITY_URL.to_string()),
            archive_base: file
                .archive_base
                .clone()
                .unwrap_or_else(|| DEFAULT_ARCHIVE_BASE.to_string()),
            timeout: file
                .lookup_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(resolver_defaults.timeout),
            time,
            mode: cli
                .mode
                .map(ResolveMode::from)
                .or(file.mode)
                .unwrap_or_default(),
            user_agent: user_agent.clone(),
        },
        fetch: FetchSettings {
            read_timeout,
            user_agent,
            retry,
            ..fetch_defaults
        },
    })
}

fn parse_file_time(raw: &str) -> Result<NaiveDateTime> {
    parse_time(raw).map_err(|msg| anyhow::anyhow!("invalid time in config file: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["wayback_dl", "-u", "https://example.com/a.pdf"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn defaults_without_flags_or_file() {
        let settings = resolve_settings(&cli(&[]), &AppConfig::default()).unwrap();
        assert_eq!(settings.run.output_dir, PathBuf::from("downloads"));
        assert_eq!(settings.run.concurrency, 8);
        assert_eq!(settings.fetch.retry, RetryPolicy::default());
        assert_eq!(settings.fetch.read_timeout, Duration::from_secs(15));
        assert_eq!(settings.resolver.mode, ResolveMode::Lookup);
        assert_eq!(settings.resolver.time, None);
    }

    #[test]
    fn file_values_fill_in_missing_flags() {
        let file: AppConfig = ron::from_str(
            "(output: Some(\"archive\"), threads: Some(2), retries: Some(5), mode: Some(direct))",
        )
        .unwrap();
        let settings = resolve_settings(&cli(&[]), &file).unwrap();
        assert_eq!(settings.run.output_dir, PathBuf::from("archive"));
        assert_eq!(settings.run.concurrency, 2);
        assert_eq!(settings.fetch.retry.retries, 5);
        assert_eq!(settings.run.resolve_retry.retries, 5);
        assert_eq!(settings.resolver.mode, ResolveMode::Direct);
    }

    #[test]
    fn flags_override_file_values() {
        let file = AppConfig {
            output: Some(PathBuf::from("archive")),
            threads: Some(2),
            retry_delay_ms: Some(10),
            mode: Some(ResolveMode::Direct),
            ..AppConfig::default()
        };
        let settings = resolve_settings(
            &cli(&["-o", "mine", "-t", "4", "--retry-delay-ms", "250", "--mode", "lookup"]),
            &file,
        )
        .unwrap();
        assert_eq!(settings.run.output_dir, PathBuf::from("mine"));
        assert_eq!(settings.run.concurrency, 4);
        assert_eq!(settings.fetch.retry.delay, Duration::from_millis(250));
        assert_eq!(settings.resolver.mode, ResolveMode::Lookup);
    }

    #[test]
    fn zero_threads_in_file_is_rejected() {
        let file = AppConfig {
            threads: Some(0),
            ..AppConfig::default()
        };
        assert!(resolve_settings(&cli(&[]), &file).is_err());
    }

    #[test]
    fn bad_time_in_file_is_rejected() {
        let file = AppConfig {
            time: Some("last week".to_string()),
            ..AppConfig::default()
        };
        let err = resolve_settings(&cli(&[]), &file).unwrap_err();
        assert!(err.to_string().contains("invalid time"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ron::from_str::<AppConfig>("(thread: Some(2))").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load(&dir.path().join("nope.ron")).unwrap_err();
        assert!(err.to_string().contains("could not read config file"));
    }

    #[test]
    fn load_reads_ron_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wayback.ron");
        fs::write(&path, "(retry_server_errors: Some(true), time: Some(\"2020-01-01\"))").unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.retry_server_errors, Some(true));
        let settings = resolve_settings(&cli(&[]), &config).unwrap();
        assert!(settings.fetch.retry.retry_server_errors);
        assert!(settings.resolver.time.is_some());
    }
}
