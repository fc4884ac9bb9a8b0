use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{ArgAction, ArgGroup, Parser, ValueEnum};
use wayback_engine::ResolveMode;

/// Download archived copies of URLs from the Internet Archive.
#[derive(Debug, Parser)]
#[command(name = "wayback_dl", version)]
#[command(about = "Download archived copies of URLs from the Internet Archive", long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["url", "list"])))]
pub struct Cli {
    /// Single URL to download.
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Text file with one URL per line.
    #[arg(short = 'l', long)]
    pub list: Option<PathBuf>,

    /// Output directory [default: downloads].
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Number of concurrent downloads [default: 8].
    #[arg(short = 't', long, value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: Option<u16>,

    /// Re-attempts after a transient failure [default: 3].
    #[arg(long)]
    pub retries: Option<u32>,

    /// Pause between attempts in milliseconds [default: 2000].
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Seconds a download may stall before the attempt fails [default: 15].
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Also retry 5xx responses.
    #[arg(long)]
    pub retry_server_errors: bool,

    /// How archive locations are found.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Prefer snapshots close to this time (YYYY-MM-DDTHH:MM:SS, YYYY-MM-DD or YYYYMMDDhhmmss).
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveDateTime>,

    /// RON file with default settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write log records to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// More log output, repeat for more detail.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print the summary and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Query the availability API for the closest snapshot.
    Lookup,
    /// Build the archive URL directly and let the archive redirect.
    Direct,
}

impl From<ModeArg> for ResolveMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Lookup => ResolveMode::Lookup,
            ModeArg::Direct => ResolveMode::Direct,
        }
    }
}

pub fn parse_time(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y%m%d%H%M%S"] {
        if let Ok(time) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(time);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("`{raw}` is not a date like 2020-01-31 or 2020-01-31T12:00:00"))
}
