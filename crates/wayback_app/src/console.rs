use std::fmt::Write as _;

use indicatif::{ProgressBar, ProgressStyle};
use wayback_core::{FailureReason, Outcome};
use wayback_engine::{BatchRun, EngineEvent, ProgressSink};

const IDLE_MESSAGE: &str = "Downloading archived files...";

/// Renders engine events as a progress bar plus one line per finished target.
pub struct ConsoleSink {
    bar: ProgressBar,
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(total: usize, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{msg} {spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta_precise})",
        ) {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(IDLE_MESSAGE);
        Self { bar, quiet }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ConsoleSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::Completed {
                url,
                outcome,
                progress,
                ..
            } => {
                self.bar.set_position(progress.completed as u64);
                self.bar.set_message(remaining_message(progress.remaining()));
                if self.quiet {
                    return;
                }
                let line = completion_line(&url, &outcome);
                self.bar.suspend(|| println!("{line}"));
            }
            EngineEvent::Retrying {
                index,
                attempt,
                kind,
                ..
            } => {
                self.bar
                    .set_message(format!("Retrying #{} after {kind} (attempt {attempt})", index + 1));
            }
            _ => {}
        }
    }
}

pub fn completion_line(url: &str, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Success { filename } => format!("✅ Downloaded: {filename}"),
        Outcome::Failure {
            reason: FailureReason::NotFound,
            ..
        } => format!("❌ Not Found: {url}"),
        Outcome::Failure { reason, .. } => format!("❌ Failed ({reason}): {url}"),
    }
}

fn remaining_message(remaining: usize) -> String {
    if remaining == 0 {
        "Finishing up...".to_string()
    } else {
        format!("{IDLE_MESSAGE} ({remaining} left)")
    }
}

pub fn banner(total: usize) -> String {
    let plural = if total == 1 { "" } else { "s" };
    format!("🌐 Downloading from Internet Archive: {total} file{plural}")
}

pub fn render_summary(run: &BatchRun) -> String {
    let report = &run.report;
    let cancelled = report
        .entries()
        .iter()
        .filter(|e| e.outcome.reason() == Some(&FailureReason::Cancelled))
        .count();

    let mut out = String::new();
    let _ = writeln!(out, "──────────── Download Summary ────────────");
    let _ = writeln!(out, "{:<14} {:>6}", "Status", "Count");
    let _ = writeln!(out, "{:<14} {:>6}", "✅ Successful", report.succeeded());
    let _ = writeln!(out, "{:<14} {:>6}", "❌ Failed", report.failed());
    if cancelled > 0 {
        let _ = writeln!(out, "({cancelled} of the failures were cancelled before finishing)");
    }
    if let Some(path) = &run.failure_log {
        let _ = writeln!(out);
        let _ = writeln!(out, "📄 Failed URLs saved to: {}", path.display());
    }
    if let Some(path) = &run.removed_stale_log {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "🧹 Nothing failed, removed the old failure list: {}",
            path.display()
        );
    }
    out
}
