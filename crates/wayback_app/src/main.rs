mod cli;
mod config;
mod console;
mod logging;

use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use engine_logging::{engine_error, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;
use wayback_core::parse_targets;
use wayback_engine::{Orchestrator, ReqwestFetcher, WaybackResolver};

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::console::ConsoleSink;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(
        engine_logging::level_for_verbosity(cli.verbose, cli.quiet),
        cli.log_file.as_deref(),
    );

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            engine_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = match &cli.config {
        Some(path) => config::load(path)?,
        None => AppConfig::default(),
    };
    let settings = config::resolve_settings(&cli, &file_config)?;
    let urls = read_targets(&cli)?;

    let resolver =
        WaybackResolver::new(settings.resolver).context("could not set up the lookup client")?;
    let fetcher =
        ReqwestFetcher::new(settings.fetch).context("could not set up the download client")?;
    let orchestrator = Orchestrator::new(Arc::new(resolver), Arc::new(fetcher), settings.run);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                engine_warn!("interrupted, cancelling remaining downloads");
                cancel.cancel();
            }
        })
    };

    if !cli.quiet {
        println!("\n{}\n", console::banner(urls.len()));
    }
    let sink = Arc::new(ConsoleSink::new(urls.len(), cli.quiet));
    let result = orchestrator.run(urls, sink.clone(), cancel).await;
    ctrl_c.abort();
    sink.finish();

    let batch = result.with_context(|| {
        format!(
            "could not use output directory {}",
            orchestrator.settings().output_dir.display()
        )
    })?;
    engine_info!(
        "finished: {} succeeded, {} failed",
        batch.report.succeeded(),
        batch.report.failed()
    );
    println!("\n{}", console::render_summary(&batch));
    Ok(())
}

fn read_targets(cli: &Cli) -> Result<Vec<String>> {
    if let Some(url) = &cli.url {
        let url = url.trim();
        if url.is_empty() {
            bail!("the URL given with -u is empty");
        }
        return Ok(vec![url.to_string()]);
    }
    let Some(path) = &cli.list else {
        bail!("provide either a single URL (-u) or a list file (-l)");
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read URL list {}", path.display()))?;
    let urls = parse_targets(&raw);
    if urls.is_empty() {
        engine_warn!("{} contains no URLs", path.display());
    }
    Ok(urls)
}
