// ██╗    ██╗███████╗     ██████╗ █████╗ ██████╗ ██████╗ ██╗     ██╗███████╗████████╗
// ██║    ██║██╔════╝    ██╔════╝██╔══██╗██╔══██╗██╔══██╗██║     ██║██╔════╝╚══██╔══╝
// ██║ █╗ ██║███████╗    ██║     ███████║██████╔╝██║  ██║██║     ██║███████╗   ██║
// ██║███╗██║╚════██║    ██║     ██╔══██║██╔══██╗██║  ██║██║     ██║╚════██║   ██║
// ╚███╔███╔╝███████║    ╚██████╗██║  ██║██║  ██║██████╔╝███████╗██║███████║   ██║
//  ╚══╝╚══╝ ╚══════╝     ╚═════╝╚═╝  ╚═╝╚═╝  ╚═╝╚═════╝ ╚══════╝╚═╝╚══════╝   ╚═╝
//
// C R A W L E R
//
// Start at one card. Read it. Save its picture. Click "next". Repeat until
// there is no "next". Write everything down as one JSON array.

mod collection;
mod config;
mod error;
mod extractor;
mod fetcher;
mod images;
mod models;
mod stats;
mod walker;

#[cfg(test)]
mod fixtures;

use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use crate::config::{Config, LogFormat};
use crate::extractor::Extractor;
use crate::fetcher::{build_client, HttpPageFetcher};
use crate::images::HttpImageFetcher;
use crate::stats::{CrawlStats, CrawlSummary, StopReason};
use crate::walker::PaginationWalker;

fn print_banner() {
    let banner = r#"

    ╔══════════════════════════════════════════════════════════════════╗
    ║                                                                  ║
    ║        ██╗    ██╗███████╗                                        ║
    ║        ██║    ██║██╔════╝     WEISS SCHWARZ                      ║
    ║        ██║ █╗ ██║███████╗     CARDLIST CRAWLER                   ║
    ║        ██║███╗██║╚════██║                                        ║
    ║        ╚███╔███╔╝███████║                                        ║
    ║         ╚══╝╚══╝ ╚══════╝                                        ║
    ║                                                                  ║
    ║   Pages:   one at a time, "next" until there is no "next"        ║
    ║   Images:  streamed to disk, original filenames                  ║
    ║   Output:  one pretty JSON array, written once                   ║
    ║                                                                  ║
    ║   "Gotta scrape 'em all. Slowly."                                ║
    ║                                                                  ║
    ╚══════════════════════════════════════════════════════════════════╝

    "#;
    println!("{}", banner);
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(false)
            .init(),
    }
}

/// How the run ended, for the summary line.
struct RunReport {
    stop: Option<StopReason>,
    output: Option<String>,
    stats: CrawlStats,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Config first: the log format lives in it, and `.env` may set it.
    let config = Config::from_env(std::env::args().skip(1));
    init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or_default());
    print_banner();

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, "🃏 Cardlist crawler initializing...");

    let mut report = RunReport { stop: None, output: None, stats: CrawlStats::default() };
    let result = match config {
        Ok(config) => run(&config, &mut report).await,
        Err(e) => Err(anyhow::Error::new(e).context("invalid configuration")),
    };

    let summary = CrawlSummary::new(
        run_id,
        started_at,
        report.stop,
        result.as_ref().err().map(|e| format!("{e:#}")),
        report.output,
        report.stats,
    );
    match serde_json::to_string(&summary) {
        Ok(line) => info!(summary = %line, "Run summary"),
        Err(e) => warn!(error = %e, "Could not serialize the run summary"),
    }

    match result {
        Ok(()) => {
            info!("✅ Crawl complete. The binder is full.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "💀 Crawl failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, report: &mut RunReport) -> anyhow::Result<()> {
    info!(
        base_url = %config.base_url,
        first = %config.first_page,
        output = %config.output_path().display(),
        images = %config.image_dir.display(),
        variant = %config.variant,
        log_format = ?config.log_format,
        "✅ Configuration loaded"
    );

    let client = build_client(config.request_timeout, &config.user_agent)
        .context("could not build the HTTP client")?;
    let extractor = Extractor::new(config.variant.clone(), config.base_url.clone())
        .context("invalid field table")?;
    let pages = HttpPageFetcher::new(client.clone(), config.base_url.clone());
    let images = HttpImageFetcher::new(client, config.image_dir.clone());

    let walker = PaginationWalker::new(
        &pages,
        &images,
        &extractor,
        config.base_url.clone(),
        config.walk_policy(),
    );

    match walker.walk(config.first_page.clone()).await {
        Ok(outcome) => {
            report.stop = Some(outcome.stop);
            report.stats = outcome.stats;

            let path = config.output_path();
            outcome
                .records
                .persist(&path)
                .await
                .with_context(|| format!("could not write {}", path.display()))?;
            report.output = Some(path.display().to_string());
            Ok(())
        }
        Err(aborted) => {
            report.stats = aborted.stats.clone();

            if config.checkpoint_on_abort && !aborted.partial.is_empty() {
                let path = config.checkpoint_path();
                match aborted.partial.persist(&path).await {
                    Ok(()) => {
                        warn!(
                            path = %path.display(),
                            records = aborted.partial.len(),
                            "Partial collection checkpointed before bailing out"
                        );
                        report.output = Some(path.display().to_string());
                    }
                    Err(e) => error!(path = %path.display(), error = %e, "Checkpoint failed too"),
                }
            }

            Err(aborted.into())
        }
    }
}
