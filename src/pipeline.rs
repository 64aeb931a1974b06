// src/pipeline.rs
//! One run: aggregate → render → persist → notify.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::{Path, PathBuf};

use crate::alerts::scan_critical;
use crate::config::DigestConfig;
use crate::ingest::commits::CommitListFetcher;
use crate::ingest::feed::FeedFetcher;
use crate::notify::{dispatch, ReportSink};
use crate::persist::persist;
use crate::render::{render, ReportSummary};
use crate::report::Aggregator;
use crate::sources::SourceDescriptor;

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report_path: PathBuf,
    pub summary: ReportSummary,
    pub notified: bool,
    pub critical_terms: Vec<String>,
}

/// `YYYY-MM-DD` of `now` in UTC; the artifact directory name.
pub fn date_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Aggregator wired with the HTTP fetchers described by `cfg`.
pub fn http_aggregator(cfg: &DigestConfig) -> Result<Aggregator> {
    let client = Client::builder()
        .user_agent(cfg.user_agent.clone())
        .build()
        .context("building http client")?;
    let feed = FeedFetcher::new(client.clone(), cfg.fetch_timeout);
    let commits =
        CommitListFetcher::new(client, cfg.fetch_timeout).with_token(cfg.github_token.clone());
    Ok(Aggregator::new(Box::new(feed), Box::new(commits)).with_delay(cfg.source_delay))
}

/// Execute a full run. Only persistence errors are returned; source and
/// notification failures are logged and absorbed.
pub async fn run_digest(
    aggregator: &Aggregator,
    sources: &[SourceDescriptor],
    sink: &dyn ReportSink,
    output_dir: &Path,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    let date = date_stamp(now);
    tracing::info!(target: "digest", %date, sources = sources.len(), "run started");

    let result = aggregator.run(sources).await;
    let rendered = render(&result, sources, &date, now);
    let report_path = persist(output_dir, &date, &rendered.markdown, &rendered.summary)
        .await
        .context("persisting report")?;

    let critical_terms = scan_critical(&rendered.markdown);
    if !critical_terms.is_empty() {
        tracing::info!(target: "digest", terms = ?critical_terms, "critical terms present in report");
    }

    let notified = dispatch(sink, &report_path).await;

    tracing::info!(
        target: "digest",
        total = rendered.summary.total_reports,
        report = %report_path.display(),
        notified,
        "run finished"
    );
    Ok(RunOutcome {
        report_path,
        summary: rendered.summary,
        notified,
        critical_terms,
    })
}
