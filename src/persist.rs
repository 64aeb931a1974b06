// src/persist.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::render::ReportSummary;

pub const REPORT_FILE_NAME: &str = "supply-chain-report.md";
pub const SUMMARY_FILE_NAME: &str = "summary.json";

/// Write `<root>/<date>/supply-chain-report.md` and `<root>/<date>/summary.json`,
/// overwriting any earlier run of the same day. Returns the markdown path.
pub async fn persist(
    root: &Path,
    date: &str,
    markdown: &str,
    summary: &ReportSummary,
) -> Result<PathBuf> {
    let dir = root.join(date);
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("creating report dir {}", dir.display()))?;

    let report_path = dir.join(REPORT_FILE_NAME);
    fs::write(&report_path, markdown)
        .await
        .with_context(|| format!("writing {}", report_path.display()))?;

    let summary_path = dir.join(SUMMARY_FILE_NAME);
    let json = serde_json::to_string_pretty(summary).context("serializing summary")?;
    fs::write(&summary_path, json)
        .await
        .with_context(|| format!("writing {}", summary_path.display()))?;

    tracing::info!(
        target: "digest",
        report = %report_path.display(),
        summary = %summary_path.display(),
        "report persisted"
    );
    Ok(report_path)
}
