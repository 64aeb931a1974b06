// src/render.rs
//! Markdown report + JSON summary rendering.
//!
//! Pure with respect to its inputs: the render clock (`now`) is a parameter,
//! so the same `RunResult`, date and clock always produce the same bytes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::ingest::types::ReportItem;
use crate::persist::REPORT_FILE_NAME;
use crate::report::RunResult;
use crate::sources::{keyword_vocabulary, SourceDescriptor};

pub const NO_REPORTS_HEADING: &str = "## No Relevant Reports";

/// Machine-readable companion of the markdown report (`summary.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub date: String,
    pub total_reports: usize,
    pub sources: Vec<String>,
    /// `<date>/supply-chain-report.md`, relative to the output root
    /// (`DIGEST_OUTPUT_DIR`) so the file stays valid wherever the tree is checked out.
    pub report_path: String,
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub markdown: String,
    pub summary: ReportSummary,
}

/// Human date for a record; the raw source string when it did not parse.
pub fn display_date(item: &ReportItem) -> String {
    match item.published_at {
        Some(dt) => dt.format("%B %-d, %Y").to_string(),
        None => item.published_raw.clone(),
    }
}

fn single_line(s: &str) -> String {
    s.split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render(
    result: &RunResult,
    registry: &[SourceDescriptor],
    date: &str,
    now: DateTime<Utc>,
) -> RenderedReport {
    let total = result.total();
    let mut md = String::new();

    // `write!` into a String cannot fail
    let _ = writeln!(md, "# Software Supply Chain Security Report - {date}");
    let _ = writeln!(md);
    let _ = writeln!(md, "**Date:** {date}  ");
    let _ = writeln!(md, "**Total Reports:** {total}");
    let _ = writeln!(md);

    let summary = ReportSummary {
        date: date.to_string(),
        total_reports: total,
        sources: result.source_names(),
        report_path: format!("{date}/{REPORT_FILE_NAME}"),
    };

    // Nothing else follows the no-reports section.
    if total == 0 {
        let _ = writeln!(md, "{NO_REPORTS_HEADING}");
        let _ = writeln!(md);
        let _ = writeln!(
            md,
            "No supply chain security reports matching the tracked keywords were found in the monitored sources today."
        );
        let _ = writeln!(md);
        return RenderedReport {
            markdown: md,
            summary,
        };
    }

    let _ = writeln!(md, "## Summary");
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "Found {total} relevant supply chain security report{} from {} source{}.",
        if total == 1 { "" } else { "s" },
        result.buckets.len(),
        if result.buckets.len() == 1 { "" } else { "s" },
    );
    let _ = writeln!(md);

    for bucket in &result.buckets {
        let _ = writeln!(md, "## {}", bucket.name);
        let _ = writeln!(md);
        for (i, item) in bucket.items.iter().enumerate() {
            let _ = writeln!(md, "### {}. {}", i + 1, item.title);
            let _ = writeln!(md);
            let _ = writeln!(md, "**Link:** [{0}]({0})  ", item.link);
            let _ = writeln!(md, "**Published:** {}  ", display_date(item));
            let _ = writeln!(md, "**Summary:** {}", single_line(&item.summary));
            let _ = writeln!(md);
            let _ = writeln!(md, "---");
            let _ = writeln!(md);
        }
    }

    render_footer(&mut md, registry, now);

    RenderedReport {
        markdown: md,
        summary,
    }
}

fn render_footer(md: &mut String, registry: &[SourceDescriptor], now: DateTime<Utc>) {
    let _ = writeln!(md, "## About This Report");
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "This report is generated automatically by polling security news feeds and advisory sources, keeping only items that mention software supply chain topics."
    );
    let _ = writeln!(md);
    let _ = writeln!(md, "**Monitored sources:**");
    let _ = writeln!(md);
    for (i, source) in registry.iter().enumerate() {
        let _ = writeln!(md, "{}. {}", i + 1, source.name);
    }
    let _ = writeln!(md);

    let vocab = keyword_vocabulary(registry);
    let listed: Vec<String> = vocab
        .iter()
        .enumerate()
        .map(|(i, k)| format!("({}) {}", i + 1, k))
        .collect();
    let _ = writeln!(md, "**Keywords tracked:** {}.", listed.join(", "));
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "*Last Updated: {}*",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_date_falls_back_to_raw() {
        let mut it = ReportItem {
            title: "t".into(),
            link: "l".into(),
            published_raw: "Tue, 05 Mar 2024 14:30:00 +0000".into(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap()),
            summary: String::new(),
            source_name: "s".into(),
        };
        assert_eq!(display_date(&it), "March 5, 2024");
        it.published_at = None;
        it.published_raw = "sometime".into();
        assert_eq!(display_date(&it), "sometime");
    }

    #[test]
    fn single_line_collapses_newlines() {
        assert_eq!(single_line("a\nb\r\n\nc"), "a b c");
    }

    #[test]
    fn summary_serializes_camel_case() {
        let s = ReportSummary {
            date: "2024-03-05".into(),
            total_reports: 0,
            sources: vec![],
            report_path: "2024-03-05/supply-chain-report.md".into(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["totalReports"], 0);
        assert_eq!(v["reportPath"], "2024-03-05/supply-chain-report.md");
        assert!(v["sources"].as_array().unwrap().is_empty());
    }
}
