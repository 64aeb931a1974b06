// tests/pipeline_e2e.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use supply_chain_digest::ingest::commits::parse_commits;
use supply_chain_digest::ingest::feed::FeedFetcher;
use supply_chain_digest::render::ReportSummary;
use supply_chain_digest::{
    run_digest, Aggregator, NoopSink, ReportItem, ReportSink, SourceDescriptor, SourceFetcher,
};

const RSS_XML: &str = include_str!("fixtures/supply_chain_rss.xml");
const COMMITS_JSON: &str = include_str!("fixtures/advisory_commits.json");

/// Feed fetcher serving the RSS fixture instead of the network.
struct FixtureFeeds;

#[async_trait]
impl SourceFetcher for FixtureFeeds {
    async fn fetch_latest(&self, source: &SourceDescriptor) -> Result<Vec<ReportItem>> {
        FeedFetcher::parse_for_source(RSS_XML, source)
    }
    fn name(&self) -> &'static str {
        "fixture-feed"
    }
}

struct FixtureCommits;

#[async_trait]
impl SourceFetcher for FixtureCommits {
    async fn fetch_latest(&self, source: &SourceDescriptor) -> Result<Vec<ReportItem>> {
        parse_commits(COMMITS_JSON, &source.name)
    }
    fn name(&self) -> &'static str {
        "fixture-commits"
    }
}

struct AlwaysDown;

#[async_trait]
impl SourceFetcher for AlwaysDown {
    async fn fetch_latest(&self, _source: &SourceDescriptor) -> Result<Vec<ReportItem>> {
        bail!("timeout")
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

struct FailingSink;

#[async_trait]
impl ReportSink for FailingSink {
    async fn on_report_ready(&self, _report_path: &Path) -> Result<()> {
        bail!("bot token revoked")
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

#[derive(Default)]
struct RecordingSink {
    paths: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn on_report_ready(&self, report_path: &Path) -> Result<()> {
        self.paths.lock().unwrap().push(report_path.to_path_buf());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

fn registry() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::feed(
            "Security Weekly",
            "https://news.example.test/feed",
            &["supply chain", "npm", "pypi", "sbom", "backdoor"],
        ),
        SourceDescriptor::commit_list("GitHub Advisory Database", "https://api.example.test/commits"),
    ]
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 6, 0, 0).unwrap()
}

#[tokio::test]
async fn full_run_writes_dated_artifacts_and_notifies() {
    let tmp = tempfile::tempdir().unwrap();
    let agg = Aggregator::new(Box::new(FixtureFeeds), Box::new(FixtureCommits))
        .with_delay(Duration::ZERO);
    let sink = RecordingSink::default();

    let out = run_digest(&agg, &registry(), &sink, tmp.path(), now())
        .await
        .expect("run ok");

    let report = tmp.path().join("2024-03-05").join("supply-chain-report.md");
    let summary = tmp.path().join("2024-03-05").join("summary.json");
    assert_eq!(out.report_path, report);
    assert!(summary.exists());
    assert!(out.notified);
    assert_eq!(*sink.paths.lock().unwrap(), vec![report.clone()]);

    // 5 feed items (after cap) + 3 commits (after cap)
    assert_eq!(out.summary.total_reports, 8);

    let on_disk: ReportSummary =
        serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(on_disk, out.summary);
    assert_eq!(on_disk.report_path, "2024-03-05/supply-chain-report.md");
    // newest record is the 2024-03-06 commit
    assert_eq!(
        on_disk.sources,
        vec!["GitHub Advisory Database".to_string(), "Security Weekly".into()]
    );

    let md = std::fs::read_to_string(&report).unwrap();
    assert!(md.starts_with("# Software Supply Chain Security Report - 2024-03-05"));
    assert!(md.contains("**Total Reports:** 8"));
    assert!(out.critical_terms.is_empty());
}

#[tokio::test]
async fn all_sources_failing_still_produces_empty_report() {
    let tmp = tempfile::tempdir().unwrap();
    let agg = Aggregator::new(Box::new(AlwaysDown), Box::new(AlwaysDown)).with_delay(Duration::ZERO);

    let out = run_digest(&agg, &registry(), &NoopSink, tmp.path(), now())
        .await
        .expect("source failures are not fatal");

    assert_eq!(out.summary.total_reports, 0);
    assert!(out.summary.sources.is_empty());
    let md = std::fs::read_to_string(&out.report_path).unwrap();
    assert!(md.contains("## No Relevant Reports"));
}

#[tokio::test]
async fn summary_report_path_is_relative_to_output_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("site").join("digests");
    let agg = Aggregator::new(Box::new(FixtureFeeds), Box::new(FixtureCommits))
        .with_delay(Duration::ZERO);

    let out = run_digest(&agg, &registry(), &NoopSink, &root, now())
        .await
        .expect("run ok");

    assert_eq!(out.summary.report_path, "2024-03-05/supply-chain-report.md");
    assert_eq!(root.join(&out.summary.report_path), out.report_path);
    assert!(out.report_path.exists());
}

#[tokio::test]
async fn failing_notification_does_not_fail_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let agg = Aggregator::new(Box::new(FixtureFeeds), Box::new(FixtureCommits))
        .with_delay(Duration::ZERO);

    let out = run_digest(&agg, &registry(), &FailingSink, tmp.path(), now())
        .await
        .expect("notification errors are swallowed");

    assert!(!out.notified);
    assert!(out.report_path.exists());
}

#[tokio::test]
async fn persistence_failure_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("blocked");
    std::fs::write(&blocker, "not a directory").unwrap();
    let agg = Aggregator::new(Box::new(AlwaysDown), Box::new(AlwaysDown)).with_delay(Duration::ZERO);

    let res = run_digest(&agg, &registry(), &NoopSink, &blocker, now()).await;
    assert!(res.is_err());
}
