// src/report.rs
//! Report aggregation: drive every source through its fetcher, sort, group.

use std::time::Duration;

use crate::ingest::fetch_or_empty;
use crate::ingest::types::{ReportItem, SourceFetcher};
use crate::sources::{SourceDescriptor, SourceKind};

pub const DEFAULT_SOURCE_DELAY: Duration = Duration::from_secs(1);

/// Records of one source, in global sort order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBucket {
    pub name: String,
    pub items: Vec<ReportItem>,
}

/// Outcome of one run, before rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// All records, newest first; undated records last.
    pub items: Vec<ReportItem>,
    /// Buckets in order of first appearance in `items`.
    pub buckets: Vec<SourceBucket>,
}

impl RunResult {
    pub fn from_items(mut items: Vec<ReportItem>) -> Self {
        sort_newest_first(&mut items);
        let buckets = group_by_source(&items);
        Self { items, buckets }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Names of sources that yielded at least one record, bucket order.
    pub fn source_names(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.name.clone()).collect()
    }
}

/// Stable sort by `published_at` descending. `None` compares below every date.
pub fn sort_newest_first(items: &mut [ReportItem]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

pub fn group_by_source(items: &[ReportItem]) -> Vec<SourceBucket> {
    let mut buckets: Vec<SourceBucket> = Vec::new();
    for item in items {
        match buckets.iter_mut().find(|b| b.name == item.source_name) {
            Some(bucket) => bucket.items.push(item.clone()),
            None => buckets.push(SourceBucket {
                name: item.source_name.clone(),
                items: vec![item.clone()],
            }),
        }
    }
    buckets
}

pub struct Aggregator {
    feed: Box<dyn SourceFetcher>,
    commits: Box<dyn SourceFetcher>,
    delay: Duration,
}

impl Aggregator {
    pub fn new(feed: Box<dyn SourceFetcher>, commits: Box<dyn SourceFetcher>) -> Self {
        Self {
            feed,
            commits,
            delay: DEFAULT_SOURCE_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Visit feed sources, then commit-list sources, each in registry order,
    /// one at a time with a courtesy pause after every call.
    pub async fn run(&self, sources: &[SourceDescriptor]) -> RunResult {
        let feeds = sources.iter().filter(|s| s.is_feed());
        let apis = sources
            .iter()
            .filter(|s| matches!(s.kind, SourceKind::CommitList));

        let mut all = Vec::new();
        for source in feeds.chain(apis) {
            let fetcher: &dyn SourceFetcher = match source.kind {
                SourceKind::Feed { .. } => self.feed.as_ref(),
                SourceKind::CommitList => self.commits.as_ref(),
            };
            let mut items = fetch_or_empty(fetcher, source).await;
            all.append(&mut items);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        let result = RunResult::from_items(all);
        tracing::info!(
            target: "digest",
            total = result.total(),
            sources = result.buckets.len(),
            "aggregation finished"
        );
        result
    }
}
