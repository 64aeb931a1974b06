// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::sources::SourceDescriptor;

/// One relevant item, normalized from any source kind.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ReportItem {
    pub title: String,
    pub link: String,
    /// Date string as the source provided it (may be empty or garbage).
    pub published_raw: String,
    /// Parsed form of `published_raw`; `None` sorts as the oldest possible date.
    pub published_at: Option<DateTime<Utc>>,
    pub summary: String,
    pub source_name: String,
}

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_latest(&self, source: &SourceDescriptor) -> Result<Vec<ReportItem>>;
    fn name(&self) -> &'static str;
}
