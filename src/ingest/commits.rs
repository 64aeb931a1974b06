// src/ingest/commits.rs
//! Commit-listing API fetcher (GitHub REST `/repos/{owner}/{repo}/commits` shape).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::types::{ReportItem, SourceFetcher};
use crate::ingest::{parse_published, take_chars, SUMMARY_MAX_CHARS};
use crate::sources::{SourceDescriptor, SourceKind};

/// Most recent entries kept, in the order the endpoint returns them.
pub const MAX_COMMITS: usize = 3;

#[derive(Debug, Deserialize)]
struct CommitEntry {
    #[serde(default)]
    html_url: String,
    commit: CommitBody,
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    date: String,
}

/// Map a commit listing body to at most `MAX_COMMITS` records.
pub fn parse_commits(body: &str, source_name: &str) -> Result<Vec<ReportItem>> {
    let entries: Vec<CommitEntry> =
        serde_json::from_str(body).context("parsing commit listing json")?;
    Ok(entries
        .into_iter()
        .take(MAX_COMMITS)
        .map(|c| {
            let published_raw = c.commit.author.map(|a| a.date).unwrap_or_default();
            let title = c
                .commit
                .message
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            ReportItem {
                title,
                link: c.html_url,
                published_at: parse_published(&published_raw),
                published_raw,
                summary: format!("{}...", take_chars(&c.commit.message, SUMMARY_MAX_CHARS)),
                source_name: source_name.to_string(),
            }
        })
        .collect())
}

pub struct CommitListFetcher {
    client: Client,
    timeout: Duration,
    token: Option<String>,
}

impl CommitListFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            token: None,
        }
    }

    /// Bearer token supplied by the hosting environment (raises the API rate limit).
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

#[async_trait]
impl SourceFetcher for CommitListFetcher {
    async fn fetch_latest(&self, source: &SourceDescriptor) -> Result<Vec<ReportItem>> {
        if !matches!(source.kind, SourceKind::CommitList) {
            bail!("{} is not a commit-list source", source.name);
        }
        let mut req = self
            .client
            .get(&source.url)
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let body = req
            .send()
            .await
            .with_context(|| format!("commit api get {}", source.url))?
            .error_for_status()
            .context("commit api non-2xx")?
            .text()
            .await
            .context("commit api .text()")?;

        let t0 = std::time::Instant::now();
        let out = parse_commits(&body, &source.name)?;
        histogram!("digest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "commit-list"
    }
}
