// src/ingest/mod.rs
pub mod commits;
pub mod feed;
pub mod types;

use crate::ingest::types::{ReportItem, SourceFetcher};
use crate::sources::SourceDescriptor;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

pub const SUMMARY_MAX_CHARS: usize = 200;
pub const NO_SUMMARY: &str = "No summary available";

/// One-time metrics registration.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_items_total", "Relevant items produced by fetchers.");
        describe_counter!(
            "digest_provider_errors_total",
            "Source fetch/parse errors (source skipped)."
        );
        describe_histogram!("digest_parse_ms", "Source parse time in milliseconds.");
    });
}

/// Plain text from markup: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// First `max` chars of `s` (char-boundary safe).
pub fn take_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// `s` cut to `SUMMARY_MAX_CHARS` chars plus `...` if it was longer.
pub fn clip_summary(s: &str) -> String {
    if s.chars().count() > SUMMARY_MAX_CHARS {
        format!("{}...", take_chars(s, SUMMARY_MAX_CHARS))
    } else {
        s.to_string()
    }
}

/// Parse a source-provided date: RFC 2822 (RSS), then RFC 3339 (Atom, GitHub).
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    OffsetDateTime::parse(raw, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()))
        // obsolete zone names ("EST", "PDT") are only understood by chrono
        .or_else(|| {
            DateTime::parse_from_rfc2822(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Run a fetcher and turn any failure into an empty contribution.
pub async fn fetch_or_empty(
    fetcher: &dyn SourceFetcher,
    source: &SourceDescriptor,
) -> Vec<ReportItem> {
    ensure_metrics_described();
    match fetcher.fetch_latest(source).await {
        Ok(items) => {
            counter!("digest_items_total").increment(items.len() as u64);
            tracing::info!(
                target: "ingest",
                source = %source.name,
                fetcher = fetcher.name(),
                items = items.len(),
                "source fetched"
            );
            items
        }
        Err(e) => {
            tracing::warn!(
                target: "ingest",
                error = ?e,
                source = %source.name,
                fetcher = fetcher.name(),
                "source skipped"
            );
            counter!("digest_provider_errors_total").increment(1);
            Vec::new()
        }
    }
}
