// src/ingest/feed.rs
//! RSS 2.0 / RSS 1.0 / Atom feed fetcher with keyword filtering.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;

use crate::ingest::types::{ReportItem, SourceFetcher};
use crate::ingest::{clip_summary, normalize_text, parse_published, take_chars, NO_SUMMARY};
use crate::sources::{SourceDescriptor, SourceKind};

/// Relevant items kept per feed, in feed order.
pub const MAX_ITEMS_PER_FEED: usize = 5;

/// One feed entry with every field optional, as feeds in the wild are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    /// Plain-text rendering of the description/summary (or content).
    pub snippet: Option<String>,
    /// Raw body: `content:encoded` / Atom `content`, else the description.
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
    Description,
    Content,
}

impl Field {
    /// Entry field carried by an element, keyed on its namespace prefix and local name.
    /// Only unprefixed (RSS/Atom default namespace), `atom:`, `content:` and Dublin Core
    /// elements count; `media:content`, `itunes:summary` and friends do not.
    fn from_qname(prefix: Option<&[u8]>, local: &[u8]) -> Option<Self> {
        match (prefix, local) {
            (None | Some(b"atom"), b"title") => Some(Self::Title),
            (None | Some(b"atom"), b"link") => Some(Self::Link),
            (None, b"pubDate") | (None | Some(b"atom"), b"published") => Some(Self::Published),
            (Some(b"dc" | b"dcterms"), b"date" | b"issued") => Some(Self::Published),
            (None | Some(b"atom"), b"updated") | (Some(b"dcterms"), b"modified") => {
                Some(Self::Updated)
            }
            (None | Some(b"atom"), b"description" | b"summary") => Some(Self::Description),
            (Some(b"content"), b"encoded") | (None | Some(b"atom"), b"content") => {
                Some(Self::Content)
            }
            _ => None,
        }
    }
}

#[derive(Default)]
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    description: Option<String>,
    content: Option<String>,
}

impl RawEntry {
    fn set(&mut self, field: Field, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::Description => &mut self.description,
            Field::Content => &mut self.content,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn finish(self) -> FeedEntry {
        let content = self.content.or_else(|| self.description.clone());
        let snippet = self
            .description
            .as_deref()
            .or(content.as_deref())
            .map(normalize_text)
            .filter(|s| !s.is_empty());
        FeedEntry {
            title: self.title.map(|t| normalize_text(&t)).filter(|t| !t.is_empty()),
            link: self.link,
            published: self.published.or(self.updated),
            snippet,
            content,
        }
    }
}

/// Atom `<link href=".." rel="alternate"/>`; other rels (self, enclosure, ...) are skipped.
fn atom_link_href(e: &BytesStart<'_>) -> Option<String> {
    let rel = e
        .try_get_attribute("rel")
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
    if rel.as_deref().is_some_and(|r| r != "alternate") {
        return None;
    }
    e.try_get_attribute("href")
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse any supported feed document into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let mut reader = Reader::from_str(&xml_clean);
    reader.config_mut().trim_text(true);

    let mut root_seen = false;
    let mut entries = Vec::new();
    let mut current: Option<RawEntry> = None;
    // (field or None when skipping, nesting depth inside the element, accumulated text)
    let mut open: Option<(Option<Field>, usize, String)> = None;

    loop {
        match reader.read_event().context("reading feed xml")? {
            Event::Start(e) => {
                let local = e.local_name();
                let name = local.into_inner();
                if !root_seen {
                    match name {
                        b"rss" | b"RDF" | b"feed" => root_seen = true,
                        other => bail!(
                            "unrecognised feed root element <{}>",
                            String::from_utf8_lossy(other)
                        ),
                    }
                    continue;
                }
                if let Some((_, depth, _)) = open.as_mut() {
                    *depth += 1;
                    continue;
                }
                if name == b"item" || name == b"entry" {
                    current = Some(RawEntry::default());
                    continue;
                }
                if let Some(entry) = current.as_mut() {
                    let qname = e.name();
                    let prefix = qname.prefix().map(|p| p.into_inner());
                    match Field::from_qname(prefix, name) {
                        Some(field) => {
                            if field == Field::Link {
                                if let Some(href) = atom_link_href(&e) {
                                    entry.set(Field::Link, href);
                                }
                            }
                            open = Some((Some(field), 0, String::new()));
                        }
                        // foreign extension element: swallow its whole subtree
                        None if prefix.is_some() => open = Some((None, 0, String::new())),
                        None => {}
                    }
                }
            }
            Event::Empty(e) => {
                if open.is_some() {
                    continue;
                }
                if let Some(entry) = current.as_mut() {
                    let qname = e.name();
                    let prefix = qname.prefix().map(|p| p.into_inner());
                    if Field::from_qname(prefix, e.local_name().into_inner()) == Some(Field::Link) {
                        if let Some(href) = atom_link_href(&e) {
                            entry.set(Field::Link, href);
                        }
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, _, buf)) = open.as_mut() {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    if !buf.is_empty() {
                        buf.push(' ');
                    }
                    buf.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some((_, _, buf)) = open.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                if let Some((field, depth, buf)) = open.as_mut() {
                    if *depth > 0 {
                        *depth -= 1;
                        continue;
                    }
                    let (field, value) = (*field, std::mem::take(buf));
                    open = None;
                    if let (Some(field), Some(entry)) = (field, current.as_mut()) {
                        entry.set(field, value);
                    }
                    continue;
                }
                let name = e.local_name().into_inner();
                if name == b"item" || name == b"entry" {
                    if let Some(entry) = current.take() {
                        entries.push(entry.finish());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(anyhow!("empty feed document"));
    }
    Ok(entries)
}

/// True iff any keyword (case-insensitive) occurs in the entry's title, snippet or content.
pub fn matches_keywords(entry: &FeedEntry, keywords: &[String]) -> bool {
    let haystack = format!(
        "{} {} {}",
        entry.title.as_deref().unwrap_or_default(),
        entry.snippet.as_deref().unwrap_or_default(),
        entry
            .content
            .as_deref()
            .map(normalize_text)
            .unwrap_or_default()
    )
    .to_lowercase();
    keywords
        .iter()
        .map(|k| k.to_lowercase())
        .any(|k| !k.is_empty() && haystack.contains(&k))
}

/// Summary text: snippet, else clipped plain-text content, else the placeholder.
pub fn entry_summary(entry: &FeedEntry) -> String {
    if let Some(snippet) = entry.snippet.as_deref() {
        return clip_summary(snippet);
    }
    // markup-only bodies (a lone <img>) normalize to nothing
    match entry.content.as_deref().map(normalize_text) {
        Some(text) if !text.is_empty() => {
            format!("{}...", take_chars(&text, crate::ingest::SUMMARY_MAX_CHARS))
        }
        _ => NO_SUMMARY.to_string(),
    }
}

/// Keyword filter, cap at `MAX_ITEMS_PER_FEED` in feed order, normalize.
pub fn select_relevant(
    entries: Vec<FeedEntry>,
    keywords: &[String],
    source_name: &str,
) -> Vec<ReportItem> {
    entries
        .into_iter()
        .filter(|e| matches_keywords(e, keywords))
        .take(MAX_ITEMS_PER_FEED)
        .map(|e| {
            let published_raw = e.published.clone().unwrap_or_default();
            ReportItem {
                title: e.title.clone().unwrap_or_else(|| "Untitled".to_string()),
                link: e.link.clone().unwrap_or_default(),
                published_at: parse_published(&published_raw),
                published_raw,
                summary: entry_summary(&e),
                source_name: source_name.to_string(),
            }
        })
        .collect()
}

pub struct FeedFetcher {
    client: Client,
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Parse an already-retrieved document for `source`.
    pub fn parse_for_source(xml: &str, source: &SourceDescriptor) -> Result<Vec<ReportItem>> {
        let SourceKind::Feed { keywords } = &source.kind else {
            bail!("{} is not a feed source", source.name);
        };
        let t0 = std::time::Instant::now();
        let entries =
            parse_feed(xml).with_context(|| format!("parsing feed for {}", source.name))?;
        let total = entries.len();
        let out = select_relevant(entries, keywords, &source.name);

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("digest_parse_ms").record(ms);
        tracing::debug!(
            target: "ingest",
            source = %source.name,
            total,
            relevant = out.len(),
            "feed filtered"
        );
        Ok(out)
    }
}

#[async_trait]
impl SourceFetcher for FeedFetcher {
    async fn fetch_latest(&self, source: &SourceDescriptor) -> Result<Vec<ReportItem>> {
        let body = self
            .client
            .get(&source.url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("feed http get {}", source.url))?
            .error_for_status()
            .context("feed non-2xx")?
            .text()
            .await
            .context("feed http .text()")?;
        Self::parse_for_source(&body, source)
    }

    fn name(&self) -> &'static str {
        "feed"
    }
}

/// HTML entities that are common in feeds but undefined in XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
