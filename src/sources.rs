// src/sources.rs
//! Source registry: the static list of upstream feeds and APIs polled on each run.
//!
//! - Built-in default registry (`default_registry`).
//! - Optional override from a TOML or JSON file (`load_sources_from`, `load_sources_default`).
//! - Validation: unique non-empty names, feed sources carry at least one keyword.

use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SOURCES_PATH: &str = "DIGEST_SOURCES_PATH";
const DEFAULT_TOML_PATH: &str = "config/sources.toml";
const DEFAULT_JSON_PATH: &str = "config/sources.json";

/// How a source is fetched, carrying only the fields that kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// RSS/Atom feed filtered by case-insensitive keyword match.
    Feed { keywords: Vec<String> },
    /// JSON endpoint listing recent commits (GitHub REST shape).
    CommitList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
}

impl SourceDescriptor {
    pub fn feed<S: Into<String>>(name: S, url: S, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: SourceKind::Feed {
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            },
        }
    }

    pub fn commit_list<S: Into<String>>(name: S, url: S) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: SourceKind::CommitList,
        }
    }

    pub fn is_feed(&self) -> bool {
        matches!(self.kind, SourceKind::Feed { .. })
    }

    pub fn keywords(&self) -> &[String] {
        match &self.kind {
            SourceKind::Feed { keywords } => keywords,
            SourceKind::CommitList => &[],
        }
    }
}

const SUPPLY_CHAIN_KEYWORDS: &[&str] = &[
    "supply chain",
    "supply-chain",
    "npm",
    "pypi",
    "rubygems",
    "crates.io",
    "maven",
    "dependency",
    "malicious package",
    "typosquat",
    "sbom",
    "open source",
    "package registry",
    "compromised package",
    "backdoor",
];

/// The registry shipped with the binary. Feeds first, then the advisory commit listing.
pub fn default_registry() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::feed(
            "OpenSSF Blog",
            "https://openssf.org/feed/",
            SUPPLY_CHAIN_KEYWORDS,
        ),
        SourceDescriptor::feed(
            "Snyk Blog",
            "https://snyk.io/blog/feed/",
            SUPPLY_CHAIN_KEYWORDS,
        ),
        SourceDescriptor::feed(
            "The Hacker News",
            "https://feeds.feedburner.com/TheHackersNews",
            SUPPLY_CHAIN_KEYWORDS,
        ),
        SourceDescriptor::feed(
            "BleepingComputer",
            "https://www.bleepingcomputer.com/feed/",
            SUPPLY_CHAIN_KEYWORDS,
        ),
        SourceDescriptor::feed(
            "GitHub Security Blog",
            "https://github.blog/category/security/feed/",
            SUPPLY_CHAIN_KEYWORDS,
        ),
        SourceDescriptor::commit_list(
            "GitHub Advisory Database",
            "https://api.github.com/repos/github/advisory-database/commits",
        ),
    ]
}

/// Union of keywords across feed sources, first-seen order, case-insensitive dedup.
pub fn keyword_vocabulary(sources: &[SourceDescriptor]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for kw in sources.iter().flat_map(|s| s.keywords()) {
        if seen.insert(kw.to_lowercase()) {
            out.push(kw.clone());
        }
    }
    out
}

/// Load a registry from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let raw = if ext == "json" {
        parse_json(&content)?
    } else {
        parse_toml(&content)?
    };
    validate(raw).with_context(|| format!("validating sources in {}", path.display()))
}

/// Resolve the registry:
/// 1) $DIGEST_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in default
pub fn load_sources_default() -> Result<Vec<SourceDescriptor>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
    }
    for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_sources_from(&pb);
        }
    }
    Ok(default_registry())
}

#[derive(Debug, serde::Deserialize)]
struct RawSource {
    name: String,
    url: String,
    kind: String,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct RawRegistry {
    sources: Vec<RawSource>,
}

fn parse_toml(s: &str) -> Result<Vec<RawSource>> {
    let v: RawRegistry = toml::from_str(s).context("parsing sources toml")?;
    Ok(v.sources)
}

fn parse_json(s: &str) -> Result<Vec<RawSource>> {
    let v: RawRegistry = serde_json::from_str(s).context("parsing sources json")?;
    Ok(v.sources)
}

fn validate(raw: Vec<RawSource>) -> Result<Vec<SourceDescriptor>> {
    let mut names = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for r in raw {
        let name = r.name.trim().to_string();
        if name.is_empty() {
            bail!("source with url {} has an empty name", r.url);
        }
        if !names.insert(name.clone()) {
            bail!("duplicate source name: {name}");
        }
        let kind = match r.kind.trim().to_ascii_lowercase().as_str() {
            "feed" | "rss" => {
                let keywords = clean_keywords(r.keywords);
                if keywords.is_empty() {
                    bail!("feed source {name} has no keywords");
                }
                SourceKind::Feed { keywords }
            }
            "api-commit-list" | "commits" => SourceKind::CommitList,
            other => bail!("unknown source kind {other:?} for {name}"),
        };
        out.push(SourceDescriptor {
            name,
            url: r.url.trim().to_string(),
            kind,
        });
    }
    Ok(out)
}

fn clean_keywords(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
