// src/alerts.rs
//! Critical-term scan over a rendered report. Informational only: callers log the hits.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_CRITICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(critical|zero-day|widespread|major breach)\b").expect("critical regex")
});

/// Distinct critical terms found in `markdown`, lowercased, first-seen order.
pub fn scan_critical(markdown: &str) -> Vec<String> {
    let mut hits: Vec<String> = Vec::new();
    for m in RE_CRITICAL.find_iter(markdown) {
        let term = m.as_str().to_lowercase();
        if !hits.contains(&term) {
            hits.push(term);
        }
    }
    hits
}
