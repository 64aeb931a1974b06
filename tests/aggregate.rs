// tests/aggregate.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use supply_chain_digest::{Aggregator, ReportItem, SourceDescriptor, SourceFetcher};

/// Serves canned items per source name and records the visit order.
struct MockFetcher {
    label: &'static str,
    calls: Arc<Mutex<Vec<String>>>,
}

fn item(source: &str, title: &str, day: Option<u32>) -> ReportItem {
    ReportItem {
        title: title.to_string(),
        link: format!("https://example.test/{title}"),
        published_raw: day
            .map(|d| format!("2024-03-{d:02}T00:00:00Z"))
            .unwrap_or_else(|| "???".to_string()),
        published_at: day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()),
        summary: "s".to_string(),
        source_name: source.to_string(),
    }
}

#[async_trait]
impl SourceFetcher for MockFetcher {
    async fn fetch_latest(&self, source: &SourceDescriptor) -> Result<Vec<ReportItem>> {
        self.calls.lock().unwrap().push(source.name.clone());
        match source.name.as_str() {
            "Feed A" => Ok(vec![
                item("Feed A", "a-undated", None),
                item("Feed A", "a-3", Some(3)),
            ]),
            "Feed B" => Ok(vec![item("Feed B", "b-9", Some(9))]),
            "Broken Feed" => bail!("connection reset"),
            "Commits" => Ok(vec![
                item("Commits", "c-5", Some(5)),
                item("Commits", "c-1", Some(1)),
            ]),
            _ => Ok(vec![]),
        }
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

fn registry() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::feed("Feed A", "https://a.test/feed", &["npm"]),
        SourceDescriptor::commit_list("Commits", "https://api.test/commits"),
        SourceDescriptor::feed("Broken Feed", "https://broken.test/feed", &["npm"]),
        SourceDescriptor::feed("Feed B", "https://b.test/feed", &["npm"]),
    ]
}

fn aggregator(calls: &Arc<Mutex<Vec<String>>>) -> Aggregator {
    Aggregator::new(
        Box::new(MockFetcher {
            label: "mock-feed",
            calls: calls.clone(),
        }),
        Box::new(MockFetcher {
            label: "mock-commits",
            calls: calls.clone(),
        }),
    )
    .with_delay(Duration::ZERO)
}

#[tokio::test]
async fn feeds_are_visited_before_api_sources_in_registry_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    aggregator(&calls).run(&registry()).await;
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["Feed A", "Broken Feed", "Feed B", "Commits"]
    );
}

#[tokio::test]
async fn failed_source_contributes_nothing_and_run_continues() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let rr = aggregator(&calls).run(&registry()).await;

    // 2 (Feed A) + 0 (Broken) + 1 (Feed B) + 2 (Commits)
    assert_eq!(rr.total(), 5);
    assert!(!rr.source_names().contains(&"Broken Feed".to_string()));
}

#[tokio::test]
async fn records_are_sorted_newest_first_with_undated_last() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let rr = aggregator(&calls).run(&registry()).await;

    let titles: Vec<_> = rr.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["b-9", "c-5", "a-3", "c-1", "a-undated"]);

    for pair in rr.items.windows(2) {
        match (pair[0].published_at, pair[1].published_at) {
            (Some(x), Some(y)) => assert!(x >= y),
            (None, Some(_)) => panic!("undated record placed ahead of a dated one"),
            _ => {}
        }
    }
}

#[tokio::test]
async fn every_record_lands_in_exactly_one_bucket() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let rr = aggregator(&calls).run(&registry()).await;

    assert_eq!(
        rr.source_names(),
        vec!["Feed B".to_string(), "Commits".into(), "Feed A".into()]
    );
    let bucketed: usize = rr.buckets.iter().map(|b| b.items.len()).sum();
    assert_eq!(bucketed, rr.total());
    for b in &rr.buckets {
        assert!(b.items.iter().all(|i| i.source_name == b.name));
    }
    let feed_a = rr.buckets.iter().find(|b| b.name == "Feed A").unwrap();
    let order: Vec<_> = feed_a.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(order, vec!["a-3", "a-undated"]);
}

#[tokio::test]
async fn empty_registry_gives_empty_result() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let rr = aggregator(&calls).run(&[]).await;
    assert_eq!(rr.total(), 0);
    assert!(rr.buckets.is_empty());
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn courtesy_delay_follows_every_source() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let agg = aggregator(&calls).with_delay(Duration::from_secs(1));
    let t0 = tokio::time::Instant::now();
    agg.run(&registry()).await;
    assert!(t0.elapsed() >= Duration::from_secs(4));
}
