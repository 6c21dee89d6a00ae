// SPDX-License-Identifier: PMPL-1.0-or-later
//! End-to-end audit flow tests over a scripted fetcher

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use visibilitybot::checks::{
    http_headers::HttpHeaderCheck, robots_txt::RobotsTxtCheck,
    structured_data::StructuredDataCheck, crawl_dataset::CrawlDatasetCheck, Check, PacingConfig,
};
use visibilitybot::error::{Error, Result};
use visibilitybot::fetch::{FetchOptions, FetchedResponse, Fetcher};
use visibilitybot::orchestrator::{AuditConfig, Orchestrator};

const PAGE_URL: &str = "https://example.com";
const ROBOTS_URL: &str = "https://example.com/robots.txt";

/// Scripted fetcher: canned responses keyed by URL, call counting
struct RouteFetcher {
    routes: HashMap<String, FetchedResponse>,
    calls: Mutex<HashMap<String, usize>>,
}

impl RouteFetcher {
    fn new(routes: Vec<(&str, FetchedResponse)>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|(url, response)| (url.to_string(), response))
                .collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn call_count(&self, url: &str) -> usize {
        *self.calls.lock().unwrap().get(url).unwrap_or(&0)
    }
}

#[async_trait]
impl Fetcher for RouteFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<FetchedResponse> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        match self.routes.get(url) {
            Some(response) => Ok(response.clone()),
            None => Err(Error::Fetch {
                url: url.to_string(),
                message: "no route".to_string(),
            }),
        }
    }
}

fn response(status: u16, headers: Vec<(&str, &str)>, body: &str) -> FetchedResponse {
    FetchedResponse {
        status,
        headers: headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: body.to_string(),
    }
}

fn fast_config() -> AuditConfig {
    let pacing = PacingConfig {
        base: Duration::from_millis(1),
        jitter: Duration::from_millis(1),
    };
    AuditConfig {
        check_pacing: pacing,
        probe_pacing: pacing,
    }
}

const FAQ_PAGE: &str = r#"<html lang="en"><head>
    <script type="application/ld+json">{"@context":"https://schema.org","@type":"FAQPage"}</script>
</head><body><main><h1>Questions</h1><p>Answers live here.</p></main></body></html>"#;

fn not_cancelled() -> watch::Receiver<bool> {
    // Dropping the sender closes the channel without ever signalling
    // a cancel; pacing pauses then simply run to completion
    let (_tx, rx) = watch::channel(false);
    rx
}

#[tokio::test]
async fn test_header_noindex_zeroes_header_check_regardless_of_html() {
    let fetcher = Arc::new(RouteFetcher::new(vec![
        (
            PAGE_URL,
            response(200, vec![("X-Robots-Tag", "noindex")], FAQ_PAGE),
        ),
        (ROBOTS_URL, response(404, vec![], "not found")),
    ]));

    let orchestrator = Orchestrator::new(fetcher)
        .with_config(fast_config())
        .with_checks(vec![
            Check::RobotsTxt(RobotsTxtCheck::default()),
            Check::HttpHeaders(HttpHeaderCheck::default()),
            Check::StructuredData(StructuredDataCheck::default()),
        ]);

    let report = orchestrator.run(PAGE_URL, not_cancelled()).await.unwrap();
    assert_eq!(report.results.len(), 3);

    // Missing robots.txt means unrestricted: full score
    assert_eq!(report.results[0].score(), Some(10.0));
    assert!(report.results[0].passed);

    // The header blocks everything even though the HTML is clean
    assert_eq!(report.results[1].score(), Some(0.0));
    assert!(!report.results[1].passed);

    // One FAQPage type, 10% bonus
    let expected = (1.0 / 3.0) * 10.0 * 1.1;
    assert!((report.results[2].score().unwrap() - expected).abs() < 1e-9);

    let expected_percentage = (10.0 + 0.0 + expected) / 30.0 * 100.0;
    assert!((report.percentage - expected_percentage).abs() < 1e-9);
}

#[tokio::test]
async fn test_errored_check_excluded_from_percentage() {
    // No route for the crawl index: that check errors; the header
    // check scores full
    let fetcher = Arc::new(RouteFetcher::new(vec![(
        PAGE_URL,
        response(200, vec![], FAQ_PAGE),
    )]));

    let orchestrator = Orchestrator::new(fetcher)
        .with_config(fast_config())
        .with_checks(vec![
            Check::HttpHeaders(HttpHeaderCheck::default()),
            Check::CrawlDataset(CrawlDatasetCheck::default()),
        ]);

    let report = orchestrator.run(PAGE_URL, not_cancelled()).await.unwrap();

    assert!(report.results[1].is_error());
    assert_eq!(report.errored().len(), 1);
    // The errored check's max must not dilute the ratio: 10/10, not 10/20
    assert_eq!(report.score, 10.0);
    assert_eq!(report.max_score, 10.0);
    assert_eq!(report.percentage, 100.0);
}

#[tokio::test]
async fn test_snapshot_fetched_once_per_device() {
    let fetcher = Arc::new(RouteFetcher::new(vec![
        (PAGE_URL, response(200, vec![], FAQ_PAGE)),
        (ROBOTS_URL, response(404, vec![], "")),
    ]));

    let orchestrator = Orchestrator::new(fetcher.clone())
        .with_config(fast_config())
        .with_checks(vec![
            Check::HttpHeaders(HttpHeaderCheck::default()),
            Check::StructuredData(StructuredDataCheck::default()),
            Check::RobotsTxt(RobotsTxtCheck::default()),
        ]);

    orchestrator.run(PAGE_URL, not_cancelled()).await.unwrap();

    // Desktop + mobile capture only; the three checks share the snapshot
    assert_eq!(fetcher.call_count(PAGE_URL), 2);
    assert_eq!(fetcher.call_count(ROBOTS_URL), 1);
}

#[tokio::test]
async fn test_precancelled_run_aborts() {
    let fetcher = Arc::new(RouteFetcher::new(vec![(
        PAGE_URL,
        response(200, vec![], FAQ_PAGE),
    )]));

    let orchestrator = Orchestrator::new(fetcher)
        .with_config(fast_config())
        .with_checks(vec![Check::HttpHeaders(HttpHeaderCheck::default())]);

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let result = orchestrator.run(PAGE_URL, rx).await;
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[tokio::test]
async fn test_cancellation_during_pacing_stops_remaining_checks() {
    let fetcher = Arc::new(RouteFetcher::new(vec![
        (PAGE_URL, response(200, vec![], FAQ_PAGE)),
        (ROBOTS_URL, response(404, vec![], "")),
    ]));

    let slow = PacingConfig {
        base: Duration::from_secs(30),
        jitter: Duration::from_millis(1),
    };
    let orchestrator = Orchestrator::new(fetcher.clone())
        .with_config(AuditConfig {
            check_pacing: slow,
            probe_pacing: slow,
        })
        .with_checks(vec![
            Check::HttpHeaders(HttpHeaderCheck::default()),
            Check::RobotsTxt(RobotsTxtCheck::default()),
        ]);

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(true);
    });

    let started = std::time::Instant::now();
    let result = orchestrator.run(PAGE_URL, rx).await;

    // Aborted during the 30s inter-check delay, promptly
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
    // The second check never fetched robots.txt
    assert_eq!(fetcher.call_count(ROBOTS_URL), 0);
}

#[tokio::test]
async fn test_fetch_failure_of_both_devices_fails_the_run() {
    let fetcher = Arc::new(RouteFetcher::new(vec![]));
    let orchestrator = Orchestrator::new(fetcher).with_config(fast_config());
    let result = orchestrator.run(PAGE_URL, not_cancelled()).await;
    assert!(result.is_err());
}
