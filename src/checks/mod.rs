// SPDX-License-Identifier: PMPL-1.0-or-later
//! The visibility check battery
//!
//! Every check is a variant of the closed [`Check`] enum with a
//! uniform entry point: [`Check::execute`] runs the variant's logic
//! and converts any failure into an errored [`CheckResult`], so a
//! single misbehaving check can never abort the audit. The one
//! exception is cancellation, which is a control-flow signal and
//! propagates.
//!
//! Checks:
//!
//! - **Robots.txt access**: which AI products the robots file hides
//! - **Blocking meta tags**: noindex/noai directives in the markup
//! - **X-Robots-Tag headers**: blocking directives at the HTTP layer
//! - **Structured data**: JSON-LD blocks and their declared types
//! - **Content structure**: parseability rubric over the markup
//! - **Render dependency**: client-side-rendering signatures
//! - **Response speed**: desktop/mobile latency bands
//! - **Search indexing** (per engine): `site:` query result signals
//! - **Bot access** (per classification tag): live per-identity probes
//! - **Crawl dataset**: presence in recent Common Crawl snapshots

pub mod bot_access;
pub mod content_structure;
pub mod crawl_dataset;
pub mod http_headers;
pub mod meta_tags;
pub mod render_dependency;
pub mod response_speed;
pub mod robots_txt;
pub mod search_index;
pub mod structured_data;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::bots::{AiProduct, BotIdentity, BotTag};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::snapshot::PageSnapshot;

use bot_access::BotAccessCheck;
use content_structure::ContentStructureCheck;
use crawl_dataset::CrawlDatasetCheck;
use http_headers::HttpHeaderCheck;
use meta_tags::BlockingMetaTagsCheck;
use render_dependency::RenderDependencyCheck;
use response_speed::ResponseSpeedCheck;
use robots_txt::RobotsTxtCheck;
use search_index::{SearchIndexCheck, BING, GOOGLE};
use structured_data::StructuredDataCheck;

/// Per-check score ceiling unless a check scales it
pub const DEFAULT_MAX_SCORE: f64 = 10.0;

/// What a finished check produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum CheckOutcome {
    /// The check ran to completion with a score in `0..=max_score`
    Scored(f64),
    /// The check threw; excluded from the aggregate
    Errored(String),
}

/// Result of a single check, immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub outcome: CheckOutcome,
    pub max_score: f64,
    pub passed: bool,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl CheckResult {
    pub fn scored(name: &str, score: f64, max_score: f64, passed: bool, details: String) -> Self {
        Self {
            name: name.to_string(),
            outcome: CheckOutcome::Scored(score.clamp(0.0, max_score)),
            max_score,
            passed,
            details,
            metadata: None,
        }
    }

    pub fn errored(name: &str, max_score: f64, message: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: CheckOutcome::Errored(message.to_string()),
            max_score,
            passed: false,
            details: format!("Error: {}", message),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The score when the check completed, `None` when it errored
    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            CheckOutcome::Scored(score) => Some(score),
            CheckOutcome::Errored(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Errored(_))
    }
}

/// Base delay plus random jitter, so probes never present a uniform
/// cadence to the servers being tested
#[derive(Debug, Clone, Copy)]
pub struct PacingConfig {
    pub base: Duration,
    pub jitter: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1500),
            jitter: Duration::from_millis(1000),
        }
    }
}

impl PacingConfig {
    /// Base delay plus a random share of the jitter window
    pub fn next_delay(&self) -> Duration {
        self.base + self.jitter.mul_f64(rand::random::<f64>())
    }
}

/// Everything a check needs beyond the snapshot: the fetch seam, the
/// bot registry, probe pacing, and the cancellation channel
pub struct CheckContext<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub bots: &'a [BotIdentity],
    pub products: &'a [AiProduct],
    /// Pacing between bot/engine probes inside a single check
    pub pacing: PacingConfig,
    pub cancel: watch::Receiver<bool>,
}

impl<'a> CheckContext<'a> {
    /// Sleep for `duration`, aborting promptly with [`Error::Cancelled`]
    /// when the cancellation channel fires.
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        let mut cancel = self.cancel.clone();
        tokio::select! {
            changed = cancel.wait_for(|stop| *stop) => {
                match changed {
                    Ok(_) => Err(Error::Cancelled),
                    // Sender dropped without cancelling; finish the wait
                    Err(_) => {
                        sleep(duration).await;
                        Ok(())
                    }
                }
            }
            _ = sleep(duration) => Ok(()),
        }
    }

    /// Cancellable jittered pacing pause
    pub async fn pace(&self) -> Result<()> {
        self.pause(self.pacing.next_delay()).await
    }
}

/// The closed set of checks the orchestrator runs
#[derive(Debug, Clone)]
pub enum Check {
    RobotsTxt(RobotsTxtCheck),
    BlockingMetaTags(BlockingMetaTagsCheck),
    HttpHeaders(HttpHeaderCheck),
    StructuredData(StructuredDataCheck),
    ContentStructure(ContentStructureCheck),
    RenderDependency(RenderDependencyCheck),
    ResponseSpeed(ResponseSpeedCheck),
    SearchIndex(SearchIndexCheck),
    BotAccess(BotAccessCheck),
    CrawlDataset(CrawlDatasetCheck),
}

impl Check {
    /// Display name shown in reports
    pub fn name(&self) -> &str {
        match self {
            Check::RobotsTxt(_) => "Robots.txt access",
            Check::BlockingMetaTags(_) => "Blocking meta tags",
            Check::HttpHeaders(_) => "X-Robots-Tag headers",
            Check::StructuredData(_) => "Structured data",
            Check::ContentStructure(_) => "Content structure",
            Check::RenderDependency(_) => "Render dependency",
            Check::ResponseSpeed(_) => "Response speed",
            Check::SearchIndex(check) => check.name(),
            Check::BotAccess(check) => check.name(),
            Check::CrawlDataset(_) => "Common Crawl presence",
        }
    }

    pub fn max_score(&self) -> f64 {
        match self {
            Check::RobotsTxt(c) => c.max_score,
            Check::BlockingMetaTags(c) => c.max_score,
            Check::HttpHeaders(c) => c.max_score,
            Check::StructuredData(c) => c.max_score,
            Check::ContentStructure(c) => c.max_score,
            Check::RenderDependency(c) => c.max_score,
            Check::ResponseSpeed(c) => c.max_score,
            Check::SearchIndex(c) => c.max_score,
            Check::BotAccess(c) => c.max_score,
            Check::CrawlDataset(c) => c.max_score,
        }
    }

    /// Run the check behind the error-isolation boundary.
    ///
    /// Any failure inside the check body (network, missing snapshot
    /// capture, parse error) becomes an errored [`CheckResult`];
    /// cancellation alone propagates as `Err`.
    pub async fn execute(
        &self,
        ctx: &CheckContext<'_>,
        url: &str,
        snapshot: &PageSnapshot,
    ) -> Result<CheckResult> {
        debug!("running check: {}", self.name());
        match self.perform(ctx, url, snapshot).await {
            Ok(result) => Ok(result),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(error) => {
                warn!("check '{}' errored: {}", self.name(), error);
                Ok(CheckResult::errored(
                    self.name(),
                    self.max_score(),
                    &error.to_string(),
                ))
            }
        }
    }

    async fn perform(
        &self,
        ctx: &CheckContext<'_>,
        url: &str,
        snapshot: &PageSnapshot,
    ) -> Result<CheckResult> {
        match self {
            Check::RobotsTxt(check) => check.perform(ctx, url).await,
            Check::BlockingMetaTags(check) => check.perform(ctx, snapshot),
            Check::HttpHeaders(check) => check.perform(snapshot),
            Check::StructuredData(check) => check.perform(snapshot),
            Check::ContentStructure(check) => check.perform(snapshot),
            Check::RenderDependency(check) => check.perform(snapshot),
            Check::ResponseSpeed(check) => check.perform(snapshot),
            Check::SearchIndex(check) => check.perform(ctx, url).await,
            Check::BotAccess(check) => check.perform(ctx, url, snapshot).await,
            Check::CrawlDataset(check) => check.perform(ctx, url).await,
        }
    }
}

/// The default battery in its fixed execution order
pub fn default_checks() -> Vec<Check> {
    vec![
        Check::RobotsTxt(RobotsTxtCheck::default()),
        Check::BlockingMetaTags(BlockingMetaTagsCheck::default()),
        Check::HttpHeaders(HttpHeaderCheck::default()),
        Check::StructuredData(StructuredDataCheck::default()),
        Check::ContentStructure(ContentStructureCheck::default()),
        Check::RenderDependency(RenderDependencyCheck::default()),
        Check::ResponseSpeed(ResponseSpeedCheck::default()),
        Check::SearchIndex(SearchIndexCheck::new(&GOOGLE)),
        Check::SearchIndex(SearchIndexCheck::new(&BING)),
        Check::CrawlDataset(CrawlDatasetCheck::default()),
        Check::BotAccess(BotAccessCheck::for_tag(BotTag::ModelTraining)),
        Check::BotAccess(BotAccessCheck::for_tag(BotTag::UserInteraction)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_clamps_into_range() {
        let result = CheckResult::scored("t", 12.0, 10.0, true, String::new());
        assert_eq!(result.score(), Some(10.0));
        let result = CheckResult::scored("t", -3.0, 10.0, false, String::new());
        assert_eq!(result.score(), Some(0.0));
    }

    #[test]
    fn test_errored_result_shape() {
        let result = CheckResult::errored("t", 10.0, "missing desktop capture");
        assert!(result.is_error());
        assert!(!result.passed);
        assert_eq!(result.score(), None);
        assert!(result.details.starts_with("Error: "));
    }

    #[test]
    fn test_default_battery_order_is_stable() {
        let names: Vec<String> = default_checks()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names.first().map(String::as_str), Some("Robots.txt access"));
        assert_eq!(
            names.last().map(String::as_str),
            Some("AI assistant bot access")
        );
        assert_eq!(names.len(), 12);
        // Fixed order, twice in a row
        let again: Vec<String> = default_checks()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, again);
    }

    #[test]
    fn test_pacing_delay_within_window() {
        let pacing = PacingConfig {
            base: Duration::from_millis(100),
            jitter: Duration::from_millis(50),
        };
        for _ in 0..50 {
            let delay = pacing.next_delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[tokio::test]
    async fn test_pause_cancellation() {
        use crate::fetch::{FetchOptions, FetchedResponse};
        use async_trait::async_trait;

        struct NoFetcher;
        #[async_trait]
        impl Fetcher for NoFetcher {
            async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<FetchedResponse> {
                Err(Error::Fetch {
                    url: url.to_string(),
                    message: "offline".to_string(),
                })
            }
        }

        let (tx, rx) = watch::channel(false);
        let ctx = CheckContext {
            fetcher: &NoFetcher,
            bots: &[],
            products: &[],
            pacing: PacingConfig::default(),
            cancel: rx,
        };

        tx.send(true).expect("receiver alive");
        let result = ctx.pause(Duration::from_secs(60)).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
