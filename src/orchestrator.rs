// SPDX-License-Identifier: PMPL-1.0-or-later
//! Audit orchestrator
//!
//! Fetches one shared page snapshot, runs the check battery in its
//! fixed order with a jittered pacing delay before every check except
//! the first, and aggregates the weighted total. Errored checks are
//! reported but excluded from the aggregate. Cancellation aborts the
//! remaining checks; an interrupted run never reports partial results
//! as complete.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bots::{builtin_bots, builtin_products, AiProduct, BotIdentity};
use crate::checks::{default_checks, Check, CheckContext, CheckResult, PacingConfig};
use crate::classifier::LinkClassifier;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::snapshot::PageSnapshot;

/// Pacing knobs for a whole audit run
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditConfig {
    /// Delay between consecutive checks
    pub check_pacing: PacingConfig,
    /// Delay between probes inside a single check
    pub probe_pacing: PacingConfig,
}

/// Outcome of one full audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub id: Uuid,
    pub url: String,
    /// Link category of the audited domain
    pub category: String,
    pub results: Vec<CheckResult>,
    /// Sum of scores over non-errored checks
    pub score: f64,
    /// Sum of max scores over non-errored checks
    pub max_score: f64,
    /// `score / max_score` as a percentage; 0 when nothing scored
    pub percentage: f64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl AuditReport {
    pub fn errored(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| r.is_error()).collect()
    }

    pub fn failed(&self) -> Vec<&CheckResult> {
        self.results
            .iter()
            .filter(|r| !r.is_error() && !r.passed)
            .collect()
    }
}

/// Aggregate scored checks into `(score, max_score, percentage)`.
/// Errored checks contribute nothing to either side of the ratio.
fn aggregate(results: &[CheckResult]) -> (f64, f64, f64) {
    let mut score = 0.0;
    let mut max_score = 0.0;
    for result in results {
        if let Some(value) = result.score() {
            score += value;
            max_score += result.max_score;
        }
    }
    let percentage = if max_score > 0.0 {
        score / max_score * 100.0
    } else {
        0.0
    };
    (score, max_score, percentage)
}

/// Runs the check battery against one URL
pub struct Orchestrator {
    fetcher: Arc<dyn Fetcher>,
    checks: Vec<Check>,
    bots: Vec<BotIdentity>,
    products: Vec<AiProduct>,
    classifier: LinkClassifier,
    config: AuditConfig,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            checks: default_checks(),
            bots: builtin_bots(),
            products: builtin_products(),
            classifier: LinkClassifier::with_default_rules(),
            config: AuditConfig::default(),
        }
    }

    /// Replace the default check battery
    pub fn with_checks(mut self, checks: Vec<Check>) -> Self {
        self.checks = checks;
        self
    }

    pub fn with_config(mut self, config: AuditConfig) -> Self {
        self.config = config;
        self
    }

    /// Run every check against one shared snapshot of `url`.
    ///
    /// `cancel` is the run's interrupt channel: sending `true` aborts
    /// the in-flight pacing delay and returns [`Error::Cancelled`].
    pub async fn run(&self, url: &str, cancel: watch::Receiver<bool>) -> Result<AuditReport> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let category = self.classifier.classify(url).to_string();

        info!("auditing {} (category: {})", url, category);
        let snapshot = PageSnapshot::capture(self.fetcher.as_ref(), url).await?;

        let ctx = CheckContext {
            fetcher: self.fetcher.as_ref(),
            bots: &self.bots,
            products: &self.products,
            pacing: self.config.probe_pacing,
            cancel: cancel.clone(),
        };

        let mut results: Vec<CheckResult> = Vec::with_capacity(self.checks.len());
        for (index, check) in self.checks.iter().enumerate() {
            if *cancel.borrow() {
                return Err(Error::Cancelled);
            }
            if index > 0 {
                // No delay before the first check
                ctx.pause(self.config.check_pacing.next_delay()).await?;
            }

            let result = check.execute(&ctx, url, &snapshot).await?;
            match result.score() {
                Some(score) => info!(
                    "{}: {:.1}/{:.1} ({})",
                    result.name,
                    score,
                    result.max_score,
                    if result.passed { "pass" } else { "fail" }
                ),
                None => warn!("{}: errored, excluded from total", result.name),
            }
            results.push(result);
        }

        let (score, max_score, percentage) = aggregate(&results);
        info!(
            "audit finished: {:.1}/{:.1} ({:.0}%)",
            score, max_score, percentage
        );

        Ok(AuditReport {
            id: Uuid::new_v4(),
            url: url.to_string(),
            category,
            results,
            score,
            max_score,
            percentage,
            started_at,
            duration_ms: timer.elapsed().as_millis() as u64,
        })
    }
}
