// SPDX-License-Identifier: PMPL-1.0-or-later
//! Bot accessibility check
//!
//! Probes the page once per bot identity in a classification group,
//! sequentially, with a jittered delay between requests so the target
//! server never sees a uniform cadence. A bot is accessible when its
//! response is 200, meets a minimum size, and is similar in size to
//! the browser-fetched baseline; without a baseline only the first two
//! conditions apply. A probe that throws is recorded as inaccessible
//! and the loop continues.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::bots::{product_visibility, BotIdentity, BotTag};
use crate::checks::{CheckContext, CheckResult, DEFAULT_MAX_SCORE};
use crate::error::Result;
use crate::fetch::FetchOptions;
use crate::snapshot::PageSnapshot;

/// Bodies smaller than this are error stubs, not pages
const MIN_CONTENT_BYTES: usize = 500;

/// Relative size tolerance against the browser baseline
const SIMILARITY_TOLERANCE: f64 = 0.30;

/// Pass threshold as a fraction of max score
const PASS_FRACTION: f64 = 0.7;

/// Two byte sizes are similar when their difference relative to their
/// average is within tolerance. Equal sizes (including both zero) are
/// always similar.
pub fn sizes_similar(a: usize, b: usize, tolerance: f64) -> bool {
    if a == b {
        return true;
    }
    let avg = (a + b) as f64 / 2.0;
    let diff = (a as f64 - b as f64).abs();
    diff / avg <= tolerance
}

#[derive(Debug, Clone)]
pub struct BotAccessCheck {
    pub max_score: f64,
    pub tag: BotTag,
    pub min_content_bytes: usize,
    pub tolerance: f64,
    display_name: String,
}

impl BotAccessCheck {
    pub fn for_tag(tag: BotTag) -> Self {
        let display_name = match tag {
            BotTag::ModelTraining => "AI training bot access",
            BotTag::UserInteraction => "AI assistant bot access",
            BotTag::SearchIndex => "AI search bot access",
        };
        Self {
            max_score: DEFAULT_MAX_SCORE,
            tag,
            min_content_bytes: MIN_CONTENT_BYTES,
            tolerance: SIMILARITY_TOLERANCE,
            display_name: display_name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.display_name
    }

    pub async fn perform(
        &self,
        ctx: &CheckContext<'_>,
        url: &str,
        snapshot: &PageSnapshot,
    ) -> Result<CheckResult> {
        let bots: Vec<&BotIdentity> = ctx.bots.iter().filter(|b| b.has_tag(self.tag)).collect();
        if bots.is_empty() {
            return Err(crate::error::Error::Internal(format!(
                "no bot identities carry tag {}",
                self.tag
            )));
        }

        let baseline = snapshot.baseline_bytes();
        let mut inaccessible: HashSet<String> = HashSet::new();
        let mut probes: Vec<serde_json::Value> = Vec::new();

        for (index, bot) in bots.iter().enumerate() {
            if index > 0 {
                // No pause before the first probe
                ctx.pace().await?;
            }

            let options = FetchOptions::with_user_agent(&bot.user_agent)
                .context(&format!("{} probe", bot.identifier))
                .max_retries(0);

            let (status, size) = match ctx.fetcher.fetch(url, &options).await {
                Ok(response) => (response.status, response.body.len()),
                Err(error) => {
                    // Recorded as inaccessible, never aborts the loop
                    warn!("{} probe failed: {}", bot.identifier, error);
                    (0, 0)
                }
            };

            let accessible = status == 200
                && size >= self.min_content_bytes
                && match baseline {
                    Some(baseline_bytes) => sizes_similar(size, baseline_bytes, self.tolerance),
                    // Bot-only mode when no browser baseline exists
                    None => true,
                };

            debug!(
                "{}: status {}, {} bytes, accessible={}",
                bot.identifier, status, size, accessible
            );
            if !accessible {
                inaccessible.insert(bot.identifier.clone());
            }
            probes.push(serde_json::json!({
                "bot": bot.identifier,
                "status": status,
                "bytes": size,
                "accessible": accessible,
            }));
        }

        // Only products served by the tested bots are in scope
        let tested: HashSet<&str> = bots.iter().map(|b| b.identifier.as_str()).collect();
        let products: Vec<_> = ctx
            .products
            .iter()
            .filter(|p| p.bots.iter().any(|b| tested.contains(b.as_str())))
            .cloned()
            .collect();

        let (visible, hidden) = product_visibility(&products, &inaccessible);
        let total = visible.len() + hidden.len();
        let fraction = if total == 0 {
            1.0
        } else {
            visible.len() as f64 / total as f64
        };
        let score = fraction * self.max_score;

        let mode = if baseline.is_some() {
            "baseline similarity"
        } else {
            "bot-only"
        };
        let details = if hidden.is_empty() {
            format!(
                "All {} products reachable by their {} bots ({} mode)",
                total,
                self.tag,
                mode
            )
        } else {
            format!(
                "{} of {} products cannot see the page ({}); {} mode",
                hidden.len(),
                total,
                hidden.join(", "),
                mode
            )
        };

        let passed = score >= self.max_score * PASS_FRACTION;
        Ok(
            CheckResult::scored(self.name(), score, self.max_score, passed, details)
                .with_metadata(serde_json::json!({ "probes": probes, "mode": mode })),
        )
    }
}
