// SPDX-License-Identifier: PMPL-1.0-or-later
//! Crawl dataset presence check
//!
//! Common Crawl is the feedstock for most open training corpora; a
//! domain absent from recent snapshots is effectively invisible to the
//! models trained on them. The check lists the most recent snapshot
//! ids from the collinfo index, then queries each one for the domain.
//! The index API returns newline-delimited records on a hit and an
//! empty body on a miss, so any non-empty body is a positive signal.

use tracing::{debug, warn};

use crate::checks::{CheckContext, CheckResult, DEFAULT_MAX_SCORE};
use crate::classifier::normalize_host;
use crate::error::{Error, Result};
use crate::fetch::{FetchOptions, DESKTOP_BROWSER_UA};

/// How many recent snapshots to query
const SNAPSHOT_LIMIT: usize = 3;

const INDEX_BASE: &str = "https://index.commoncrawl.org";

#[derive(Debug, Clone)]
pub struct CrawlDatasetCheck {
    pub max_score: f64,
    pub snapshot_limit: usize,
    pub index_base: String,
}

impl Default for CrawlDatasetCheck {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
            snapshot_limit: SNAPSHOT_LIMIT,
            index_base: INDEX_BASE.to_string(),
        }
    }
}

impl CrawlDatasetCheck {
    pub async fn perform(&self, ctx: &CheckContext<'_>, url: &str) -> Result<CheckResult> {
        let domain = normalize_host(url);
        let options = FetchOptions::with_user_agent(DESKTOP_BROWSER_UA).context("crawl index");

        let collinfo_url = format!("{}/collinfo.json", self.index_base);
        let response = ctx.fetcher.fetch(&collinfo_url, &options).await?;
        if !response.ok() {
            return Err(Error::InvalidResponse(format!(
                "crawl index listing returned status {}",
                response.status
            )));
        }

        let listing = response.json()?;
        let snapshot_ids: Vec<String> = listing
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.get("id").and_then(|id| id.as_str()))
                    .take(self.snapshot_limit)
                    .map(|id| id.to_string())
                    .collect()
            })
            .unwrap_or_default();

        if snapshot_ids.is_empty() {
            return Err(Error::InvalidResponse(
                "crawl index listing had no snapshot ids".to_string(),
            ));
        }

        let encoded: String =
            url::form_urlencoded::byte_serialize(format!("{}/*", domain).as_bytes()).collect();

        let mut found_in: Option<String> = None;
        for (index, id) in snapshot_ids.iter().enumerate() {
            if index > 0 {
                ctx.pace().await?;
            }

            let query_url = format!("{}/{}-index?url={}&output=json", self.index_base, id, encoded);
            match ctx.fetcher.fetch(&query_url, &options).await {
                Ok(response) => {
                    if response.status == 200 && !response.body.trim().is_empty() {
                        debug!("{} present in crawl snapshot {}", domain, id);
                        found_in = Some(id.clone());
                        break;
                    }
                }
                Err(error) => {
                    // One unreachable snapshot is a miss, not a failure
                    warn!("crawl snapshot {} query failed: {}", id, error);
                }
            }
        }

        let (score, passed, details) = match found_in {
            Some(id) => (
                self.max_score,
                true,
                format!("{} is present in crawl snapshot {}", domain, id),
            ),
            None => (
                0.0,
                false,
                format!(
                    "{} not found in {} recent crawl snapshot(s): {}",
                    domain,
                    snapshot_ids.len(),
                    snapshot_ids.join(", ")
                ),
            ),
        };

        Ok(CheckResult::scored(
            "Common Crawl presence",
            score,
            self.max_score,
            passed,
            details,
        ))
    }
}
