// SPDX-License-Identifier: PMPL-1.0-or-later
//! Robots.txt check
//!
//! Fetches `/robots.txt` and runs a small directive parser once per
//! known bot identity. The model is deliberately narrow: a single
//! current-user-agent register, and only a root or empty `Disallow:`
//! path counts as a block (an applicable `Allow:` of the same shape
//! clears it). Blocked bots map through the bot-to-product relation
//! and the score scales with the fraction of products still visible.
//!
//! Fail-open: a missing (404) or unreachable robots.txt means
//! unrestricted crawling, full score.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::bots::product_visibility;
use crate::checks::{CheckContext, CheckResult, DEFAULT_MAX_SCORE};
use crate::error::Result;
use crate::fetch::{FetchOptions, DESKTOP_BROWSER_UA};

#[derive(Debug, Clone)]
pub struct RobotsTxtCheck {
    pub max_score: f64,
}

impl Default for RobotsTxtCheck {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

/// Derive the robots.txt URL for a page URL
fn robots_url(page_url: &str) -> Result<String> {
    let mut parsed = url::Url::parse(page_url)?;
    parsed.set_path("/robots.txt");
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}

/// Whether `robots` blocks the given bot identifier.
///
/// Single-register state machine: every `User-agent:` line replaces
/// the register; `Disallow:`/`Allow:` lines apply while the register
/// is `*` or the bot's own identifier (case-insensitive). Only a `/`
/// or empty path triggers the block, and any applicable `Allow:` of
/// that shape clears a prior block.
pub fn is_bot_blocked(robots: &str, bot_id: &str) -> bool {
    let bot_lower = bot_id.to_lowercase();
    let mut register: Option<String> = None;
    let mut blocked = false;

    for raw_line in robots.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((directive, value)) = line.split_once(':') else {
            continue;
        };
        let directive = directive.trim().to_lowercase();
        let value = value.trim();

        match directive.as_str() {
            "user-agent" => {
                register = Some(value.to_lowercase());
            }
            "disallow" | "allow" => {
                let applies = match register.as_deref() {
                    Some(agent) => agent == "*" || agent == bot_lower,
                    None => false,
                };
                let root_path = value.is_empty() || value == "/";
                if applies && root_path {
                    blocked = directive == "disallow";
                }
            }
            _ => {}
        }
    }

    blocked
}

impl RobotsTxtCheck {
    pub async fn perform(&self, ctx: &CheckContext<'_>, url: &str) -> Result<CheckResult> {
        let robots_url = robots_url(url)?;
        let options = FetchOptions::with_user_agent(DESKTOP_BROWSER_UA).context("robots.txt");

        let response = match ctx.fetcher.fetch(&robots_url, &options).await {
            Ok(response) => response,
            Err(error) => {
                // Unreachable robots.txt cannot restrict anyone
                warn!("robots.txt fetch failed, assuming unrestricted: {}", error);
                return Ok(CheckResult::scored(
                    "Robots.txt access",
                    self.max_score,
                    self.max_score,
                    true,
                    "robots.txt inaccessible; assuming unrestricted crawling".to_string(),
                ));
            }
        };

        if response.status == 404 {
            return Ok(CheckResult::scored(
                "Robots.txt access",
                self.max_score,
                self.max_score,
                true,
                "No robots.txt (404); all crawlers unrestricted".to_string(),
            ));
        }

        if !response.ok() {
            return Ok(CheckResult::scored(
                "Robots.txt access",
                self.max_score,
                self.max_score,
                true,
                format!(
                    "robots.txt returned status {}; assuming unrestricted crawling",
                    response.status
                ),
            ));
        }

        let blocked: HashSet<String> = ctx
            .bots
            .iter()
            .filter(|bot| is_bot_blocked(&response.body, &bot.identifier))
            .map(|bot| bot.identifier.clone())
            .collect();
        debug!("robots.txt blocks {} of {} bots", blocked.len(), ctx.bots.len());

        let (visible, hidden) = product_visibility(ctx.products, &blocked);
        let total = visible.len() + hidden.len();
        let fraction = if total == 0 {
            1.0
        } else {
            visible.len() as f64 / total as f64
        };
        let score = fraction * self.max_score;

        let details = if hidden.is_empty() {
            format!("robots.txt does not block any of {} AI products", total)
        } else {
            let mut blocked_list: Vec<&str> = blocked.iter().map(String::as_str).collect();
            blocked_list.sort_unstable();
            format!(
                "robots.txt blocks {}: {} of {} AI products hidden ({})",
                blocked_list.join(", "),
                hidden.len(),
                total,
                hidden.join(", ")
            )
        };

        let passed = fraction >= 0.8;
        Ok(CheckResult::scored(
            "Robots.txt access",
            score,
            self.max_score,
            passed,
            details,
        ))
    }
}
