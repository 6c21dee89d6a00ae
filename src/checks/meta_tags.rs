// SPDX-License-Identifier: PMPL-1.0-or-later
//! Blocking meta tag check
//!
//! Scans the markup for `<meta name="robots">` and per-bot variants
//! carrying blocking directives. A generic robots directive blocks
//! every crawler and zeroes the score; a bot-specific directive costs
//! one bot's share.

use regex::{Regex, RegexBuilder};

use crate::checks::{CheckContext, CheckResult, DEFAULT_MAX_SCORE};
use crate::error::{Error, Result};
use crate::snapshot::PageSnapshot;

/// Directives that remove a page from an index or training corpus
const BLOCKING_KEYWORDS: &[&str] = &["noindex", "noai", "noimageai", "nosnippet"];

#[derive(Debug, Clone)]
pub struct BlockingMetaTagsCheck {
    pub max_score: f64,
}

impl Default for BlockingMetaTagsCheck {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

/// Shared tag template, instantiated per `name=` value. Handles both
/// attribute orders.
fn blocking_tag_regex(name: &str) -> Result<Regex> {
    let escaped = regex::escape(name);
    let keywords = BLOCKING_KEYWORDS.join("|");
    let pattern = format!(
        r#"<meta[^>]*name\s*=\s*["']{escaped}["'][^>]*content\s*=\s*["'][^"']*(?:{keywords})[^"']*["']|<meta[^>]*content\s*=\s*["'][^"']*(?:{keywords})[^"']*["'][^>]*name\s*=\s*["']{escaped}["']"#
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| Error::Pattern { pattern, source })
}

impl BlockingMetaTagsCheck {
    pub fn perform(&self, ctx: &CheckContext<'_>, snapshot: &PageSnapshot) -> Result<CheckResult> {
        let html = snapshot.any_html()?;

        let mut score = self.max_score;
        let mut blocked: Vec<String> = Vec::new();

        // Generic robots directive blocks everyone
        if blocking_tag_regex("robots")?.is_match(html) {
            score = 0.0;
            blocked.push("robots (all crawlers)".to_string());
        }

        let bot_count = ctx.bots.len().max(1);
        let per_bot_share = self.max_score / bot_count as f64;

        for bot in ctx.bots {
            if score <= 0.0 {
                // Deductions stop once the score bottoms out
                break;
            }
            if blocking_tag_regex(&bot.identifier)?.is_match(html) {
                score = (score - per_bot_share).max(0.0);
                blocked.push(bot.identifier.clone());
            }
        }

        let details = if blocked.is_empty() {
            "No blocking meta directives found".to_string()
        } else {
            format!(
                "Blocking meta directives for: {}",
                blocked.join(", ")
            )
        };

        let passed = blocked.is_empty();
        Ok(CheckResult::scored(
            "Blocking meta tags",
            score,
            self.max_score,
            passed,
            details,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::{builtin_bots, builtin_products};
    use crate::checks::PacingConfig;
    use crate::error::Result as CrateResult;
    use crate::fetch::{FetchOptions, FetchedResponse, Fetcher};
    use crate::snapshot::DeviceCapture;
    use async_trait::async_trait;
    use tokio::sync::watch;

    struct NoFetcher;

    #[async_trait]
    impl Fetcher for NoFetcher {
        async fn fetch(&self, url: &str, _options: &FetchOptions) -> CrateResult<FetchedResponse> {
            Err(Error::Fetch {
                url: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    fn snapshot(html: &str) -> PageSnapshot {
        PageSnapshot {
            desktop: Some(DeviceCapture {
                html: html.to_string(),
                headers: vec![],
                status: 200,
                response_ms: 100,
            }),
            mobile: None,
        }
    }

    fn run(html: &str) -> CheckResult {
        let bots = builtin_bots();
        let products = builtin_products();
        let (_tx, rx) = watch::channel(false);
        let ctx = CheckContext {
            fetcher: &NoFetcher,
            bots: &bots,
            products: &products,
            pacing: PacingConfig::default(),
            cancel: rx,
        };
        BlockingMetaTagsCheck::default()
            .perform(&ctx, &snapshot(html))
            .unwrap()
    }

    #[test]
    fn test_clean_page_full_score() {
        let result = run(r#"<html><head><meta name="robots" content="index, follow"></head></html>"#);
        assert_eq!(result.score(), Some(10.0));
        assert!(result.passed);
    }

    #[test]
    fn test_generic_noindex_zeroes_score() {
        let result = run(r#"<meta name="robots" content="noindex, nofollow">"#);
        assert_eq!(result.score(), Some(0.0));
        assert!(!result.passed);
        assert!(result.details.contains("all crawlers"));
    }

    #[test]
    fn test_bot_specific_deducts_share() {
        let result = run(r#"<meta name="GPTBot" content="noai">"#);
        let bot_count = builtin_bots().len() as f64;
        let expected = 10.0 - 10.0 / bot_count;
        assert!((result.score().unwrap() - expected).abs() < 1e-9);
        assert!(!result.passed);
        assert!(result.details.contains("GPTBot"));
    }

    #[test]
    fn test_reversed_attribute_order_detected() {
        let result = run(r#"<meta content="noindex" name="robots">"#);
        assert_eq!(result.score(), Some(0.0));
    }

    #[test]
    fn test_case_insensitive_match() {
        let result = run(r#"<META NAME="ROBOTS" CONTENT="NOINDEX">"#);
        assert_eq!(result.score(), Some(0.0));
    }

    #[test]
    fn test_nosnippet_is_blocking() {
        let result = run(r#"<meta name="robots" content="nosnippet">"#);
        assert_eq!(result.score(), Some(0.0));
    }

    #[test]
    fn test_score_never_negative() {
        // Generic block plus several bot-specific blocks must floor at 0
        let result = run(
            r#"<meta name="robots" content="noindex">
               <meta name="GPTBot" content="noai">
               <meta name="ClaudeBot" content="noai">"#,
        );
        assert_eq!(result.score(), Some(0.0));
    }
}
