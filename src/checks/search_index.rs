// SPDX-License-Identifier: PMPL-1.0-or-later
//! Search engine indexing check
//!
//! One parameterized template covers every engine: issue a
//! `site:<domain>` query with a desktop browser identity, reject
//! CAPTCHA/interstitial responses, test the shared no-results pattern
//! set first, then the engine's own success indicators. Binary score.
//!
//! Fail-closed: a query that cannot be completed scores as
//! not-indexed rather than erroring out of the aggregate.

use regex::RegexBuilder;
use tracing::{debug, warn};

use crate::checks::{CheckContext, CheckResult, DEFAULT_MAX_SCORE};
use crate::classifier::normalize_host;
use crate::error::Result;
use crate::fetch::{validate_html_response, FetchOptions, DESKTOP_BROWSER_UA};

/// One success indicator: a literal fragment or an expression
#[derive(Debug, Clone, Copy)]
pub enum SuccessPattern {
    Contains(&'static str),
    Regex(&'static str),
}

/// Everything that distinguishes one engine from another
#[derive(Debug, Clone, Copy)]
pub struct SearchEngineSpec {
    pub name: &'static str,
    /// Query string is appended URL-encoded
    pub base_url: &'static str,
    pub success_patterns: &'static [SuccessPattern],
}

pub static GOOGLE: SearchEngineSpec = SearchEngineSpec {
    name: "Google",
    base_url: "https://www.google.com/search?q=",
    success_patterns: &[
        SuccessPattern::Contains("/url?q="),
        SuccessPattern::Regex(r"about [\d.,\s]+ results"),
        SuccessPattern::Contains(r#"id="search""#),
    ],
};

pub static BING: SearchEngineSpec = SearchEngineSpec {
    name: "Bing",
    base_url: "https://www.bing.com/search?q=",
    success_patterns: &[
        SuccessPattern::Contains("b_algo"),
        SuccessPattern::Regex(r"[\d.,]+ results"),
    ],
};

/// Shared across engines and checked before any success pattern
const NO_RESULTS_PATTERNS: &[&str] = &[
    "did not match any documents",
    "no results found for",
    "there are no results for",
];

#[derive(Debug, Clone)]
pub struct SearchIndexCheck {
    pub max_score: f64,
    engine: &'static SearchEngineSpec,
    display_name: String,
}

impl SearchIndexCheck {
    pub fn new(engine: &'static SearchEngineSpec) -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
            engine,
            display_name: format!("{} indexing", engine.name),
        }
    }

    pub fn name(&self) -> &str {
        &self.display_name
    }

    fn not_indexed(&self, details: String) -> CheckResult {
        CheckResult::scored(self.name(), 0.0, self.max_score, false, details)
    }

    pub async fn perform(&self, ctx: &CheckContext<'_>, url: &str) -> Result<CheckResult> {
        let domain = normalize_host(url);
        let query: String =
            url::form_urlencoded::byte_serialize(format!("site:{}", domain).as_bytes()).collect();
        let query_url = format!("{}{}", self.engine.base_url, query);

        let options = FetchOptions::with_user_agent(DESKTOP_BROWSER_UA)
            .context(self.engine.name)
            .max_retries(1);

        let response = match ctx.fetcher.fetch(&query_url, &options).await {
            Ok(response) => response,
            Err(error) => {
                warn!("{} query failed: {}", self.engine.name, error);
                return Ok(self.not_indexed(format!(
                    "Could not query {}; treating as not indexed",
                    self.engine.name
                )));
            }
        };

        let validation = validate_html_response(&response.body, response.status);
        if !validation.is_valid {
            let reason = validation.reason.unwrap_or_else(|| "unknown".to_string());
            return Ok(self.not_indexed(format!(
                "{} response rejected ({}); treating as not indexed",
                self.engine.name, reason
            )));
        }

        let body = response.body.to_lowercase();

        if NO_RESULTS_PATTERNS.iter().any(|p| body.contains(p)) {
            return Ok(self.not_indexed(format!(
                "{} reports no results for site:{}",
                self.engine.name, domain
            )));
        }

        let mut indexed = false;
        for pattern in self.engine.success_patterns {
            let hit = match pattern {
                SuccessPattern::Contains(fragment) => body.contains(&fragment.to_lowercase()),
                SuccessPattern::Regex(expression) => RegexBuilder::new(expression)
                    .case_insensitive(true)
                    .build()
                    .map(|re| re.is_match(&body))
                    .unwrap_or(false),
            };
            if hit {
                indexed = true;
                break;
            }
        }

        if indexed {
            debug!("{} indexes {}", self.engine.name, domain);
            Ok(CheckResult::scored(
                self.name(),
                self.max_score,
                self.max_score,
                true,
                format!("{} has site:{} results indexed", self.engine.name, domain),
            ))
        } else {
            // Neither signal set matched
            Ok(self.not_indexed(format!(
                "{} response was indeterminate for site:{}; treating as not indexed",
                self.engine.name, domain
            )))
        }
    }
}
