// SPDX-License-Identifier: PMPL-1.0-or-later
//! Structured data check
//!
//! AI indexers lean on JSON-LD to understand a page without rendering
//! it. This check extracts every `application/ld+json` block, collects
//! the declared `@type` values, and scores the page on how much typed
//! data it exposes. High-value answer formats (FAQ, HowTo, Article...)
//! earn a bonus.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::checks::{CheckResult, DEFAULT_MAX_SCORE};
use crate::error::Result;
use crate::snapshot::PageSnapshot;

/// Types that answer-engines surface directly
const HIGH_VALUE_TYPES: &[&str] = &[
    "FAQPage",
    "HowTo",
    "Article",
    "NewsArticle",
    "BlogPosting",
    "Product",
    "Recipe",
    "QAPage",
    "VideoObject",
    "BreadcrumbList",
];

/// Full score at this many declared types
const TARGET_TYPE_COUNT: usize = 3;

/// Multiplier applied when a high-value type is present
const HIGH_VALUE_BONUS: f64 = 1.1;

static JSON_LD_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("valid JSON-LD block pattern")
});

#[derive(Debug, Clone)]
pub struct StructuredDataCheck {
    pub max_score: f64,
}

impl Default for StructuredDataCheck {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

impl StructuredDataCheck {
    pub fn perform(&self, snapshot: &PageSnapshot) -> Result<CheckResult> {
        let html = snapshot.any_html()?;

        let mut total_blocks = 0;
        let mut parsed_blocks = 0;
        let mut types: Vec<String> = Vec::new();

        for capture in JSON_LD_BLOCK.captures_iter(html) {
            total_blocks += 1;
            let raw = capture.get(1).map(|m| m.as_str()).unwrap_or_default();
            // Malformed blocks are skipped, not fatal
            let Ok(value) = serde_json::from_str::<Value>(raw) else {
                continue;
            };
            parsed_blocks += 1;
            collect_types(&value, &mut types);
        }

        let count = types.len();
        let mut score =
            (count.min(TARGET_TYPE_COUNT) as f64 / TARGET_TYPE_COUNT as f64) * self.max_score;

        let has_high_value = types.iter().any(|t| HIGH_VALUE_TYPES.contains(&t.as_str()));
        if has_high_value {
            score = (score * HIGH_VALUE_BONUS).min(self.max_score);
        }

        let details = if count == 0 {
            format!(
                "No structured data types found ({} JSON-LD block(s) on the page)",
                total_blocks
            )
        } else {
            let mut lines = format!(
                "Found {} structured data type(s) in {} of {} JSON-LD block(s): {}",
                count,
                parsed_blocks,
                total_blocks,
                types.join(", ")
            );
            if has_high_value {
                lines.push_str("\nHigh-value answer format present, 10% bonus applied");
            }
            lines
        };

        let passed = score >= self.max_score / 2.0;
        Ok(
            CheckResult::scored("Structured data", score, self.max_score, passed, details)
                .with_metadata(serde_json::json!({
                    "total_blocks": total_blocks,
                    "parsed_blocks": parsed_blocks,
                    "types": types,
                })),
        )
    }
}

/// Collect `@type` declarations from a JSON-LD document: top-level
/// objects, top-level arrays, and `@graph` containers. Array-typed
/// declarations are flattened.
fn collect_types(value: &Value, types: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            match map.get("@type") {
                Some(Value::String(t)) => types.push(t.clone()),
                Some(Value::Array(list)) => {
                    for entry in list {
                        if let Value::String(t) = entry {
                            types.push(t.clone());
                        }
                    }
                }
                _ => {}
            }
            if let Some(Value::Array(graph)) = map.get("@graph") {
                for entry in graph {
                    collect_types(entry, types);
                }
            }
        }
        Value::Array(list) => {
            for entry in list {
                collect_types(entry, types);
            }
        }
        _ => {}
    }
}
