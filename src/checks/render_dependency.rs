// SPDX-License-Identifier: PMPL-1.0-or-later
//! Render dependency check
//!
//! Most AI fetchers read raw HTML and never execute JavaScript. A page
//! whose content only exists after client-side rendering is invisible
//! to them. This check looks for CSR signatures (empty framework root
//! containers, framework markers, noscript warnings), measures how
//! much visible text the raw markup actually carries, and compares
//! script payload to content payload.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};

use crate::checks::{CheckResult, DEFAULT_MAX_SCORE};
use crate::error::Result;
use crate::snapshot::PageSnapshot;

/// Markers left in served markup by client-side frameworks
const FRAMEWORK_MARKERS: &[&str] = &[
    "data-reactroot",
    "__NEXT_DATA__",
    "ng-version",
    "data-v-app",
    "__NUXT__",
    "ember-view",
    "data-svelte",
];

const EMPTY_ROOT_PENALTY: f64 = 5.0;
const VERY_SHORT_TEXT_PENALTY: f64 = 3.0;
const SHORT_TEXT_PENALTY: f64 = 1.0;
const NO_SEMANTIC_TAG_PENALTY: f64 = 2.0;
const SCRIPT_HEAVY_PENALTY: f64 = 1.0;

const VERY_SHORT_TEXT: usize = 500;
const SHORT_TEXT: usize = 2000;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"<script[^>]*>(.*?)</script>")
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("valid script pattern")
});

static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"<style[^>]*>.*?</style>")
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("valid style pattern")
});

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));

#[derive(Debug, Clone)]
pub struct RenderDependencyCheck {
    pub max_score: f64,
}

impl Default for RenderDependencyCheck {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

/// Visible text after stripping script/style blocks and all tags
fn extract_visible_text(html: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(html, " ");
    let without_styles = STYLE_BLOCK.replace_all(&without_scripts, " ");
    let without_tags = ANY_TAG.replace_all(&without_styles, " ");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Total bytes of inline script bodies
fn script_bytes(html: &str) -> usize {
    SCRIPT_BLOCK
        .captures_iter(html)
        .map(|c| c.get(1).map(|m| m.as_str().len()).unwrap_or(0))
        .sum()
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

impl RenderDependencyCheck {
    pub fn perform(&self, snapshot: &PageSnapshot) -> Result<CheckResult> {
        let html = snapshot.any_html()?;
        let document = Html::parse_document(html);

        let mut score = self.max_score;
        let mut notes: Vec<String> = Vec::new();

        // Empty framework root container means the body arrives blank
        let root_selector = selector("#root, #app, #__next, #___gatsby");
        let empty_root = document
            .select(&root_selector)
            .any(|el| el.text().collect::<String>().trim().is_empty());
        if empty_root {
            score -= EMPTY_ROOT_PENALTY;
            notes.push("Empty framework root container (content requires JS)".to_string());
        }

        let visible_text = extract_visible_text(html);
        let text_len = visible_text.len();
        if text_len < VERY_SHORT_TEXT {
            score -= VERY_SHORT_TEXT_PENALTY;
            notes.push(format!(
                "Only {} chars of visible text in raw markup",
                text_len
            ));
        } else if text_len < SHORT_TEXT {
            score -= SHORT_TEXT_PENALTY;
            notes.push(format!("{} chars of visible text (thin)", text_len));
        }

        let semantic = document
            .select(&selector(
                "main, article, section, p, h1, h2, h3, h4, h5, h6",
            ))
            .next()
            .is_some();
        if !semantic {
            score -= NO_SEMANTIC_TAG_PENALTY;
            notes.push("No semantic content tags in raw markup".to_string());
        }

        let scripts = script_bytes(html);
        if scripts > text_len {
            score -= SCRIPT_HEAVY_PENALTY;
            notes.push(format!(
                "Inline script payload ({} bytes) exceeds visible content ({} bytes)",
                scripts, text_len
            ));
        }

        let markers: Vec<&str> = FRAMEWORK_MARKERS
            .iter()
            .copied()
            .filter(|m| html.contains(m))
            .collect();
        let noscript_warning = {
            let lowered = html.to_lowercase();
            lowered.contains("<noscript>")
                && (lowered.contains("enable javascript") || lowered.contains("javascript required"))
        };

        score = score.max(0.0);

        let details = if notes.is_empty() {
            "Content is present in the raw markup; no render dependency detected".to_string()
        } else {
            notes.join("\n")
        };

        let passed = score >= self.max_score * 0.7;
        Ok(CheckResult::scored(
            "Render dependency",
            score,
            self.max_score,
            passed,
            details,
        )
        .with_metadata(serde_json::json!({
            "visible_text_chars": text_len,
            "inline_script_bytes": scripts,
            "framework_markers": markers,
            "noscript_warning": noscript_warning,
        })))
    }
}
