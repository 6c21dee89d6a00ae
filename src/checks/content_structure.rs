// SPDX-License-Identifier: PMPL-1.0-or-later
//! Content structure check
//!
//! A fixed rubric of markup signals that make a page parseable without
//! rendering: headings, meta description, Open Graph tags, canonical
//! link, language attribute, lists/tables, image alt coverage, and
//! lazy-loading (penalized, since lazy content is invisible to
//! non-rendering fetchers). Every rule owns an equal share of the
//! score; three scoring policies apply depending on the rule.

use scraper::{Html, Selector};

use crate::checks::{CheckResult, DEFAULT_MAX_SCORE};
use crate::error::Result;
use crate::snapshot::PageSnapshot;

/// Ratio at or above which a ratio-based rule reads as satisfied
const RATIO_FOUND_THRESHOLD: f64 = 0.8;

/// Lazy-image count at which the inverse rule loses its whole share
const LAZY_PENALTY_CAP: usize = 5;

#[derive(Debug, Clone)]
pub struct ContentStructureCheck {
    pub max_score: f64,
}

impl Default for ContentStructureCheck {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

struct SignalOutcome {
    name: &'static str,
    earned: f64,
    found: bool,
}

/// Count-based policy: `min(found/required, 1) x share`
fn count_signal(name: &'static str, found: usize, required: usize, share: f64) -> SignalOutcome {
    let fraction = (found as f64 / required as f64).min(1.0);
    SignalOutcome {
        name,
        earned: fraction * share,
        found: found >= required,
    }
}

/// Ratio-based policy over all items of a kind vs items satisfying the
/// sub-pattern. An empty item set earns the full share: no penalty for
/// the absence of the opportunity.
fn ratio_signal(name: &'static str, total: usize, satisfying: usize, share: f64) -> SignalOutcome {
    if total == 0 {
        return SignalOutcome {
            name,
            earned: share,
            found: true,
        };
    }
    let ratio = satisfying as f64 / total as f64;
    SignalOutcome {
        name,
        earned: ratio * share,
        found: ratio >= RATIO_FOUND_THRESHOLD,
    }
}

/// Inverse policy: presence is penalized, absence earns the full
/// share, penalty scales with the match count up to a cap.
fn inverse_signal(name: &'static str, count: usize, cap: usize, share: f64) -> SignalOutcome {
    let penalty_fraction = (count.min(cap)) as f64 / cap as f64;
    SignalOutcome {
        name,
        earned: share * (1.0 - penalty_fraction),
        found: count == 0,
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

impl ContentStructureCheck {
    pub fn perform(&self, snapshot: &PageSnapshot) -> Result<CheckResult> {
        let html = snapshot.any_html()?;
        let document = Html::parse_document(html);

        let count = |css: &str| document.select(&selector(css)).count();

        let h1_count = count("h1");
        let h2h3_count = count("h2, h3");
        let meta_description = count(r#"meta[name="description"]"#);
        let og_title = count(r#"meta[property="og:title"]"#);
        let og_description = count(r#"meta[property="og:description"]"#);
        let og_image = count(r#"meta[property="og:image"]"#);
        let canonical = count(r#"link[rel="canonical"]"#);
        let lang = document
            .select(&selector("html"))
            .next()
            .and_then(|el| el.value().attr("lang"))
            .map(|l| !l.trim().is_empty())
            .unwrap_or(false);
        let lists_tables = count("ul, ol, dl, table");
        let images_total = count("img");
        let images_with_alt = count("img[alt]");
        let lazy_images = count(r#"img[loading="lazy"]"#);

        // 9 count rules + alt ratio + lazy inverse
        const RULE_COUNT: usize = 11;
        let share = self.max_score / RULE_COUNT as f64;

        let mut outcomes = vec![
            count_signal("H1 heading", h1_count, 1, share),
            count_signal("Section headings (5+ H2/H3)", h2h3_count, 5, share),
            count_signal("Meta description", meta_description, 1, share),
            count_signal("Open Graph title", og_title, 1, share),
            count_signal("Open Graph description", og_description, 1, share),
            count_signal("Open Graph image", og_image, 1, share),
            count_signal("Canonical link", canonical, 1, share),
            count_signal("Language attribute", lang as usize, 1, share),
            count_signal("Lists or tables", lists_tables, 1, share),
        ];
        outcomes.push(ratio_signal(
            "Image alt text coverage",
            images_total,
            images_with_alt,
            share,
        ));
        outcomes.push(inverse_signal(
            "No lazy-loaded images",
            lazy_images,
            LAZY_PENALTY_CAP,
            share,
        ));

        let total: f64 = outcomes.iter().map(|o| o.earned).sum();
        // One decimal, like the rest of the rubric's reporting
        let score = (total * 10.0).round() / 10.0;

        let mut lines: Vec<String> = outcomes
            .iter()
            .map(|o| {
                format!(
                    "{} {}",
                    if o.found { "[ok]     " } else { "[missing]" },
                    o.name
                )
            })
            .collect();
        lines.insert(
            0,
            format!(
                "{} of {} structure signals satisfied",
                outcomes.iter().filter(|o| o.found).count(),
                outcomes.len()
            ),
        );

        let passed = score >= self.max_score * 0.7;
        Ok(CheckResult::scored(
            "Content structure",
            score,
            self.max_score,
            passed,
            lines.join("\n"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::DeviceCapture;

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

    const RULE_COUNT: f64 = 11.0;

    #[test]
    fn test_no_images_earns_full_alt_share() {
        // A page with zero <img> tags must not be penalized on the
        // alt-text ratio rule
        let bare = snapshot("<html><body><p>text</p></body></html>");
        let result = ContentStructureCheck::default().perform(&bare).unwrap();
        let alt_line = result
            .details
            .lines()
            .find(|l| l.contains("Image alt text coverage"))
            .expect("alt rule reported");
        assert!(alt_line.starts_with("[ok]"));
    }

    #[test]
    fn test_alt_ratio_scales_share() {
        let half = snapshot(
            r#"<html><body>
                <img src="a.png" alt="a"><img src="b.png">
            </body></html>"#,
        );
        let full = snapshot(
            r#"<html><body>
                <img src="a.png" alt="a"><img src="b.png" alt="b">
            </body></html>"#,
        );
        let half_score = ContentStructureCheck::default()
            .perform(&half)
            .unwrap()
            .score()
            .unwrap();
        let full_score = ContentStructureCheck::default()
            .perform(&full)
            .unwrap()
            .score()
            .unwrap();
        let share = 10.0 / RULE_COUNT;
        let diff = full_score - half_score;
        // full coverage earns the other half of the share (one-decimal rounding)
        assert!((diff - share / 2.0).abs() < 0.11, "diff was {}", diff);
    }

    #[test]
    fn test_partial_heading_count() {
        let two = snapshot("<html><body><h2>a</h2><h3>b</h3></body></html>");
        let five = snapshot(
            "<html><body><h2>a</h2><h2>b</h2><h3>c</h3><h3>d</h3><h2>e</h2></body></html>",
        );
        let two_score = ContentStructureCheck::default()
            .perform(&two)
            .unwrap()
            .score()
            .unwrap();
        let five_score = ContentStructureCheck::default()
            .perform(&five)
            .unwrap()
            .score()
            .unwrap();
        assert!(five_score > two_score);
    }

    #[test]
    fn test_lazy_images_penalized() {
        let eager = snapshot(r#"<html><body><img src="a.png" alt="a"></body></html>"#);
        let lazy = snapshot(
            r#"<html><body><img src="a.png" alt="a" loading="lazy"></body></html>"#,
        );
        let eager_score = ContentStructureCheck::default()
            .perform(&eager)
            .unwrap()
            .score()
            .unwrap();
        let lazy_score = ContentStructureCheck::default()
            .perform(&lazy)
            .unwrap()
            .score()
            .unwrap();
        assert!(eager_score > lazy_score);
    }

    #[test]
    fn test_rich_page_passes() {
        let html = r#"<html lang="en"><head>
            <meta name="description" content="A page">
            <meta property="og:title" content="T">
            <meta property="og:description" content="D">
            <meta property="og:image" content="i.png">
            <link rel="canonical" href="https://example.com/">
        </head><body>
            <h1>Title</h1>
            <h2>A</h2><h2>B</h2><h3>C</h3><h3>D</h3><h2>E</h2>
            <ul><li>one</li></ul>
            <img src="a.png" alt="a">
        </body></html>"#;
        let result = ContentStructureCheck::default().perform(&snapshot(html)).unwrap();
        assert_eq!(result.score(), Some(10.0));
        assert!(result.passed);
    }

    #[test]
    fn test_score_rounded_to_one_decimal() {
        let html = r#"<html lang="en"><body><h1>t</h1></body></html>"#;
        let score = ContentStructureCheck::default()
            .perform(&snapshot(html))
            .unwrap()
            .score()
            .unwrap();
        assert_eq!((score * 10.0).round() / 10.0, score);
    }

    #[test]
    fn test_empty_page_scores_low() {
        let result = ContentStructureCheck::default()
            .perform(&snapshot("<html><body></body></html>"))
            .unwrap();
        assert!(!result.passed);
        // only the two no-opportunity rules (alt ratio, lazy) earn shares
        let expected = (2.0 / RULE_COUNT * 10.0 * 10.0).round() / 10.0;
        assert_eq!(result.score(), Some(expected));
    }
}
