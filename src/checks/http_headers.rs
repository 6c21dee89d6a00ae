// SPDX-License-Identifier: PMPL-1.0-or-later
//! X-Robots-Tag header check
//!
//! A blocking directive at the HTTP layer hides the page from every
//! crawler regardless of what the markup says, so any match is fatal.
//! Missing headers are treated as non-blocking: the absence of
//! evidence is not a block signal.

use crate::checks::{CheckResult, DEFAULT_MAX_SCORE};
use crate::error::Result;
use crate::snapshot::PageSnapshot;

const BLOCKING_DIRECTIVES: &[&str] = &["noindex", "noai", "noimageai", "nosnippet"];

#[derive(Debug, Clone)]
pub struct HttpHeaderCheck {
    pub max_score: f64,
}

impl Default for HttpHeaderCheck {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

impl HttpHeaderCheck {
    pub fn perform(&self, snapshot: &PageSnapshot) -> Result<CheckResult> {
        let capture = match snapshot.desktop.as_ref().or(snapshot.mobile.as_ref()) {
            Some(capture) => capture,
            None => {
                // Unverifiable is non-blocking, not an error
                return Ok(CheckResult::scored(
                    "X-Robots-Tag headers",
                    self.max_score,
                    self.max_score,
                    true,
                    "Could not verify response headers; assuming no header-level blocking"
                        .to_string(),
                ));
            }
        };

        // The header may legally appear multiple times
        let values = capture.header_values("x-robots-tag");
        let mut blocking: Vec<String> = Vec::new();

        for value in &values {
            for directive in value.split(',') {
                // "googlebot: noindex" scopes the directive to an agent
                let directive = directive
                    .rsplit(':')
                    .next()
                    .unwrap_or(directive)
                    .trim()
                    .to_lowercase();
                if BLOCKING_DIRECTIVES.contains(&directive.as_str()) {
                    blocking.push(directive);
                }
            }
        }

        if blocking.is_empty() {
            let details = if values.is_empty() {
                "No X-Robots-Tag headers present".to_string()
            } else {
                format!(
                    "X-Robots-Tag present without blocking directives: {}",
                    values.join("; ")
                )
            };
            Ok(CheckResult::scored(
                "X-Robots-Tag headers",
                self.max_score,
                self.max_score,
                true,
                details,
            ))
        } else {
            blocking.sort();
            blocking.dedup();
            Ok(CheckResult::scored(
                "X-Robots-Tag headers",
                0.0,
                self.max_score,
                false,
                format!("Blocking X-Robots-Tag directives: {}", blocking.join(", ")),
            ))
        }
    }
}
