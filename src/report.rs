// SPDX-License-Identifier: PMPL-1.0-or-later
//! Report generation for audit runs
//!
//! Two formats: human-readable text (one line per check, errored
//! checks visually distinguished, percentage footer) and structured
//! JSON for programmatic consumption.

use crate::orchestrator::AuditReport;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Render an audit report in the requested format
pub fn generate_report(report: &AuditReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => text_report(report),
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize report: {}\"}}", e)),
    }
}

fn text_report(report: &AuditReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("AI visibility audit: {}\n", report.url));
    out.push_str(&format!(
        "Category: {} | Started: {} | Took: {} ms\n\n",
        report.category,
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.duration_ms
    ));

    for result in &report.results {
        let (tag, score_text) = match result.score() {
            Some(score) => (
                if result.passed { "[PASS]" } else { "[FAIL]" },
                format!("{:>5.1}/{:<4.1}", score, result.max_score),
            ),
            None => ("[ERR ]", format!("{:>5}/{:<4.1}", "--", result.max_score)),
        };

        let mut lines = result.details.lines();
        let first = lines.next().unwrap_or("");
        out.push_str(&format!(
            "{} {:<28} {} {}\n",
            tag, result.name, score_text, first
        ));
        for line in lines {
            out.push_str(&format!("{:>48}{}\n", "", line));
        }
    }

    let errored = report.errored().len();
    out.push('\n');
    if errored > 0 {
        out.push_str(&format!(
            "{} check(s) errored and were excluded from the total\n",
            errored
        ));
    }
    out.push_str(&format!(
        "Score: {:.1}/{:.1} ({:.0}%)\n",
        report.score, report.max_score, report.percentage
    ));

    out
}
