// SPDX-License-Identifier: PMPL-1.0-or-later
//! Response speed check
//!
//! Crawlers budget their fetch time; slow origins get crawled less and
//! truncated more. Desktop and mobile latencies are banded
//! independently and each device contributes half of the score.

use crate::checks::{CheckResult, DEFAULT_MAX_SCORE};
use crate::error::{Error, Result};
use crate::snapshot::PageSnapshot;

#[derive(Debug, Clone)]
pub struct ResponseSpeedCheck {
    pub max_score: f64,
}

impl Default for ResponseSpeedCheck {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

/// Five latency bands with thresholds at 500/1000/2000/3000 ms
fn band(ms: u64) -> (f64, &'static str) {
    match ms {
        0..=499 => (1.0, "fast"),
        500..=999 => (0.8, "good"),
        1000..=1999 => (0.6, "moderate"),
        2000..=2999 => (0.4, "slow"),
        _ => (0.2, "very slow"),
    }
}

impl ResponseSpeedCheck {
    pub fn perform(&self, snapshot: &PageSnapshot) -> Result<CheckResult> {
        let desktop_ms = snapshot.desktop.as_ref().map(|c| c.response_ms);
        let mobile_ms = snapshot.mobile.as_ref().map(|c| c.response_ms);

        let mut fractions: Vec<f64> = Vec::new();
        let mut lines: Vec<String> = Vec::new();

        for (device, ms) in [("desktop", desktop_ms), ("mobile", mobile_ms)] {
            if let Some(ms) = ms {
                let (fraction, label) = band(ms);
                fractions.push(fraction);
                lines.push(format!("{}: {} ms ({})", device, ms, label));
            } else {
                lines.push(format!("{}: not measured", device));
            }
        }

        if fractions.is_empty() {
            return Err(Error::MissingCapture("response timing"));
        }

        // A single measured device carries the whole score rather than
        // capping the check at half
        let score =
            fractions.iter().sum::<f64>() / fractions.len() as f64 * self.max_score;

        let passed = score >= self.max_score * 0.6;
        Ok(CheckResult::scored(
            "Response speed",
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

    fn capture(response_ms: u64) -> DeviceCapture {
        DeviceCapture {
            html: String::new(),
            headers: vec![],
            status: 200,
            response_ms,
        }
    }

    #[test]
    fn test_both_fast_full_score() {
        let snapshot = PageSnapshot {
            desktop: Some(capture(200)),
            mobile: Some(capture(499)),
        };
        let result = ResponseSpeedCheck::default().perform(&snapshot).unwrap();
        assert_eq!(result.score(), Some(10.0));
        assert!(result.passed);
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(band(499).0, 1.0);
        assert_eq!(band(500).0, 0.8);
        assert_eq!(band(999).0, 0.8);
        assert_eq!(band(1000).0, 0.6);
        assert_eq!(band(2000).0, 0.4);
        assert_eq!(band(3000).0, 0.2);
    }

    #[test]
    fn test_mixed_bands_average() {
        let snapshot = PageSnapshot {
            desktop: Some(capture(300)),  // 1.0
            mobile: Some(capture(2500)), // 0.4
        };
        let result = ResponseSpeedCheck::default().perform(&snapshot).unwrap();
        assert!((result.score().unwrap() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_device_scales_to_full() {
        let snapshot = PageSnapshot {
            desktop: Some(capture(300)),
            mobile: None,
        };
        let result = ResponseSpeedCheck::default().perform(&snapshot).unwrap();
        assert_eq!(result.score(), Some(10.0));
        assert!(result.details.contains("mobile: not measured"));
    }

    #[test]
    fn test_no_timings_is_hard_failure() {
        let result = ResponseSpeedCheck::default().perform(&PageSnapshot::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_very_slow_fails() {
        let snapshot = PageSnapshot {
            desktop: Some(capture(5000)),
            mobile: Some(capture(4000)),
        };
        let result = ResponseSpeedCheck::default().perform(&snapshot).unwrap();
        assert_eq!(result.score(), Some(2.0));
        assert!(!result.passed);
    }
}
