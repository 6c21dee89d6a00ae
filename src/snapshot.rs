// SPDX-License-Identifier: PMPL-1.0-or-later
//! Shared page snapshot
//!
//! The orchestrator fetches the page once per device identity and the
//! whole check battery reads from the result, so a twelve-check run
//! costs two page fetches instead of twelve. Checks that require a
//! capture the snapshot does not carry fail individually through the
//! check error boundary.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fetch::{FetchOptions, Fetcher, DESKTOP_BROWSER_UA, MOBILE_BROWSER_UA};

/// One device's view of the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCapture {
    pub html: String,
    /// Header pairs in arrival order; names may repeat
    pub headers: Vec<(String, String)>,
    pub status: u16,
    pub response_ms: u64,
}

impl DeviceCapture {
    /// All values for a header name, case-insensitive
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Pre-fetched page state shared read-only across all checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub desktop: Option<DeviceCapture>,
    pub mobile: Option<DeviceCapture>,
}

impl PageSnapshot {
    /// Desktop capture, or a hard failure for the asking check
    pub fn desktop(&self) -> Result<&DeviceCapture> {
        self.desktop
            .as_ref()
            .ok_or(Error::MissingCapture("desktop"))
    }

    /// Mobile capture, or a hard failure for the asking check
    pub fn mobile(&self) -> Result<&DeviceCapture> {
        self.mobile.as_ref().ok_or(Error::MissingCapture("mobile"))
    }

    /// Desktop HTML, falling back to mobile
    pub fn any_html(&self) -> Result<&str> {
        self.desktop
            .as_ref()
            .or(self.mobile.as_ref())
            .map(|c| c.html.as_str())
            .ok_or(Error::MissingCapture("desktop or mobile"))
    }

    /// Byte size of the browser-fetched page, used as the similarity
    /// baseline for bot probes
    pub fn baseline_bytes(&self) -> Option<usize> {
        self.desktop.as_ref().map(|c| c.html.len())
    }

    /// Fetch the page once per device identity.
    ///
    /// A device fetch that fails leaves that capture empty; only a run
    /// where both devices fail is an error, since no content check
    /// could do anything with it.
    pub async fn capture(fetcher: &dyn Fetcher, url: &str) -> Result<Self> {
        let desktop = capture_device(fetcher, url, DESKTOP_BROWSER_UA, "desktop").await;
        let mobile = capture_device(fetcher, url, MOBILE_BROWSER_UA, "mobile").await;

        if desktop.is_none() && mobile.is_none() {
            return Err(Error::Fetch {
                url: url.to_string(),
                message: "neither desktop nor mobile fetch succeeded".to_string(),
            });
        }

        Ok(Self { desktop, mobile })
    }
}

async fn capture_device(
    fetcher: &dyn Fetcher,
    url: &str,
    user_agent: &str,
    device: &str,
) -> Option<DeviceCapture> {
    let options = FetchOptions::with_user_agent(user_agent).context(&format!("{} snapshot", device));
    let started = Instant::now();

    match fetcher.fetch(url, &options).await {
        Ok(response) => {
            let response_ms = started.elapsed().as_millis() as u64;
            debug!(
                "{} snapshot: status {} in {} ms, {} bytes",
                device,
                response.status,
                response_ms,
                response.body.len()
            );
            Some(DeviceCapture {
                html: response.body,
                headers: response.headers,
                status: response.status,
                response_ms,
            })
        }
        Err(error) => {
            warn!("{} snapshot failed for {}: {}", device, url, error);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(html: &str) -> DeviceCapture {
        DeviceCapture {
            html: html.to_string(),
            headers: vec![],
            status: 200,
            response_ms: 100,
        }
    }

    #[test]
    fn test_missing_capture_is_hard_failure() {
        let snapshot = PageSnapshot {
            desktop: None,
            mobile: Some(capture("<html></html>")),
        };
        assert!(snapshot.desktop().is_err());
        assert!(snapshot.mobile().is_ok());
        assert!(snapshot.any_html().is_ok());
    }

    #[test]
    fn test_any_html_prefers_desktop() {
        let snapshot = PageSnapshot {
            desktop: Some(capture("desktop")),
            mobile: Some(capture("mobile")),
        };
        assert_eq!(snapshot.any_html().unwrap(), "desktop");
    }

    #[test]
    fn test_baseline_bytes() {
        let snapshot = PageSnapshot {
            desktop: Some(capture("12345")),
            mobile: None,
        };
        assert_eq!(snapshot.baseline_bytes(), Some(5));

        let empty = PageSnapshot::default();
        assert_eq!(empty.baseline_bytes(), None);
        assert!(empty.any_html().is_err());
    }
}
