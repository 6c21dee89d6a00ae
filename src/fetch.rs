// SPDX-License-Identifier: PMPL-1.0-or-later
//! HTTP fetch seam and response validation
//!
//! Checks never talk to `reqwest` directly; they go through the
//! [`Fetcher`] trait so the retry/backoff collaborator can be swapped
//! out (and mocked in tests). [`HttpFetcher`] is the default
//! implementation: a plain client with a bounded retry loop and
//! jittered backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Desktop browser identity used for the shared page snapshot and
/// search-engine queries
pub const DESKTOP_BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Mobile browser identity for the mobile snapshot variant
pub const MOBILE_BROWSER_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1";

/// Per-request options supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// User-agent string; the client default applies when absent
    pub user_agent: Option<String>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
    /// Retry budget override for this request
    pub max_retries: Option<usize>,
    /// Short label used in log lines ("robots.txt", "bot probe", ...)
    pub context: Option<String>,
}

impl FetchOptions {
    pub fn with_user_agent(user_agent: &str) -> Self {
        Self {
            user_agent: Some(user_agent.to_string()),
            ..Default::default()
        }
    }

    pub fn context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// A completed HTTP exchange
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    /// Header pairs in arrival order; names may repeat
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl FetchedResponse {
    /// 2xx status
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// All values for a header name, case-insensitive
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Fetch capability every network check consumes
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedResponse>;
}

/// Default reqwest-backed fetcher with a bounded retry loop
pub struct HttpFetcher {
    client: Client,
    max_retries: usize,
    initial_backoff: Duration,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(20))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        })
    }

    async fn fetch_once(&self, url: &str, options: &FetchOptions) -> Result<FetchedResponse> {
        let mut request = self.client.get(url);

        if let Some(ref ua) = options.user_agent {
            request = request.header(reqwest::header::USER_AGENT, ua);
        }
        for (name, value) in &options.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(FetchedResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedResponse> {
        let max_retries = options.max_retries.unwrap_or(self.max_retries);
        let label = options.context.as_deref().unwrap_or("fetch");
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            match self.fetch_once(url, options).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!("{} succeeded after {} retries: {}", label, attempt, url);
                    }
                    return Ok(response);
                }
                Err(error) => {
                    attempt += 1;
                    if attempt > max_retries {
                        return Err(Error::Fetch {
                            url: url.to_string(),
                            message: error.to_string(),
                        });
                    }

                    // Jitter keeps repeated retries off a fixed cadence
                    let jitter = 0.5 + rand::random::<f64>() * 0.5;
                    let delay = Duration::from_secs_f64(backoff.as_secs_f64() * jitter);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label, attempt, max_retries, error, delay
                    );
                    sleep(delay).await;
                    backoff *= 2;
                }
            }
        }
    }
}

/// Verdict from [`validate_html_response`]
#[derive(Debug, Clone)]
pub struct ResponseValidation {
    pub is_valid: bool,
    pub reason: Option<String>,
}

/// Interstitial and challenge markers that mean the body is not the
/// real page
const BLOCK_PAGE_MARKERS: &[&str] = &[
    "verify you are a human",
    "are you a robot",
    "unusual traffic from your computer network",
    "enable javascript and cookies to continue",
    "attention required! | cloudflare",
    "checking your browser before accessing",
    "g-recaptcha",
    "cf-challenge",
    "access denied",
];

/// Decide whether an HTML response is the real page rather than a
/// CAPTCHA, challenge, or error interstitial.
pub fn validate_html_response(html: &str, status: u16) -> ResponseValidation {
    if status == 429 || status == 403 || status == 503 {
        return ResponseValidation {
            is_valid: false,
            reason: Some(format!("blocking status {}", status)),
        };
    }

    let lowered = html.to_lowercase();
    for marker in BLOCK_PAGE_MARKERS {
        if lowered.contains(marker) {
            return ResponseValidation {
                is_valid: false,
                reason: Some(format!("block page marker '{}'", marker)),
            };
        }
    }

    if html.trim().is_empty() {
        return ResponseValidation {
            is_valid: false,
            reason: Some("empty body".to_string()),
        };
    }

    ResponseValidation {
        is_valid: true,
        reason: None,
    }
}
