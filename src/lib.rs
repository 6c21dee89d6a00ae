// SPDX-License-Identifier: PMPL-1.0-or-later
//! Visibilitybot - AI Visibility Audit Bot
//!
//! Audits whether a web page is discoverable and parseable by
//! automated AI agents (model-training crawlers, AI search indexers,
//! conversational-assistant fetchers) and by conventional search
//! engines, producing a weighted score from a battery of independent
//! heuristic checks.
//!
//! ## How it works
//!
//! The orchestrator fetches one shared page snapshot (desktop and
//! mobile variants), then runs every check in a fixed order with a
//! jittered pacing delay between them. Content checks read only the
//! snapshot; network checks issue their own paced requests (robots.txt,
//! search engine queries, per-bot-identity probes, crawl-dataset
//! lookups). Every check is heuristic: the score approximates, never
//! guarantees, what a given bot actually does with the page.
//!
//! ## Checks
//!
//! - **Robots.txt access**: which AI products the robots file hides
//! - **Blocking meta tags**: noindex/noai directives in the markup
//! - **X-Robots-Tag headers**: blocking directives at the HTTP layer
//! - **Structured data**: JSON-LD blocks and their declared types
//! - **Content structure**: parseability rubric over the markup
//! - **Render dependency**: client-side-rendering signatures
//! - **Response speed**: desktop/mobile latency bands
//! - **Search indexing**: Google/Bing `site:` query signals
//! - **Bot access**: live probes under each bot's own identity
//! - **Common Crawl presence**: recent crawl snapshot lookups

pub mod bots;
pub mod checks;
pub mod classifier;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod report;
pub mod snapshot;

pub use error::{Error, Result};
