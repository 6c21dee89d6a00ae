// SPDX-License-Identifier: PMPL-1.0-or-later
//! Bot identity registry and bot-to-product mapping
//!
//! Each [`BotIdentity`] is one automated crawler: a token the bot
//! announces in robots.txt / meta directives, the user-agent string it
//! fetches with, and classification tags. Products group several bots
//! (e.g. GPTBot and ChatGPT-User both feed OpenAI products), and the
//! visibility checks score at the product level.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Classification group for a bot identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BotTag {
    /// Crawls pages to build foundation-model training corpora
    ModelTraining,
    /// Fetches pages live on behalf of a user conversation
    UserInteraction,
    /// Builds an AI search index
    SearchIndex,
}

impl std::fmt::Display for BotTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotTag::ModelTraining => write!(f, "model-training"),
            BotTag::UserInteraction => write!(f, "user-interaction"),
            BotTag::SearchIndex => write!(f, "search-index"),
        }
    }
}

/// One automated crawler identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotIdentity {
    /// Token used in robots.txt user-agent lines and meta tag names
    pub identifier: String,
    /// Human-readable name
    pub name: String,
    /// Full user-agent string sent when probing as this bot
    pub user_agent: String,
    /// Classification tags
    pub tags: Vec<BotTag>,
}

impl BotIdentity {
    fn new(identifier: &str, name: &str, user_agent: &str, tags: &[BotTag]) -> Self {
        Self {
            identifier: identifier.to_string(),
            name: name.to_string(),
            user_agent: user_agent.to_string(),
            tags: tags.to_vec(),
        }
    }

    /// Whether this bot carries the given classification tag
    pub fn has_tag(&self, tag: BotTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// An AI product consuming one or more underlying bots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProduct {
    /// Product name shown in check details
    pub name: String,
    /// Identifiers of the bots this product depends on
    pub bots: Vec<String>,
}

impl AiProduct {
    fn new(name: &str, bots: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            bots: bots.iter().map(|b| b.to_string()).collect(),
        }
    }
}

/// Built-in registry of known AI crawler identities
pub fn builtin_bots() -> Vec<BotIdentity> {
    use BotTag::*;
    vec![
        BotIdentity::new(
            "GPTBot",
            "OpenAI GPTBot",
            "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko); compatible; GPTBot/1.2; +https://openai.com/gptbot",
            &[ModelTraining],
        ),
        BotIdentity::new(
            "ChatGPT-User",
            "ChatGPT browsing",
            "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko); compatible; ChatGPT-User/1.0; +https://openai.com/bot",
            &[UserInteraction],
        ),
        BotIdentity::new(
            "OAI-SearchBot",
            "OpenAI SearchBot",
            "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko); compatible; OAI-SearchBot/1.0; +https://openai.com/searchbot",
            &[SearchIndex],
        ),
        BotIdentity::new(
            "ClaudeBot",
            "Anthropic ClaudeBot",
            "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; ClaudeBot/1.0; +claudebot@anthropic.com)",
            &[ModelTraining],
        ),
        BotIdentity::new(
            "Claude-User",
            "Claude browsing",
            "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; Claude-User/1.0; +Claude-User@anthropic.com)",
            &[UserInteraction],
        ),
        BotIdentity::new(
            "Google-Extended",
            "Google Gemini training",
            "Mozilla/5.0 (compatible; Google-Extended/1.0; +http://www.google.com/bot.html)",
            &[ModelTraining],
        ),
        BotIdentity::new(
            "PerplexityBot",
            "Perplexity indexer",
            "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; PerplexityBot/1.0; +https://perplexity.ai/perplexitybot)",
            &[SearchIndex],
        ),
        BotIdentity::new(
            "Perplexity-User",
            "Perplexity browsing",
            "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; Perplexity-User/1.0; +https://perplexity.ai/perplexity-user)",
            &[UserInteraction],
        ),
        BotIdentity::new(
            "CCBot",
            "Common Crawl",
            "CCBot/2.0 (https://commoncrawl.org/faq/)",
            &[ModelTraining],
        ),
        BotIdentity::new(
            "Bytespider",
            "ByteDance Bytespider",
            "Mozilla/5.0 (Linux; Android 5.0) AppleWebKit/537.36 (KHTML, like Gecko) Mobile Safari/537.36 (compatible; Bytespider; spider-feedback@bytedance.com)",
            &[ModelTraining],
        ),
        BotIdentity::new(
            "Amazonbot",
            "Amazon Alexa crawler",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_1) AppleWebKit/600.2.5 (KHTML, like Gecko) Version/8.0.2 Safari/600.2.5 (Amazonbot/0.1; +https://developer.amazon.com/support/amazonbot)",
            &[ModelTraining, SearchIndex],
        ),
        BotIdentity::new(
            "Applebot-Extended",
            "Apple Intelligence training",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko; compatible; Applebot-Extended/0.1; +http://www.apple.com/go/applebot)",
            &[ModelTraining],
        ),
        BotIdentity::new(
            "meta-externalagent",
            "Meta AI crawler",
            "meta-externalagent/1.1 (+https://developers.facebook.com/docs/sharing/webmasters/crawler)",
            &[ModelTraining],
        ),
        BotIdentity::new(
            "cohere-ai",
            "Cohere crawler",
            "cohere-ai/1.0 (+https://cohere.com)",
            &[ModelTraining],
        ),
    ]
}

/// Built-in bot-to-product relation
pub fn builtin_products() -> Vec<AiProduct> {
    vec![
        AiProduct::new("OpenAI model training", &["GPTBot"]),
        AiProduct::new("ChatGPT browsing", &["ChatGPT-User"]),
        AiProduct::new("ChatGPT search", &["OAI-SearchBot"]),
        AiProduct::new("Anthropic model training", &["ClaudeBot"]),
        AiProduct::new("Claude browsing", &["Claude-User"]),
        AiProduct::new("Google Gemini", &["Google-Extended"]),
        AiProduct::new("Perplexity", &["PerplexityBot", "Perplexity-User"]),
        AiProduct::new("Common Crawl corpus", &["CCBot"]),
        AiProduct::new("ByteDance Doubao", &["Bytespider"]),
        AiProduct::new("Amazon Alexa AI", &["Amazonbot"]),
        AiProduct::new("Apple Intelligence", &["Applebot-Extended"]),
        AiProduct::new("Meta AI", &["meta-externalagent"]),
        AiProduct::new("Cohere", &["cohere-ai"]),
    ]
}

/// Product-level visibility derived from a set of blocked bot identifiers.
///
/// A product stays visible only while none of its constituent bots is
/// blocked. Returns `(visible, hidden)` names; products whose bots do
/// not appear in the registry at all still count as visible.
pub fn product_visibility<'a>(
    products: &'a [AiProduct],
    blocked_bots: &HashSet<String>,
) -> (Vec<&'a str>, Vec<&'a str>) {
    let blocked_lower: HashSet<String> =
        blocked_bots.iter().map(|b| b.to_lowercase()).collect();
    let mut visible = Vec::new();
    let mut hidden = Vec::new();

    for product in products {
        let any_blocked = product
            .bots
            .iter()
            .any(|b| blocked_lower.contains(&b.to_lowercase()));
        if any_blocked {
            hidden.push(product.name.as_str());
        } else {
            visible.push(product.name.as_str());
        }
    }

    (visible, hidden)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_consistency() {
        let bots = builtin_bots();
        let products = builtin_products();

        // Every product bot must exist in the registry
        let ids: HashSet<&str> = bots.iter().map(|b| b.identifier.as_str()).collect();
        for product in &products {
            for bot in &product.bots {
                assert!(ids.contains(bot.as_str()), "unknown bot {} in {}", bot, product.name);
            }
        }

        // Identifiers are unique
        assert_eq!(ids.len(), bots.len());
    }

    #[test]
    fn test_tag_filtering() {
        let bots = builtin_bots();
        let training: Vec<_> = bots.iter().filter(|b| b.has_tag(BotTag::ModelTraining)).collect();
        let interactive: Vec<_> = bots.iter().filter(|b| b.has_tag(BotTag::UserInteraction)).collect();

        assert!(training.iter().any(|b| b.identifier == "GPTBot"));
        assert!(training.iter().any(|b| b.identifier == "ClaudeBot"));
        assert!(interactive.iter().any(|b| b.identifier == "ChatGPT-User"));
        assert!(!interactive.iter().any(|b| b.identifier == "GPTBot"));
    }

    #[test]
    fn test_product_visibility_strict() {
        let products = vec![
            AiProduct::new("Perplexity", &["PerplexityBot", "Perplexity-User"]),
            AiProduct::new("Google Gemini", &["Google-Extended"]),
        ];

        // Blocking one of two Perplexity bots hides the product
        let blocked: HashSet<String> = ["PerplexityBot".to_string()].into_iter().collect();
        let (visible, hidden) = product_visibility(&products, &blocked);
        assert_eq!(hidden, vec!["Perplexity"]);
        assert_eq!(visible, vec!["Google Gemini"]);
    }

    #[test]
    fn test_product_visibility_case_insensitive() {
        let products = vec![AiProduct::new("OpenAI model training", &["GPTBot"])];
        let blocked: HashSet<String> = ["gptbot".to_string()].into_iter().collect();
        let (visible, hidden) = product_visibility(&products, &blocked);
        assert!(visible.is_empty());
        assert_eq!(hidden, vec!["OpenAI model training"]);
    }

    #[test]
    fn test_no_blocked_bots_all_visible() {
        let products = builtin_products();
        let (visible, hidden) = product_visibility(&products, &HashSet::new());
        assert_eq!(visible.len(), products.len());
        assert!(hidden.is_empty());
    }
}
