// SPDX-License-Identifier: PMPL-1.0-or-later
//! Priority-ordered link and domain classifier
//!
//! Maps a URL or bare domain to a single category code. Rules are
//! evaluated in declaration order and the first matching rule wins.
//! Each raw pattern string is classified once at load time into one of
//! three kinds:
//!
//! - **contains**: plain substring test
//! - **ends-with**: hostname suffix test (leading `*` / `.` patterns)
//! - **regex**: compiled case-insensitive expression
//!
//! Patterns carrying a path fragment (`/`, `?`, `#`, `=`) are tested
//! against the full input string; all others match the normalized
//! hostname. The classifier is immutable after construction and safe
//! to share across calls.

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// Category code returned when no rule matches
pub const DEFAULT_CATEGORY: &str = "other";

/// How a raw pattern string is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Contains,
    EndsWith,
    Regex,
}

/// One classification rule: a category code plus its raw patterns
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Machine-readable category code (e.g. "social")
    pub code: String,
    /// Human-readable category name
    pub name: String,
    /// Raw pattern strings, classified at load time
    pub patterns: Vec<String>,
}

impl PatternRule {
    pub fn new(code: &str, name: &str, patterns: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Classify a raw pattern string into its matching kind.
///
/// Pure function of the pattern's own syntax: a leading `*`, `*.` or
/// `.` marks a hostname suffix; regex metacharacters anywhere in the
/// remainder mark a regex. `.` alone is not treated as a
/// metacharacter since domain patterns are full of literal dots.
pub fn classify_pattern_kind(raw: &str) -> PatternKind {
    let (suffix_prefix, rest) = if let Some(r) = raw.strip_prefix("*.") {
        (true, r)
    } else if let Some(r) = raw.strip_prefix('*') {
        (true, r)
    } else if let Some(r) = raw.strip_prefix('.') {
        (true, r)
    } else {
        (false, raw)
    };

    if rest.chars().any(is_regex_meta) {
        PatternKind::Regex
    } else if suffix_prefix {
        PatternKind::EndsWith
    } else {
        PatternKind::Contains
    }
}

const fn is_regex_meta(c: char) -> bool {
    matches!(
        c,
        '\\' | '^' | '$' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '+' | '?' | '*'
    )
}

/// A pattern after load-time classification
#[derive(Debug, Clone)]
struct CompiledPattern {
    lowered: String,
    kind: PatternKind,
    /// Suffix to test for ends-with patterns (leading `*` stripped)
    suffix: String,
    /// Pre-compiled expression for regex patterns
    regex: Option<Regex>,
    /// Pattern intentionally includes a path fragment
    path_scoped: bool,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    code: String,
    name: String,
    contains: Vec<CompiledPattern>,
    ends_with: Vec<CompiledPattern>,
    regexes: Vec<CompiledPattern>,
}

/// The classifier: an ordered list of compiled rules
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    rules: Vec<CompiledRule>,
}

impl LinkClassifier {
    /// Build a classifier from an ordered rule list.
    ///
    /// All regex-kind patterns are compiled (case-insensitive) here,
    /// once, so repeated classification calls pay no compile cost.
    pub fn new(rules: Vec<PatternRule>) -> Result<Self> {
        let mut compiled_rules = Vec::with_capacity(rules.len());

        for rule in rules {
            let mut contains = Vec::new();
            let mut ends_with = Vec::new();
            let mut regexes = Vec::new();

            for raw in &rule.patterns {
                let kind = classify_pattern_kind(raw);
                let lowered = raw.to_lowercase();
                let path_scoped = raw.contains(['/', '?', '#', '=']);

                let pattern = match kind {
                    PatternKind::Contains => CompiledPattern {
                        lowered,
                        kind,
                        suffix: String::new(),
                        regex: None,
                        path_scoped,
                    },
                    PatternKind::EndsWith => CompiledPattern {
                        suffix: lowered.trim_start_matches('*').to_string(),
                        lowered,
                        kind,
                        regex: None,
                        path_scoped,
                    },
                    PatternKind::Regex => {
                        let regex = RegexBuilder::new(raw)
                            .case_insensitive(true)
                            .build()
                            .map_err(|source| Error::Pattern {
                                pattern: raw.clone(),
                                source,
                            })?;
                        CompiledPattern {
                            lowered,
                            kind,
                            suffix: String::new(),
                            regex: Some(regex),
                            path_scoped,
                        }
                    }
                };

                match pattern.kind {
                    PatternKind::Contains => contains.push(pattern),
                    PatternKind::EndsWith => ends_with.push(pattern),
                    PatternKind::Regex => regexes.push(pattern),
                }
            }

            compiled_rules.push(CompiledRule {
                code: rule.code,
                name: rule.name,
                contains,
                ends_with,
                regexes,
            });
        }

        Ok(Self {
            rules: compiled_rules,
        })
    }

    /// Classifier with the built-in link category rule set
    pub fn with_default_rules() -> Self {
        Self::new(default_rules()).expect("built-in rules compile")
    }

    /// Classify a URL or bare domain into a category code.
    ///
    /// First rule with any matching pattern wins; rule order is the
    /// tie-break. Returns [`DEFAULT_CATEGORY`] when nothing matches.
    pub fn classify(&self, input: &str) -> &str {
        let host = normalize_host(input);
        let full = input.trim().to_lowercase();

        for rule in &self.rules {
            let contains_hit = rule.contains.iter().any(|p| {
                if p.path_scoped {
                    full.contains(&p.lowered)
                } else {
                    host.contains(&p.lowered)
                }
            });
            if contains_hit {
                return &rule.code;
            }

            if rule.ends_with.iter().any(|p| host.ends_with(&p.suffix)) {
                return &rule.code;
            }

            let regex_hit = rule
                .regexes
                .iter()
                .any(|p| p.regex.as_ref().is_some_and(|re| re.is_match(&host)));
            if regex_hit {
                return &rule.code;
            }
        }

        DEFAULT_CATEGORY
    }

    /// Human-readable name for a category code, if the rule set has it
    pub fn category_name(&self, code: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.code == code)
            .map(|r| r.name.as_str())
    }
}

/// Reduce a URL or domain string to a bare lowercase hostname:
/// scheme and leading `www.` stripped, path/query/fragment dropped.
pub fn normalize_host(input: &str) -> String {
    let trimmed = input.trim();

    let host = match url::Url::parse(trimmed) {
        Ok(parsed) => parsed.host_str().map(|h| h.to_string()),
        Err(_) => None,
    };

    let host = host.unwrap_or_else(|| {
        let without_scheme = match trimmed.split_once("://") {
            Some((_, rest)) => rest,
            None => trimmed,
        };
        without_scheme
            .split(['/', '?', '#'])
            .next()
            .unwrap_or("")
            .to_string()
    });

    let host = host.to_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

/// Built-in link category rules, most specific first
pub fn default_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            "social",
            "Social media",
            &[
                "facebook.com",
                "instagram.com",
                "linkedin.com",
                "tiktok.com",
                "threads.net",
                "bsky.app",
                "twitter.com",
                r"^([a-z0-9-]+\.)*x\.com$",
            ],
        ),
        PatternRule::new(
            "video",
            "Video platforms",
            &["youtube.com", "youtu.be", "vimeo.com", "twitch.tv"],
        ),
        PatternRule::new(
            "reference",
            "Reference and wikis",
            &["wikipedia.org", "wiktionary.org", "britannica.com", "fandom.com"],
        ),
        PatternRule::new(
            "community",
            "Forums and communities",
            &[
                "reddit.com",
                "stackoverflow.com",
                "stackexchange.com",
                "quora.com",
                "news.ycombinator.com",
                "discourse.",
            ],
        ),
        PatternRule::new(
            "news",
            "News outlets",
            &[
                "cnn.com",
                "bbc.co.uk",
                "bbc.com",
                "nytimes.com",
                "reuters.com",
                "theguardian.com",
                "apnews.com",
                "bloomberg.com",
            ],
        ),
        PatternRule::new(
            "ecommerce",
            "E-commerce",
            &[
                "amazon.",
                "ebay.com",
                "etsy.com",
                "walmart.com",
                "aliexpress.com",
                "/product/",
                "/products/",
            ],
        ),
        PatternRule::new(
            "docs",
            "Developer documentation",
            &["docs.", "developer.", "devdocs.io", "*.readthedocs.io"],
        ),
        PatternRule::new(
            "academic",
            "Academic and research",
            &["arxiv.org", "scholar.google.", "jstor.org", "nature.com", "*.edu", ".ac.uk"],
        ),
        PatternRule::new("government", "Government", &["*.gov", ".gov.uk", ".gouv.fr"]),
        PatternRule::new(
            "blog",
            "Blogs and newsletters",
            &["medium.com", "substack.com", "wordpress.com", "blogspot.com", r"^blog\."],
        ),
    ]
}
