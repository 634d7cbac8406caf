use serde::{Deserialize, Serialize};
use std::fmt;

/// One input row: a keyword and the page it should link to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSourcePair {
    pub keyword: String,
    pub source_url: String,
}

impl KeywordSourcePair {
    pub fn new(keyword: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            source_url: source_url.into(),
        }
    }
}

/// A paragraph on `target_url` mentioning `keyword`, which could link to
/// `source_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub keyword: String,
    pub paragraph_text: String,
    pub target_url: String,
    pub source_url: String,
}

/// Why a target URL contributed nothing to the crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    HttpStatus(u16),
    Network(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::HttpStatus(code) => write!(f, "Status code {}", code),
            SkipReason::Network(message) => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUrl {
    pub url: String,
    pub reason: SkipReason,
}

/// Everything a crawl produced: matches in crawl order plus the URLs that
/// failed. A cancelled crawl still carries whatever was aggregated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub opportunities: Vec<Opportunity>,
    pub skipped: Vec<SkippedUrl>,
    /// Target URLs whose fetch completed, successfully or not
    pub processed: usize,
    pub total: usize,
    pub cancelled: bool,
}

impl CrawlReport {
    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }
}
