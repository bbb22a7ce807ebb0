use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Hard bounds for heading levels (`<h1>`..`<h6>`, `#`..`######`).
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 6;

/// One heading as it appeared on a competitor page.
///
/// Exported as `{level, title}`; `text` is accepted on input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    #[serde(rename = "title", alias = "text")]
    pub text: String,
}

impl Heading {
    pub fn new(level: u8, text: impl Into<String>) -> Self {
        Self {
            level: level.clamp(MIN_LEVEL, MAX_LEVEL),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageHeadings {
    #[serde(rename = "url", alias = "source_url")]
    pub source_url: String,
    pub headings: Vec<Heading>,
}

impl PageHeadings {
    pub fn empty(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            headings: Vec::new(),
        }
    }
}

/// Search-intent categories, in tie-break order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IntentLabel {
    Informational,
    Commercial,
    Transactional,
    Navigational,
}

impl IntentLabel {
    /// Declaration order. `IntentScore::dominant` walks this list and keeps the
    /// first maximum, so earlier labels win ties.
    pub const ALL: [IntentLabel; 4] = [
        IntentLabel::Informational,
        IntentLabel::Commercial,
        IntentLabel::Transactional,
        IntentLabel::Navigational,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IntentLabel::Informational => "Informational",
            IntentLabel::Commercial => "Commercial",
            IntentLabel::Transactional => "Transactional",
            IntentLabel::Navigational => "Navigational",
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "informational" => Ok(IntentLabel::Informational),
            "commercial" => Ok(IntentLabel::Commercial),
            "transactional" => Ok(IntentLabel::Transactional),
            "navigational" => Ok(IntentLabel::Navigational),
            other => Err(Error::InvalidInput(format!("unknown intent label: {other}"))),
        }
    }
}

/// Raw per-category rule hits. Never normalized.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntentScore {
    pub informational: u32,
    pub commercial: u32,
    pub transactional: u32,
    pub navigational: u32,
}

impl IntentScore {
    pub fn get(&self, label: IntentLabel) -> u32 {
        match label {
            IntentLabel::Informational => self.informational,
            IntentLabel::Commercial => self.commercial,
            IntentLabel::Transactional => self.transactional,
            IntentLabel::Navigational => self.navigational,
        }
    }

    pub fn bump(&mut self, label: IntentLabel) {
        let slot = match label {
            IntentLabel::Informational => &mut self.informational,
            IntentLabel::Commercial => &mut self.commercial,
            IntentLabel::Transactional => &mut self.transactional,
            IntentLabel::Navigational => &mut self.navigational,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u32 {
        IntentLabel::ALL.iter().map(|l| self.get(*l)).sum()
    }

    /// Category with the highest score; ties resolve to the earliest label in
    /// [`IntentLabel::ALL`]. All-zero scores yield `Informational`.
    pub fn dominant(&self) -> IntentLabel {
        let mut best = IntentLabel::ALL[0];
        for label in IntentLabel::ALL.iter().copied().skip(1) {
            if self.get(label) > self.get(best) {
                best = label;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntentReport {
    pub label: IntentLabel,
    pub scores: IntentScore,
}

impl IntentReport {
    pub fn from_scores(scores: IntentScore) -> Self {
        Self {
            label: scores.dominant(),
            scores,
        }
    }
}

/// Flat outline entry; nesting is implied by `level` only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutlineNode {
    pub level: u8,
    pub title: String,
}

impl OutlineNode {
    pub fn new(level: u8, title: impl Into<String>) -> Self {
        Self {
            level: level.clamp(MIN_LEVEL, MAX_LEVEL),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Brief {
    pub title: String,
    #[serde(rename = "meta", alias = "meta_description")]
    pub meta_description: String,
    pub outline: Vec<OutlineNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: Option<usize>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            language: None,
            country: None,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganicResult {
    pub position: Option<u32>,
    pub title: String,
    pub link: String,
    pub snippet: Option<String>,
}

/// Normalized search-results page: organic results plus the
/// "People Also Ask" questions and "People Also Search For" terms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerpResponse {
    pub organic: Vec<OrganicResult>,
    pub paa: Vec<String>,
    pub pasf: Vec<String>,
    pub provider: String,
    pub timings_ms: BTreeMap<String, u128>,
}

#[async_trait::async_trait]
pub trait SerpProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<SerpResponse>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the operation (network + body read).
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
    /// Optional headers to add (adapter drops credential headers).
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            max_bytes: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub truncated: bool,
    pub timings_ms: BTreeMap<String, u128>,
}

impl FetchResponse {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_prefers_strict_maximum() {
        let s = IntentScore {
            informational: 1,
            commercial: 3,
            transactional: 2,
            navigational: 0,
        };
        assert_eq!(s.dominant(), IntentLabel::Commercial);
    }

    #[test]
    fn dominant_ties_go_to_declaration_order() {
        let s = IntentScore {
            informational: 0,
            commercial: 2,
            transactional: 2,
            navigational: 2,
        };
        assert_eq!(s.dominant(), IntentLabel::Commercial);
        assert_eq!(IntentScore::default().dominant(), IntentLabel::Informational);
    }

    #[test]
    fn bump_and_total() {
        let mut s = IntentScore::default();
        s.bump(IntentLabel::Navigational);
        s.bump(IntentLabel::Navigational);
        s.bump(IntentLabel::Informational);
        assert_eq!(s.navigational, 2);
        assert_eq!(s.total(), 3);
    }

    #[test]
    fn intent_label_parses_case_insensitively() {
        assert_eq!(
            "  commercial ".parse::<IntentLabel>().unwrap(),
            IntentLabel::Commercial
        );
        assert!(matches!(
            "shopping".parse::<IntentLabel>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn heading_serializes_as_level_title() {
        let h = Heading::new(2, "Pricing");
        let v = serde_json::to_value(&h).unwrap();
        assert_eq!(v, serde_json::json!({"level": 2, "title": "Pricing"}));

        let back: Heading = serde_json::from_str(r#"{"level":3,"text":"FAQ"}"#).unwrap();
        assert_eq!(back, Heading::new(3, "FAQ"));
    }

    #[test]
    fn levels_are_clamped_into_range() {
        assert_eq!(Heading::new(0, "x").level, 1);
        assert_eq!(OutlineNode::new(9, "x").level, 6);
    }

    #[test]
    fn brief_exports_meta_key() {
        let b = Brief {
            title: "t".to_string(),
            meta_description: "m".to_string(),
            outline: vec![OutlineNode::new(1, "t")],
        };
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v["meta"].as_str(), Some("m"));
        assert_eq!(v["outline"][0]["level"].as_u64(), Some(1));
    }
}
