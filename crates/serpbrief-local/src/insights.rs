//! SERP-level observations that go alongside the brief: recurring topics, title patterns
//! and per-competitor heading counts. Counting only; no language understanding.

use crate::textprep::words_lc;
use regex::Regex;
use serde::Serialize;
use serpbrief_core::{OrganicResult, PageHeadings};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

pub const DEFAULT_TOPIC_LIMIT: usize = 15;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid year regex"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("valid number regex"));
static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(what|how|why|when|where|who|which|is|are|can|does|do|should)\b|\?")
        .expect("valid question regex")
});

const STOPWORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "are", "as", "at", "be", "by", "can", "do", "for",
    "from", "has", "have", "how", "if", "in", "into", "is", "it", "its", "more", "most",
    "my", "new", "not", "of", "on", "or", "our", "so", "than", "that", "the", "their",
    "this", "to", "up", "use", "was", "we", "what", "when", "which", "who", "why", "will",
    "with", "you", "your",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SerpPatterns {
    pub result_count: usize,
    /// Titles containing a standalone number that is not a year ("7 best ...").
    pub numbered_titles: usize,
    pub year_titles: usize,
    pub question_titles: usize,
    pub bracket_titles: usize,
    pub avg_title_chars: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorInsight {
    pub url: String,
    pub total_headings: usize,
    /// Heading counts for h1..h6.
    pub by_level: [usize; 6],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insights {
    pub key_topics: Vec<TopicCount>,
    pub serp_patterns: SerpPatterns,
    pub competitors: Vec<CompetitorInsight>,
}

/// Most frequent terms across `texts`, minus stopwords, numbers and the keyword's own
/// tokens. Ties break alphabetically.
pub fn key_topics<S: AsRef<str>>(texts: &[S], keyword: &str, limit: usize) -> Vec<TopicCount> {
    let stop: HashSet<&str> = STOPWORDS.iter().copied().collect();
    let kw: HashSet<String> = words_lc(keyword).into_iter().collect();

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for t in texts {
        for w in words_lc(t.as_ref()) {
            if w.chars().count() < 3
                || w.chars().all(|c| c.is_ascii_digit())
                || stop.contains(w.as_str())
                || kw.contains(&w)
            {
                continue;
            }
            *counts.entry(w).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<TopicCount> = counts
        .into_iter()
        .map(|(term, count)| TopicCount { term, count })
        .collect();
    // BTreeMap iteration is alphabetical; a stable sort keeps that order among ties.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

pub fn serp_patterns(organic: &[OrganicResult]) -> SerpPatterns {
    let mut p = SerpPatterns {
        result_count: organic.len(),
        ..Default::default()
    };
    if organic.is_empty() {
        return p;
    }

    let mut total_chars = 0usize;
    for r in organic {
        let title = r.title.trim();
        total_chars += title.chars().count();
        if YEAR_RE.is_match(title) {
            p.year_titles += 1;
        }
        if NUMBER_RE
            .find_iter(title)
            .any(|m| !YEAR_RE.is_match(m.as_str()))
        {
            p.numbered_titles += 1;
        }
        if QUESTION_RE.is_match(title) {
            p.question_titles += 1;
        }
        if title.contains(['(', '[']) {
            p.bracket_titles += 1;
        }
    }
    p.avg_title_chars = total_chars as f64 / organic.len() as f64;
    p
}

pub fn competitor_insights(pages: &[PageHeadings]) -> Vec<CompetitorInsight> {
    pages
        .iter()
        .map(|page| {
            let mut by_level = [0usize; 6];
            for h in &page.headings {
                let idx = (h.level.clamp(1, 6) - 1) as usize;
                by_level[idx] += 1;
            }
            CompetitorInsight {
                url: page.source_url.clone(),
                total_headings: page.headings.len(),
                by_level,
            }
        })
        .collect()
}

pub fn build_insights(keyword: &str, organic: &[OrganicResult], pages: &[PageHeadings]) -> Insights {
    let mut texts: Vec<&str> = Vec::new();
    for r in organic {
        texts.push(r.title.as_str());
        if let Some(s) = r.snippet.as_deref() {
            texts.push(s);
        }
    }
    Insights {
        key_topics: key_topics(&texts, keyword, DEFAULT_TOPIC_LIMIT),
        serp_patterns: serp_patterns(organic),
        competitors: competitor_insights(pages),
    }
}
