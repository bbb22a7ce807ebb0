//! Rule-based search-intent scoring.

use regex::Regex;
use serpbrief_core::{IntentLabel, IntentReport, IntentScore};
use std::sync::LazyLock;

/// Fixed rule table. Each pattern adds one point to its category for every snippet it
/// matches, so a snippet hitting two patterns of one category adds two.
const RULES: &[(IntentLabel, &[&str])] = &[
    (
        IntentLabel::Transactional,
        &[
            r"\bbuy\b",
            r"price|pricing|cost",
            r"coupon|deal|discount",
            r"\bbest\b",
            r"\bvs\b",
        ],
    ),
    (
        IntentLabel::Commercial,
        &[
            r"best",
            r"\btop\b",
            r"review|compare",
            r"alternatives?",
            r"software|tools?",
        ],
    ),
    (
        IntentLabel::Informational,
        &[
            r"what",
            r"how",
            r"why",
            r"guide",
            r"tutorial",
            r"examples?",
            r"learn",
            r"definition",
        ],
    ),
    (
        IntentLabel::Navigational,
        &[
            r"login",
            r"dashboard",
            r"official",
            r"homepage",
            r"site",
            r"download",
        ],
    ),
];

static COMPILED: LazyLock<Vec<(IntentLabel, Regex)>> = LazyLock::new(|| {
    let mut out = Vec::new();
    for (label, patterns) in RULES {
        for p in *patterns {
            let re = Regex::new(&format!("(?i){p}")).expect("valid intent pattern");
            out.push((*label, re));
        }
    }
    out
});

/// Score every snippet against the rule table.
pub fn score_intent<S: AsRef<str>>(snippets: &[S]) -> IntentScore {
    let mut score = IntentScore::default();
    for s in snippets {
        let s = s.as_ref();
        for (label, re) in COMPILED.iter() {
            if re.is_match(s) {
                score.bump(*label);
            }
        }
    }
    score
}

/// Score and pick the dominant label (ties go to the earliest of
/// Informational, Commercial, Transactional, Navigational).
pub fn classify_intent<S: AsRef<str>>(snippets: &[S]) -> IntentReport {
    IntentReport::from_scores(score_intent(snippets))
}
