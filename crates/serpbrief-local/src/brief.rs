//! Content-brief assembly and export.
//!
//! A brief is a flat outline: one level-1 title node, then level-2 sections with their
//! level-3 entries. Nesting is implied by `level` only.

use crate::insights::Insights;
use crate::textprep::truncate_with_ellipsis;
use serde::Serialize;
use serpbrief_core::{
    Brief, IntentLabel, IntentReport, OutlineNode, PageHeadings, Result, MAX_LEVEL,
};

pub const DEFAULT_MAX_QUESTIONS: usize = 15;
pub const DEFAULT_MAX_RELATED: usize = 15;
pub const META_MAX_CHARS: usize = 160;

pub const THEMES_SECTION: &str = "Competitor Heading Themes";
pub const PAA_SECTION: &str = "People Also Ask";
pub const PASF_SECTION: &str = "People Also Search For";
pub const CONCLUSION_SECTION: &str = "Conclusion";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineStyle {
    /// One "Competitor Heading Themes" section listing cluster representatives.
    #[default]
    Clustered,
    /// One section per competitor with its own headings shifted one level down.
    PerCompetitor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaStyle {
    /// Fixed keyword template, same for every intent.
    #[default]
    Basic,
    /// Per-intent template, capped at [`META_MAX_CHARS`].
    ByIntent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BriefOptions {
    pub outline: OutlineStyle,
    pub meta: MetaStyle,
    pub max_questions: usize,
    pub max_related: usize,
}

impl Default for BriefOptions {
    fn default() -> Self {
        Self {
            outline: OutlineStyle::default(),
            meta: MetaStyle::default(),
            max_questions: DEFAULT_MAX_QUESTIONS,
            max_related: DEFAULT_MAX_RELATED,
        }
    }
}

/// Everything the assembler consumes. PAA/PASF are expected to be deduplicated
/// upstream (see [`crate::textprep::dedup_preserve_order`]).
#[derive(Debug, Clone, Default)]
pub struct BriefInputs {
    pub keyword: String,
    pub intent: Option<IntentLabel>,
    pub competitors: Vec<PageHeadings>,
    /// Cluster representatives, in cluster order.
    pub themes: Vec<String>,
    pub paa: Vec<String>,
    pub pasf: Vec<String>,
}

pub fn title_suffix(intent: Option<IntentLabel>) -> &'static str {
    match intent {
        Some(IntentLabel::Commercial) => "Top Picks, Comparisons & FAQs",
        Some(IntentLabel::Transactional) => "Pricing, Options & How to Choose",
        Some(IntentLabel::Navigational) => "Everything You Need to Know",
        Some(IntentLabel::Informational) | None => "Complete Guide",
    }
}

pub fn title_for(keyword: &str, intent: Option<IntentLabel>) -> String {
    format!("{keyword}: {}", title_suffix(intent))
}

/// Like [`title_for`] for a free-form label; unknown labels get the default suffix.
pub fn title_for_label_str(keyword: &str, label: &str) -> String {
    title_for(keyword, label.parse::<IntentLabel>().ok())
}

pub fn meta_description(keyword: &str, intent: Option<IntentLabel>, style: MetaStyle) -> String {
    match style {
        MetaStyle::Basic => format!(
            "Everything you need to know about {keyword}: key insights, practical tips and answers to the most common questions."
        ),
        MetaStyle::ByIntent => {
            let raw = match intent {
                Some(IntentLabel::Commercial) => format!(
                    "Compare the best {keyword} options. Honest reviews, side-by-side comparisons and FAQs to help you pick the right one."
                ),
                Some(IntentLabel::Transactional) => format!(
                    "Looking for {keyword}? Compare pricing, plans and deals, and learn how to choose the right option before you buy."
                ),
                Some(IntentLabel::Navigational) => format!(
                    "Everything you need to know about {keyword}: official resources, key features and where to find them."
                ),
                Some(IntentLabel::Informational) | None => format!(
                    "Learn what {keyword} is and how it works. A complete guide with examples, tips and answers to common questions."
                ),
            };
            truncate_with_ellipsis(&raw, META_MAX_CHARS)
        }
    }
}

pub fn assemble_brief(inputs: &BriefInputs, options: &BriefOptions) -> Brief {
    let keyword = inputs.keyword.trim();
    let title = title_for(keyword, inputs.intent);
    let meta_description = meta_description(keyword, inputs.intent, options.meta);

    let mut outline = vec![OutlineNode::new(1, title.clone())];

    match options.outline {
        OutlineStyle::Clustered => {
            if !inputs.themes.is_empty() {
                outline.push(OutlineNode::new(2, THEMES_SECTION));
                for theme in &inputs.themes {
                    outline.push(OutlineNode::new(3, theme.clone()));
                }
            }
        }
        OutlineStyle::PerCompetitor => {
            for page in &inputs.competitors {
                if page.headings.is_empty() {
                    continue;
                }
                outline.push(OutlineNode::new(
                    2,
                    format!("Competitor Outline from {}", page.source_url),
                ));
                for h in &page.headings {
                    let level = h.level.saturating_add(1).min(MAX_LEVEL);
                    outline.push(OutlineNode::new(level, h.text.clone()));
                }
            }
        }
    }

    push_capped_section(&mut outline, PAA_SECTION, &inputs.paa, options.max_questions);
    push_capped_section(&mut outline, PASF_SECTION, &inputs.pasf, options.max_related);

    outline.push(OutlineNode::new(2, CONCLUSION_SECTION));
    outline.push(OutlineNode::new(3, format!("Key takeaways about {keyword}")));

    Brief {
        title,
        meta_description,
        outline,
    }
}

fn push_capped_section(outline: &mut Vec<OutlineNode>, name: &str, items: &[String], cap: usize) {
    if items.is_empty() {
        return;
    }
    outline.push(OutlineNode::new(2, name));
    for item in items.iter().take(cap) {
        outline.push(OutlineNode::new(3, item.clone()));
    }
}

/// `'#' * level`, a space, the title, a blank line, per node.
pub fn outline_to_markdown(outline: &[OutlineNode]) -> String {
    let mut out = String::new();
    for node in outline {
        out.push_str(&"#".repeat(node.level as usize));
        out.push(' ');
        out.push_str(&node.title);
        out.push_str("\n\n");
    }
    out
}

/// Markdown export: `# Title`, optional `> meta` quote, then the outline.
pub fn render_markdown(brief: &Brief, include_meta: bool) -> String {
    let mut out = format!("# {}\n\n", brief.title);
    if include_meta && !brief.meta_description.is_empty() {
        out.push_str(&format!("> {}\n\n", brief.meta_description));
    }
    out.push_str(&outline_to_markdown(&brief.outline));
    out
}

/// Machine-readable export of one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct BriefExport {
    pub keyword: String,
    pub intent: IntentReport,
    pub paa: Vec<String>,
    pub pasf: Vec<String>,
    pub competitor_headings: Vec<PageHeadings>,
    pub brief: Brief,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
}

impl BriefExport {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| serpbrief_core::Error::InvalidInput(e.to_string()))
    }

    pub fn to_markdown(&self) -> String {
        render_markdown(&self.brief, true)
    }
}
