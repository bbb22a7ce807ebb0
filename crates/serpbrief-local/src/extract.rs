//! Heading extraction from competitor pages.
//!
//! Two entry points:
//! - [`extract_headings`] for HTML bodies (the normal fetch path)
//! - [`extract_headings_from_markdown`] for proxy-rendered Markdown text, used when a
//!   direct fetch could not produce a usable page
//!
//! Neither path returns an error: a page that yields nothing contributes an empty list.

use crate::textprep::norm_ws;
use regex::Regex;
use serpbrief_core::{Heading, MAX_LEVEL, MIN_LEVEL};
use std::sync::LazyLock;

/// Upper bound on headings kept per page.
pub const MAX_HEADINGS: usize = 600;

static MD_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})[ \t]+(.+)$").expect("valid heading regex"));

/// Extract `<h1>`..`<h6>` headings from an HTML document.
///
/// Output is grouped by level: every `<h1>` in document order, then every `<h2>`, and
/// so on. It is not a single document-order merge.
pub fn extract_headings(html: &str, source_url: Option<&str>) -> Vec<Heading> {
    let doc = html_scraper::Html::parse_document(html);
    let mut out: Vec<Heading> = Vec::new();

    'levels: for level in MIN_LEVEL..=MAX_LEVEL {
        let Ok(sel) = html_scraper::Selector::parse(&format!("h{level}")) else {
            continue;
        };
        for el in doc.select(&sel) {
            if out.len() >= MAX_HEADINGS {
                tracing::debug!(
                    url = source_url.unwrap_or("-"),
                    cap = MAX_HEADINGS,
                    "heading cap reached"
                );
                break 'levels;
            }
            let text = norm_ws(&el.text().collect::<String>());
            if text.is_empty() {
                continue;
            }
            out.push(Heading::new(level, text));
        }
    }

    if out.is_empty() {
        tracing::debug!(url = source_url.unwrap_or("-"), "no headings in html");
    }
    out
}

/// Recognize Markdown-style heading lines: 1–6 `#`, whitespace, text.
///
/// The `#` run length is the level; trailing `#` and whitespace are stripped.
/// Headings keep their line order.
pub fn extract_headings_from_markdown(text: &str) -> Vec<Heading> {
    let mut out = Vec::new();
    for line in text.lines() {
        if out.len() >= MAX_HEADINGS {
            break;
        }
        let Some(caps) = MD_HEADING_RE.captures(line.trim_end()) else {
            continue;
        };
        let level = caps[1].len() as u8;
        let raw = caps[2].trim_end_matches(|c: char| c == '#' || c.is_whitespace());
        let text = norm_ws(raw);
        if text.is_empty() {
            continue;
        }
        out.push(Heading::new(level, text));
    }
    out
}

pub fn bytes_look_like_html(bytes: &[u8]) -> bool {
    // Cheap sniff: look for a tag-like prefix after whitespace/BOM.
    let head = &bytes[..bytes.len().min(1024)];
    let s = String::from_utf8_lossy(head);
    let t = s.trim_start_matches('\u{feff}').trim_start().to_ascii_lowercase();
    t.starts_with("<!doctype html")
        || t.starts_with("<html")
        || t.starts_with("<head")
        || t.starts_with("<body")
        || t.starts_with("<!--")
        || (t.starts_with('<') && t.contains("<h"))
}

/// `text/html; charset=utf-8` -> `text/html`.
fn mime_essence(content_type: &str) -> String {
    let essence = match content_type.find(';') {
        Some(i) => &content_type[..i],
        None => content_type,
    };
    essence.trim().to_ascii_lowercase()
}

/// Pick the HTML or Markdown path from the content type, falling back to sniffing.
pub fn extract_from_body(bytes: &[u8], content_type: Option<&str>, url: &str) -> Vec<Heading> {
    let ct = mime_essence(content_type.unwrap_or_default());
    let text = String::from_utf8_lossy(bytes);
    let is_html =
        matches!(ct.as_str(), "text/html" | "application/xhtml+xml") || bytes_look_like_html(bytes);
    if is_html {
        extract_headings(&text, Some(url))
    } else {
        extract_headings_from_markdown(&text)
    }
}
