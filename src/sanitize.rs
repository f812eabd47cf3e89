use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use crate::model::{SpecCategory, SpecEntry, SpecSource};

static SUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<sup\b[^>]*>.*?</sup>").unwrap());
static SKIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap()
});
static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6])>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "tr", "table", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Turn a possibly markup-contaminated string into plain text.
///
/// Never fails and never returns `<` or `>`.
pub fn sanitize_text(raw: &str) -> String {
    if !raw.contains(['<', '>', '&']) {
        return collapse_whitespace(raw);
    }
    match dom_text(raw) {
        Some(text) => collapse_whitespace(&text),
        None => {
            debug!("DOM sanitize left markup behind, using tag stripper");
            strip_tags_fallback(raw)
        }
    }
}

/// Sanitize every free-text field of a source.
pub fn sanitize_source(src: &SpecSource) -> SpecSource {
    SpecSource {
        name: sanitize_text(&src.name),
        image: src.image.trim().to_string(),
        detail_spec: src
            .detail_spec
            .iter()
            .map(|c| SpecCategory {
                category: sanitize_text(&c.category),
                specifications: sanitize_entries(&c.specifications),
            })
            .collect(),
        quick_spec: sanitize_entries(&src.quick_spec),
    }
}

fn sanitize_entries(entries: &[SpecEntry]) -> Vec<SpecEntry> {
    entries
        .iter()
        .map(|e| SpecEntry {
            name: sanitize_text(&e.name),
            value: sanitize_text(&e.value),
        })
        .collect()
}

fn dom_text(raw: &str) -> Option<String> {
    let fragment = Html::parse_fragment(raw);
    let mut out = String::with_capacity(raw.len());
    walk(fragment.root_element(), &mut out);
    if out.contains(['<', '>']) {
        None
    } else {
        Some(out)
    }
}

fn walk(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) => {
                let name = e.name();
                if matches!(name, "sup" | "script" | "style") {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                // anchors and inline wrappers contribute only their visible text
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, out);
                }
                if block && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn strip_tags_fallback(raw: &str) -> String {
    let s = SKIP_RE.replace_all(raw, "");
    let s = SUP_RE.replace_all(&s, "");
    let s = BREAK_RE.replace_all(&s, "\n");
    let s = TAG_RE.replace_all(&s, "");
    let decoded = decode_entities(&s);
    // decoding may re-introduce tags, strip again and drop lone delimiters
    let s = TAG_RE.replace_all(&decoded, "");
    let s = s.replace(['<', '>'], "");
    collapse_whitespace(&s)
}

/// Decode every HTML entity, keeping any delimiters as literal text.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let escaped = s.replace('<', "&lt;").replace('>', "&gt;");
    Html::parse_fragment(&escaped).root_element().text().collect()
}

/// Single spaces inside lines, trimmed lines, at most one blank line in a row.
fn collapse_whitespace(s: &str) -> String {
    let normalized = s.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = normalized
        .split('\n')
        .map(|l| SPACES_RE.replace_all(l, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    BLANKS_RE.replace_all(&joined, "\n\n").trim().to_string()
}
