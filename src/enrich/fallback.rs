use std::sync::LazyLock;

use regex::Regex;

use super::memory::{parse_variant, Variant};
use crate::model::{MergedSpec, SpecSource};

static VARIANT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\d+(?:\.\d+)?\s*(?:GB|TB)\s*(?:storage|rom)?\s*[,/+]?\s*\d+(?:\.\d+)?\s*GB\s*RAM\b",
        r"(?i)\d+(?:\.\d+)?\s*GB\s*RAM\s*[,/+]?\s*\d+(?:\.\d+)?\s*(?:GB|TB)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static MODEL_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmodels?\b(?:\s+(?:code|number|no\.?))?\s*[:#]?\s*([A-Z0-9]{1,5}(?:-[A-Z0-9]{2,10})?)")
        .unwrap()
});

/// Texts scanned in order: merged detail lines, merged quick lines, then each
/// raw origin payload flattened to one text.
pub fn text_sources(merged: &MergedSpec, raw: &[&SpecSource]) -> Vec<String> {
    let mut texts: Vec<String> = merged
        .detail_spec
        .iter()
        .flat_map(|c| &c.specifications)
        .map(|s| format!("{} {}", s.name, s.value))
        .collect();
    texts.extend(merged.quick_spec.iter().map(|q| format!("{} {}", q.name, q.value)));
    texts.extend(raw.iter().filter(|r| !r.is_empty()).map(|r| flatten(r)));
    texts
}

fn flatten(src: &SpecSource) -> String {
    let mut lines = vec![src.name.clone()];
    for cat in &src.detail_spec {
        for s in &cat.specifications {
            lines.push(format!("{} {}", s.name, s.value));
        }
    }
    for q in &src.quick_spec {
        lines.push(format!("{} {}", q.name, q.value));
    }
    lines.join("\n")
}

/// First RAM/storage pair found across the ordered texts.
pub fn scan_variant(texts: &[String]) -> Option<Variant> {
    texts.iter().find_map(|text| {
        VARIANT_PATTERNS
            .iter()
            .filter_map(|re| re.find(text))
            .min_by_key(|m| m.start())
            .and_then(|m| parse_variant(m.as_str()))
    })
}

/// First model-code-like token introduced by a "Model"/"Models" label.
pub fn scan_model_code(texts: &[String]) -> Option<String> {
    texts.iter().find_map(|text| {
        MODEL_CODE_RE.captures_iter(text).find_map(|caps| {
            let code = caps.get(1)?.as_str();
            let has_digit = code.chars().any(|c| c.is_ascii_digit());
            let has_alpha = code.chars().any(|c| c.is_ascii_alphabetic());
            (has_digit && has_alpha).then(|| code.to_uppercase())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SpecCategory, SpecEntry};

    #[test]
    fn variant_found_in_free_text() {
        let texts = vec![
            "Display 6.6 inches".to_string(),
            "Description Ships with 256GB storage, 8GB RAM and a 5000 mAh cell".to_string(),
        ];
        let v = scan_variant(&texts).unwrap();
        assert_eq!(v.to_string(), "8 GB / 256 GB");
    }

    #[test]
    fn earlier_source_wins() {
        let texts = vec![
            "Internal 12GB RAM + 512GB".to_string(),
            "Internal 128GB 4GB RAM".to_string(),
        ];
        assert_eq!(scan_variant(&texts).unwrap().to_string(), "12 GB / 512 GB");
    }

    #[test]
    fn model_code_requires_letters_and_digits() {
        let texts = vec![
            "Model Galaxy".to_string(),
            "Models SM-A346B, SM-A346B/DS".to_string(),
        ];
        assert_eq!(scan_model_code(&texts).as_deref(), Some("SM-A346B"));
        assert_eq!(scan_model_code(&["Model number: a2846".to_string()]).as_deref(), Some("A2846"));
        assert_eq!(scan_model_code(&["Chipset SM7325".to_string()]), None);
    }

    #[test]
    fn raw_payloads_come_last() {
        let merged = MergedSpec {
            detail_spec: vec![SpecCategory::new("Misc", vec![SpecEntry::new("Colors", "Black")])],
            quick_spec: vec![SpecEntry::new("Display size", "6.1\"")],
            ..Default::default()
        };
        let raw = SpecSource {
            name: "Raw".into(),
            ..Default::default()
        };
        let empty = SpecSource::default();
        let texts = text_sources(&merged, &[&raw, &empty]);
        assert_eq!(texts, vec!["Colors Black", "Display size 6.1\"", "Raw"]);
    }
}
