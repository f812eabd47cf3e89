use std::sync::LazyLock;

use regex::Regex;

use crate::model::{MergedSpec, SpecCategory, SpecEntry};

static MP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*MP\b").unwrap());
static ROLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Za-z][A-Za-z \-]*)\)").unwrap());

const LAYOUTS: &[&str] = &["single", "dual", "triple", "quad", "penta"];

pub const QUICK_MAIN: &str = "Main camera";
pub const QUICK_SELFIE: &str = "Selfie camera";
pub const QUICK_PLACEHOLDER: &str = "Camera pixels";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraFacts {
    pub main: Option<String>,
    pub selfie: Option<String>,
}

/// `"50 MP (wide) + 12 MP (ultrawide)"` from one sensor-layout entry.
pub fn summarize(category: &SpecCategory) -> Option<String> {
    let entry = pick_entry(category)?;
    summarize_value(&entry.value)
}

fn pick_entry(category: &SpecCategory) -> Option<&SpecEntry> {
    category
        .specifications
        .iter()
        .find(|e| {
            let name = e.name.trim().to_lowercase();
            LAYOUTS.iter().any(|l| name.starts_with(l))
        })
        .or_else(|| {
            category
                .specifications
                .iter()
                .find(|e| MP_RE.is_match(&e.value))
        })
}

pub fn summarize_value(value: &str) -> Option<String> {
    let matches: Vec<_> = MP_RE.captures_iter(value).collect();
    if matches.is_empty() {
        return None;
    }
    let parts: Vec<String> = matches
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let whole = caps.get(0)?;
            let end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(value.len());
            let role = ROLE_RE
                .captures(&value[whole.end()..end])
                .map(|r| r[1].trim().to_lowercase());
            Some(match role {
                Some(role) => format!("{} MP ({})", &caps[1], role),
                None => format!("{} MP", &caps[1]),
            })
        })
        .collect();
    Some(parts.join(" + "))
}

pub fn extract(merged: &MergedSpec) -> CameraFacts {
    CameraFacts {
        main: merged.category("Main Camera").and_then(summarize),
        selfie: merged.category("Selfie camera").and_then(summarize),
    }
}

pub fn apply(merged: &mut MergedSpec, facts: &CameraFacts) {
    if let Some(main) = &facts.main {
        merged.set_quick(QUICK_MAIN, main.clone());
    }
    if let Some(selfie) = &facts.selfie {
        merged.set_quick(QUICK_SELFIE, selfie.clone());
    }
    if facts.main.is_some() || facts.selfie.is_some() {
        merged
            .quick_spec
            .retain(|q| !(q.name.trim().eq_ignore_ascii_case(QUICK_PLACEHOLDER) && q.value.trim().is_empty()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_entry_preferred() {
        let cat = SpecCategory::new(
            "Main Camera",
            vec![
                SpecEntry::new("Features", "LED flash, 12 MP panorama"),
                SpecEntry::new(
                    "Triple",
                    "48 MP, f/1.8, 26mm (wide), 1/2.0\", PDAF, OIS\n8 MP, f/2.2, 123˚ (ultrawide)\n5 MP, f/2.4, (macro)",
                ),
                SpecEntry::new("Video", "4K@30fps, 1080p@30/60fps"),
            ],
        );
        assert_eq!(
            summarize(&cat).as_deref(),
            Some("48 MP (wide) + 8 MP (ultrawide) + 5 MP (macro)")
        );
    }

    #[test]
    fn single_line_without_roles() {
        assert_eq!(summarize_value("50MP + 2MP").as_deref(), Some("50 MP + 2 MP"));
    }

    #[test]
    fn falls_back_to_any_megapixel_entry() {
        let cat = SpecCategory::new("Selfie camera", vec![SpecEntry::new("Sensor", "13 MP, f/2.2, (wide)")]);
        assert_eq!(summarize(&cat).as_deref(), Some("13 MP (wide)"));
    }

    #[test]
    fn no_megapixels_no_summary() {
        let cat = SpecCategory::new("Main Camera", vec![SpecEntry::new("Video", "4K@30fps")]);
        assert_eq!(summarize(&cat), None);
    }

    #[test]
    fn empty_placeholder_removed_once_summary_exists() {
        let mut merged = MergedSpec {
            detail_spec: vec![
                SpecCategory::new("Main Camera", vec![SpecEntry::new("Dual", "50 MP (wide)\n2 MP (depth)")]),
                SpecCategory::new("Selfie camera", vec![]),
            ],
            quick_spec: vec![SpecEntry::new("Camera pixels", " ")],
            ..Default::default()
        };
        let facts = extract(&merged);
        apply(&mut merged, &facts);
        assert!(merged.quick("Camera pixels").is_none());
        assert_eq!(merged.quick("Main camera").unwrap().value, "50 MP (wide) + 2 MP (depth)");
        assert!(merged.quick("Selfie camera").is_none());
    }

    #[test]
    fn filled_placeholder_kept() {
        let mut merged = MergedSpec {
            quick_spec: vec![SpecEntry::new("Camera pixels", "50MP")],
            ..Default::default()
        };
        apply(
            &mut merged,
            &CameraFacts {
                main: Some("50 MP".into()),
                selfie: None,
            },
        );
        assert_eq!(merged.quick("Camera pixels").unwrap().value, "50MP");
    }
}
