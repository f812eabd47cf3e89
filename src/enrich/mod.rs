pub mod battery;
pub mod camera;
pub mod fallback;
pub mod memory;

use serde::Serialize;
use tracing::debug;

use crate::model::{MergedSpec, SpecEntry, SpecSource};

pub const QUICK_MODEL_CODE: &str = "Model code";

/// What enrichment found. `None` means the step left the quick reference alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    pub memory: Option<String>,
    pub battery_size: Option<String>,
    pub battery_type: Option<String>,
    pub main_camera: Option<String>,
    pub selfie_camera: Option<String>,
    pub model_code: Option<String>,
    pub derived_quick_spec: bool,
}

/// Repair and extend `merged.quick_spec` in place.
///
/// `raw` holds the unsanitized origin payloads, scanned only as a last resort.
pub fn enrich(merged: &mut MergedSpec, raw: &[&SpecSource]) -> EnrichReport {
    let mut report = EnrichReport::default();

    let memory = memory::extract(merged).or_else(|| {
        debug!(name = %merged.name, "no structured memory variants, scanning text");
        let texts = fallback::text_sources(merged, raw);
        fallback::scan_variant(&texts).map(|v| v.to_string())
    });
    match &memory {
        Some(summary) => memory::apply(merged, summary),
        None => debug!(name = %merged.name, "no memory variant found"),
    }
    report.memory = memory;

    let facts = battery::extract(merged);
    battery::apply(merged, &facts);
    report.battery_size = merged.quick(battery::QUICK_SIZE).map(|q| q.value.clone());
    report.battery_type = merged.quick(battery::QUICK_TYPE).map(|q| q.value.clone());

    let cams = camera::extract(merged);
    camera::apply(merged, &cams);
    report.main_camera = cams.main;
    report.selfie_camera = cams.selfie;

    report.model_code = model_code(merged).or_else(|| {
        let texts = fallback::text_sources(merged, raw);
        fallback::scan_model_code(&texts)
    });
    if let Some(code) = &report.model_code {
        merged.set_quick(QUICK_MODEL_CODE, code.clone());
    }

    if merged.quick_spec.is_empty() && merged.has_detail_data() {
        merged.quick_spec = derive_quick_spec(merged);
        report.derived_quick_spec = true;
    }

    report
}

/// Misc → Models, first listed code.
fn model_code(merged: &MergedSpec) -> Option<String> {
    let misc = merged.category("Misc")?;
    let entry = misc.find("Models").or_else(|| misc.find("Model"))?;
    entry
        .value
        .split([',', '\n'])
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// One entry per non-empty category: the label and its first non-blank value
/// line. A category with only blank values falls back to its first entry name.
fn derive_quick_spec(merged: &MergedSpec) -> Vec<SpecEntry> {
    merged
        .detail_spec
        .iter()
        .filter(|c| !c.specifications.is_empty())
        .map(|c| {
            let line = c
                .specifications
                .iter()
                .find_map(|s| s.value.lines().map(str::trim).find(|l| !l.is_empty()))
                .or_else(|| {
                    c.specifications
                        .iter()
                        .map(|s| s.name.trim())
                        .find(|n| !n.is_empty())
                })
                .unwrap_or_default();
            SpecEntry::new(c.category.clone(), line)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpecCategory;

    fn fixture(name: &str) -> SpecSource {
        let json = std::fs::read_to_string(format!("tests/fixtures/{}.json", name)).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn internal_memory_becomes_ram_storage() {
        let mut merged = MergedSpec {
            detail_spec: vec![SpecCategory::new(
                "Memory",
                vec![SpecEntry::new("Internal", "128GB 4GB RAM")],
            )],
            ..Default::default()
        };
        let report = enrich(&mut merged, &[]);
        assert_eq!(report.memory.as_deref(), Some("4 GB / 128 GB"));
        assert_eq!(merged.quick("RAM / Storage").unwrap().value, "4 GB / 128 GB");
    }

    #[test]
    fn raw_payload_scanned_last() {
        let mut merged = MergedSpec {
            detail_spec: vec![SpecCategory::new("Body", vec![SpecEntry::new("Weight", "190 g")])],
            ..Default::default()
        };
        let raw = SpecSource {
            name: "Phone X".into(),
            quick_spec: vec![SpecEntry::new("Memory", "256GB, 8GB RAM")],
            ..Default::default()
        };
        let report = enrich(&mut merged, &[&raw]);
        assert_eq!(report.memory.as_deref(), Some("8 GB / 256 GB"));
    }

    #[test]
    fn quick_spec_derived_when_no_source_had_one() {
        let mut merged = MergedSpec {
            detail_spec: vec![
                SpecCategory::new("Display", vec![SpecEntry::new("Size", "6.6 inches\n(~85% ratio)")]),
                SpecCategory::new("Sound", vec![]),
            ],
            ..Default::default()
        };
        let report = enrich(&mut merged, &[]);
        assert!(report.derived_quick_spec);
        assert_eq!(merged.quick_spec, vec![SpecEntry::new("Display", "6.6 inches")]);
    }

    #[test]
    fn derived_entry_skips_blank_leading_values() {
        let mut merged = MergedSpec {
            detail_spec: vec![
                SpecCategory::new(
                    "Body",
                    vec![SpecEntry::new("Build", ""), SpecEntry::new("Weight", "199 g")],
                ),
                SpecCategory::new("Comms", vec![SpecEntry::new("NFC", " ")]),
            ],
            ..Default::default()
        };
        let report = enrich(&mut merged, &[]);
        assert!(report.derived_quick_spec);
        assert_eq!(
            merged.quick_spec,
            vec![SpecEntry::new("Body", "199 g"), SpecEntry::new("Comms", "NFC")]
        );
    }

    #[test]
    fn nothing_found_leaves_quick_spec_untouched() {
        let mut merged = MergedSpec {
            quick_spec: vec![SpecEntry::new("OS", "Android 14")],
            ..Default::default()
        };
        let report = enrich(&mut merged, &[]);
        assert_eq!(report, EnrichReport::default());
        assert_eq!(merged.quick_spec, vec![SpecEntry::new("OS", "Android 14")]);
    }

    #[test]
    fn galaxy_fixture_enriched() {
        let official = crate::sanitize::sanitize_source(&fixture("galaxy_a34_official"));
        let unofficial = crate::sanitize::sanitize_source(&fixture("galaxy_a34_unofficial"));
        let merger = crate::merge::Merger::new(&crate::config::Heuristics::default());
        let query = crate::model::DeviceQuery::new("Samsung", "Galaxy A34");
        let mut merged = merger.merge(&official, &unofficial, &query).unwrap();
        let report = enrich(&mut merged, &[&official, &unofficial]);

        assert_eq!(report.memory.as_deref(), Some("6 GB / 128 GB, 8 GB / 128 GB, 8 GB / 256 GB"));
        assert_eq!(report.battery_size.as_deref(), Some("5000 mAh"));
        assert_eq!(report.battery_type.as_deref(), Some("Li-Po"));
        assert_eq!(
            report.main_camera.as_deref(),
            Some("48 MP (wide) + 8 MP (ultrawide) + 5 MP (macro)")
        );
        assert_eq!(report.selfie_camera.as_deref(), Some("13 MP (wide)"));
        assert_eq!(report.model_code.as_deref(), Some("SM-A346B"));
        assert!(merged.quick("Camera pixels").is_none());
        assert!(merged.quick("RAM").is_none());
    }
}
