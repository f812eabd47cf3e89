use std::sync::LazyLock;

use regex::Regex;

use crate::model::{MergedSpec, SpecEntry};

static CAPACITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mAh|Wh)\b").unwrap());
static CHEMISTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(Si/C\s*Li-?Ion|Li-?Po(?:lymer)?|Li-?Ion|Lithium[\s-]*Polymer|Lithium[\s-]*Ion|Ni-?MH)\b",
    )
    .unwrap()
});

pub const QUICK_SIZE: &str = "Battery size";
pub const QUICK_TYPE: &str = "Battery type";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatteryFacts {
    pub capacity: Option<String>,
    pub chemistry: Option<String>,
}

/// `"5000mAh"` → `"5000 mAh"`.
pub fn parse_capacity(text: &str) -> Option<String> {
    let caps = CAPACITY_RE.captures(text)?;
    let unit = if caps[2].eq_ignore_ascii_case("mah") { "mAh" } else { "Wh" };
    Some(format!("{} {}", &caps[1], unit))
}

pub fn parse_chemistry(text: &str) -> Option<String> {
    let raw = CHEMISTRY_RE.captures(text)?[1].to_lowercase();
    let compact: String = raw.chars().filter(|c| c.is_alphanumeric() || *c == '/').collect();
    let chemistry = if compact.starts_with("si/c") {
        "Si/C Li-Ion"
    } else if compact.contains("nimh") {
        "NiMH"
    } else if compact.contains("po") {
        "Li-Po"
    } else {
        "Li-Ion"
    };
    Some(chemistry.to_string())
}

/// Scan the Battery category, `Type` entry first.
pub fn extract(merged: &MergedSpec) -> BatteryFacts {
    let Some(category) = merged.category("Battery") else {
        return BatteryFacts::default();
    };
    let mut entries: Vec<&SpecEntry> = category.specifications.iter().collect();
    entries.sort_by_key(|e| !e.name.trim().eq_ignore_ascii_case("type"));

    BatteryFacts {
        capacity: entries.iter().find_map(|e| parse_capacity(&e.value)),
        chemistry: entries.iter().find_map(|e| parse_chemistry(&e.value)),
    }
}

/// Write facts into the quick reference and repair a capacity that a source
/// filed under the chemistry entry.
pub fn apply(merged: &mut MergedSpec, facts: &BatteryFacts) {
    if let Some(capacity) = &facts.capacity {
        merged.set_quick(QUICK_SIZE, capacity.clone());
    }
    if let Some(chemistry) = &facts.chemistry {
        merged.set_quick(QUICK_TYPE, chemistry.clone());
        return;
    }

    let Some(idx) = merged.quick_index(QUICK_TYPE) else {
        return;
    };
    let misfiled = &merged.quick_spec[idx].value;
    if let Some(chemistry) = parse_chemistry(misfiled) {
        merged.quick_spec[idx].value = chemistry;
        return;
    }
    let Some(capacity) = parse_capacity(misfiled) else {
        return;
    };
    if merged.quick(QUICK_SIZE).is_none() {
        merged.quick_spec[idx] = SpecEntry::new(QUICK_SIZE, capacity);
    } else {
        merged.quick_spec.remove(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpecCategory;

    fn with_battery(specs: Vec<SpecEntry>) -> MergedSpec {
        MergedSpec {
            detail_spec: vec![SpecCategory::new("Battery", specs)],
            ..Default::default()
        }
    }

    #[test]
    fn capacity_and_chemistry_from_type() {
        let merged = with_battery(vec![
            SpecEntry::new("Charging", "25W wired, 4000mAh in 60 min"),
            SpecEntry::new("Type", "Li-Ion 5000 mAh, non-removable"),
        ]);
        let facts = extract(&merged);
        assert_eq!(facts.capacity.as_deref(), Some("5000 mAh"));
        assert_eq!(facts.chemistry.as_deref(), Some("Li-Ion"));
    }

    #[test]
    fn chemistry_spellings_normalize() {
        assert_eq!(parse_chemistry("Lithium Polymer").as_deref(), Some("Li-Po"));
        assert_eq!(parse_chemistry("LiPo 4500mAh").as_deref(), Some("Li-Po"));
        assert_eq!(parse_chemistry("lithium-ion").as_deref(), Some("Li-Ion"));
        assert_eq!(parse_chemistry("Si/C Li-Ion 5500 mAh").as_deref(), Some("Si/C Li-Ion"));
        assert_eq!(parse_chemistry("5000 mAh"), None);
    }

    #[test]
    fn watt_hours_kept() {
        assert_eq!(parse_capacity("19.3 Wh battery").as_deref(), Some("19.3 Wh"));
    }

    #[test]
    fn misfiled_capacity_relocated() {
        let mut merged = MergedSpec {
            quick_spec: vec![
                SpecEntry::new("Display size", "6.1\""),
                SpecEntry::new("Battery type", "5000 mAh"),
            ],
            ..Default::default()
        };
        let facts = extract(&merged);
        apply(&mut merged, &facts);
        assert!(merged.quick("Battery type").is_none());
        assert_eq!(merged.quick("Battery size").unwrap().value, "5000 mAh");
        assert_eq!(merged.quick_spec[1].name, "Battery size");
    }

    #[test]
    fn misfiled_capacity_dropped_when_size_known() {
        let mut merged = with_battery(vec![SpecEntry::new("Type", "4500 mAh, non-removable")]);
        merged.quick_spec.push(SpecEntry::new("Battery type", "4400mAh"));
        let facts = extract(&merged);
        apply(&mut merged, &facts);
        assert!(merged.quick("Battery type").is_none());
        assert_eq!(merged.quick("Battery size").unwrap().value, "4500 mAh");
    }

    #[test]
    fn genuine_type_entry_untouched_without_facts() {
        let mut merged = MergedSpec {
            quick_spec: vec![SpecEntry::new("Battery type", "Li-Po")],
            ..Default::default()
        };
        apply(&mut merged, &BatteryFacts::default());
        assert_eq!(merged.quick("Battery type").unwrap().value, "Li-Po");
        assert!(merged.quick("Battery size").is_none());
    }
}
