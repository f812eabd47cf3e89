use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{MergedSpec, SpecEntry};

static CAPACITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(TB|GB|MB)\b").unwrap());
static RAM_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*RAM\b").unwrap());

pub const QUICK_NAME: &str = "RAM / Storage";

/// Quick entries superseded by the combined variant entry.
const REPLACED: &[&str] = &[
    "ram",
    "ram size",
    "storage",
    "internal storage",
    "internal memory",
    "rom",
    "memory",
    "ram / storage",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Capacity {
    amount: String,
    unit: String,
    megabytes: f64,
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub ram: Capacity,
    pub storage: Capacity,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.ram, self.storage)
    }
}

/// Parse one variant string such as `"128GB 4GB RAM"`.
///
/// An explicit `RAM` label decides which token is RAM; otherwise the smaller
/// capacity is RAM. Equal unlabeled capacities are ambiguous.
pub fn parse_variant(text: &str) -> Option<Variant> {
    let mut labeled = None;
    let mut plain = Vec::new();
    for caps in CAPACITY_RE.captures_iter(text) {
        let whole = caps.get(0)?;
        let amount = caps[1].to_string();
        let unit = caps[2].to_uppercase();
        let value: f64 = amount.parse().ok()?;
        let megabytes = match unit.as_str() {
            "TB" => value * 1024.0 * 1024.0,
            "GB" => value * 1024.0,
            _ => value,
        };
        let cap = Capacity {
            amount,
            unit,
            megabytes,
        };
        if labeled.is_none() && RAM_LABEL_RE.is_match(&text[whole.end()..]) {
            labeled = Some(cap);
        } else {
            plain.push(cap);
        }
    }

    match labeled {
        Some(ram) => {
            let storage = plain.into_iter().next()?;
            Some(Variant { ram, storage })
        }
        None => {
            let mut tokens = plain.into_iter();
            let a = tokens.next()?;
            let b = tokens.next()?;
            if a.megabytes < b.megabytes {
                Some(Variant { ram: a, storage: b })
            } else if b.megabytes < a.megabytes {
                Some(Variant { ram: b, storage: a })
            } else {
                None
            }
        }
    }
}

/// Every parsable variant in a comma/newline separated value, deduplicated.
pub fn parse_variants(value: &str) -> Vec<Variant> {
    let mut out: Vec<Variant> = Vec::new();
    for part in value.split([',', '\n', ';']) {
        if let Some(v) = parse_variant(part) {
            if !out.contains(&v) {
                out.push(v);
            }
        }
    }
    out
}

pub fn format_variants(variants: &[Variant]) -> Option<String> {
    if variants.is_empty() {
        return None;
    }
    Some(
        variants
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Memory → Internal, the structured location of variant data.
pub fn extract(merged: &MergedSpec) -> Option<String> {
    let internal = merged.category("Memory")?.find("Internal")?;
    format_variants(&parse_variants(&internal.value))
}

/// Write the summary, replacing RAM-only / storage-only entries in place.
pub fn apply(merged: &mut MergedSpec, summary: &str) {
    let first = merged
        .quick_spec
        .iter()
        .position(|q| REPLACED.contains(&q.name.trim().to_lowercase().as_str()));
    merged
        .quick_spec
        .retain(|q| !REPLACED.contains(&q.name.trim().to_lowercase().as_str()));
    let entry = SpecEntry::new(QUICK_NAME, summary);
    match first {
        Some(idx) => merged.quick_spec.insert(idx.min(merged.quick_spec.len()), entry),
        None => merged.quick_spec.push(entry),
    }
}
