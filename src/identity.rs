use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;

use crate::config::{Heuristics, PrefixRule};
use crate::model::DeviceQuery;

/// Sentinel for an unresolved brand or model.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub brand: String,
    pub model: String,
}

impl Identity {
    pub fn new(brand: impl Into<String>, model: impl Into<String>) -> Self {
        Identity {
            brand: brand.into(),
            model: model.into(),
        }
    }

    pub fn unknown() -> Self {
        Identity::new(UNKNOWN, UNKNOWN)
    }

    pub fn is_resolved(&self) -> bool {
        self.brand != UNKNOWN && self.model != UNKNOWN
    }
}

/// Decides whether the official display name is usable or the unofficial one
/// should stand in for it.
#[derive(Debug, Clone)]
pub struct NamePreference {
    generic_words: HashSet<String>,
    min_len: usize,
}

impl NamePreference {
    pub fn new(heuristics: &Heuristics) -> Self {
        NamePreference {
            generic_words: heuristics
                .generic_name_words
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
            min_len: heuristics.min_name_len,
        }
    }

    /// Empty, too short, or built only from generic page/tool words.
    pub fn is_trivial(&self, name: &str) -> bool {
        let name = name.trim();
        if name.chars().count() < self.min_len {
            return true;
        }
        let words: Vec<String> = name
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();
        words.is_empty() || words.iter().all(|w| self.generic_words.contains(w))
    }

    pub fn choose<'a>(&self, official: &'a str, unofficial: &'a str, query: &DeviceQuery) -> &'a str {
        if unofficial.trim().is_empty() {
            return official;
        }
        if self.is_trivial(official) {
            return unofficial;
        }
        if !mentions_query(official, query) && mentions_query(unofficial, query) {
            return unofficial;
        }
        official
    }
}

fn mentions_query(name: &str, query: &DeviceQuery) -> bool {
    let lower = name.to_lowercase();
    let brand = query.brand.trim().to_lowercase();
    let model = query.model.trim().to_lowercase();
    (!brand.is_empty() && lower.contains(&brand)) || (!model.is_empty() && lower.contains(&model))
}

struct BrandPattern {
    brand: String,
    re: Regex,
}

/// Splits a display name into `(brand, model)`.
pub struct IdentityExtractor {
    brands: Vec<BrandPattern>,
    prefixes: Vec<PrefixRule>,
    names: NamePreference,
}

impl IdentityExtractor {
    pub fn new(heuristics: &Heuristics) -> Result<Self, regex::Error> {
        let brands = heuristics
            .brands
            .iter()
            .filter(|b| !b.trim().is_empty())
            .map(|b| {
                let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(b.trim())))?;
                Ok(BrandPattern {
                    brand: b.trim().to_string(),
                    re,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        let prefixes = heuristics
            .brand_prefixes
            .iter()
            .map(|p| PrefixRule {
                prefix: p.prefix.to_lowercase(),
                brand: p.brand.clone(),
            })
            .collect();
        Ok(IdentityExtractor {
            brands,
            prefixes,
            names: NamePreference::new(heuristics),
        })
    }

    /// Pick the working name, then extract from it.
    pub fn identify(&self, official: &str, unofficial: &str, query: &DeviceQuery) -> Identity {
        self.extract_brand_model(self.names.choose(official, unofficial, query))
    }

    pub fn extract_brand_model(&self, name: &str) -> Identity {
        let name = name.trim();
        if name.is_empty() {
            return Identity::unknown();
        }

        if let Some(pattern) = self.detect_brand(name) {
            let model = strip_brand(name, &pattern.re);
            return if model.is_empty() {
                Identity::new(pattern.brand.clone(), UNKNOWN)
            } else {
                Identity::new(pattern.brand.clone(), model)
            };
        }

        let lower = name.to_lowercase();
        if let Some(rule) = self.prefixes.iter().find(|p| lower.starts_with(&p.prefix)) {
            return Identity::new(rule.brand.clone(), name);
        }

        let mut words = name.splitn(2, char::is_whitespace);
        let first = words
            .next()
            .unwrap_or("")
            .trim_matches(|c: char| !c.is_alphanumeric());
        let rest = words.next().unwrap_or("").trim();
        if let Some(pattern) = self
            .brands
            .iter()
            .find(|p| p.brand.eq_ignore_ascii_case(first))
        {
            if !rest.is_empty() {
                return Identity::new(pattern.brand.clone(), rest);
            }
        }

        Identity::unknown()
    }

    /// Earliest match in the name wins; ties go to the longer brand.
    fn detect_brand(&self, name: &str) -> Option<&BrandPattern> {
        self.brands
            .iter()
            .filter_map(|p| p.re.find(name).map(|m| (m.start(), p)))
            .min_by(|(a_pos, a), (b_pos, b)| {
                a_pos
                    .cmp(b_pos)
                    .then_with(|| b.brand.len().cmp(&a.brand.len()))
            })
            .map(|(_, p)| p)
    }
}

fn strip_brand(name: &str, brand_re: &Regex) -> String {
    let stripped = brand_re.replace_all(name, " ");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '-' || c == ',' || c == ':' || c == '|' || c.is_whitespace())
        .to_string()
}
