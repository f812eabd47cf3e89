use std::collections::HashMap;

use tracing::debug;

use crate::config::Heuristics;
use crate::identity::NamePreference;
use crate::model::{DeviceQuery, MergedSpec, SpecCategory, SpecEntry, SpecSource};

/// Combines the official and unofficial origins into one canonical view.
#[derive(Debug, Clone)]
pub struct Merger {
    category_order: Vec<String>,
    names: NamePreference,
}

impl Merger {
    pub fn new(heuristics: &Heuristics) -> Self {
        Merger {
            category_order: heuristics.category_order.clone(),
            names: NamePreference::new(heuristics),
        }
    }

    /// Merge two sanitized sources. `None` when neither carries any data.
    pub fn merge(
        &self,
        official: &SpecSource,
        unofficial: &SpecSource,
        query: &DeviceQuery,
    ) -> Option<MergedSpec> {
        if official.is_empty() && unofficial.is_empty() {
            return None;
        }

        let name = self
            .names
            .choose(&official.name, &unofficial.name, query)
            .to_string();

        let image = if official.image.is_empty() {
            unofficial.image.clone()
        } else {
            official.image.clone()
        };

        // unofficial first so official overwrites on conflict
        let mut by_label: HashMap<String, &Vec<SpecEntry>> = HashMap::new();
        for cat in unofficial.detail_spec.iter().chain(&official.detail_spec) {
            if cat.specifications.is_empty() {
                continue;
            }
            by_label.insert(label_key(&cat.category), &cat.specifications);
        }

        let detail_spec: Vec<SpecCategory> = self
            .category_order
            .iter()
            .map(|label| {
                let specs = by_label
                    .remove(&label_key(label))
                    .cloned()
                    .unwrap_or_default();
                SpecCategory::new(label.clone(), specs)
            })
            .collect();

        if !by_label.is_empty() {
            let mut dropped: Vec<&String> = by_label.keys().collect();
            dropped.sort();
            debug!(?dropped, "categories outside canonical order left out of merge");
        }

        let quick_spec = if !official.quick_spec.is_empty() {
            official.quick_spec.clone()
        } else {
            unofficial.quick_spec.clone()
        };

        Some(MergedSpec {
            name,
            image,
            detail_spec,
            quick_spec,
        })
    }
}

fn label_key(label: &str) -> String {
    label.trim().to_lowercase()
}
