use serde::{Deserialize, Serialize};

/// One `{ name, value }` pair. `value` may hold several newline-joined entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecEntry {
    pub name: String,
    pub value: String,
}

impl SpecEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        SpecEntry {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecCategory {
    pub category: String,
    pub specifications: Vec<SpecEntry>,
}

impl SpecCategory {
    pub fn new(category: impl Into<String>, specifications: Vec<SpecEntry>) -> Self {
        SpecCategory {
            category: category.into(),
            specifications,
        }
    }

    pub fn find(&self, name: &str) -> Option<&SpecEntry> {
        self.specifications
            .iter()
            .find(|s| s.name.trim().eq_ignore_ascii_case(name))
    }
}

/// One scrape result from one origin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecSource {
    pub name: String,
    pub image: String,
    pub detail_spec: Vec<SpecCategory>,
    pub quick_spec: Vec<SpecEntry>,
}

/// Reconciled view of both origins.
///
/// Same wire shape as [`SpecSource`], but `detail_spec` always lists the
/// canonical categories in canonical order, with absent ones kept as empty
/// specification lists so consumers can index positionally.
pub type MergedSpec = SpecSource;

impl SpecSource {
    /// True when the source carries nothing worth merging.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
            && self.image.trim().is_empty()
            && self.quick_spec.is_empty()
            && self.detail_spec.iter().all(|c| c.specifications.is_empty())
    }

    pub fn category(&self, label: &str) -> Option<&SpecCategory> {
        self.detail_spec
            .iter()
            .find(|c| c.category.trim().eq_ignore_ascii_case(label))
    }

    pub fn quick(&self, name: &str) -> Option<&SpecEntry> {
        self.quick_spec
            .iter()
            .find(|q| q.name.trim().eq_ignore_ascii_case(name))
    }

    pub fn quick_index(&self, name: &str) -> Option<usize> {
        self.quick_spec
            .iter()
            .position(|q| q.name.trim().eq_ignore_ascii_case(name))
    }

    /// Replace the value of quick entry `name`, or append it.
    pub fn set_quick(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.quick_index(name) {
            Some(idx) => self.quick_spec[idx].value = value,
            None => self.quick_spec.push(SpecEntry::new(name, value)),
        }
    }

    pub fn remove_quick(&mut self, name: &str) -> Option<SpecEntry> {
        let idx = self.quick_index(name)?;
        Some(self.quick_spec.remove(idx))
    }

    pub fn has_detail_data(&self) -> bool {
        self.detail_spec.iter().any(|c| !c.specifications.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Official,
    Unofficial,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Official => f.write_str("official"),
            Origin::Unofficial => f.write_str("unofficial"),
        }
    }
}

/// The caller's intended device, used to validate scraped names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceQuery {
    pub brand: String,
    pub model: String,
}

impl DeviceQuery {
    pub fn new(brand: impl Into<String>, model: impl Into<String>) -> Self {
        DeviceQuery {
            brand: brand.into(),
            model: model.into(),
        }
    }
}

/// Persisted row. Timestamps are RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: i64,
    pub brand: String,
    pub model: String,
    pub official_specs: Option<SpecSource>,
    pub unofficial_specs: Option<SpecSource>,
    pub merged_specs: MergedSpec,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "insert")]
    Insert,
    #[serde(rename = "update")]
    Update,
    #[serde(rename = "no-op")]
    NoOp,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Insert => f.write_str("insert"),
            Action::Update => f.write_str("update"),
            Action::NoOp => f.write_str("no-op"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub action: Action,
    pub row: Option<DeviceRecord>,
    pub merged: Option<MergedSpec>,
}

impl PipelineOutcome {
    pub fn no_op() -> Self {
        PipelineOutcome {
            action: Action::NoOp,
            row: None,
            merged: None,
        }
    }
}
