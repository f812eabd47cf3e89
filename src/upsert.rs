use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Heuristics;
use crate::db::{DeviceChanges, NewDevice, RecordStore};
use crate::enrich::{self, EnrichReport};
use crate::error::PipelineError;
use crate::identity::{Identity, IdentityExtractor, UNKNOWN};
use crate::merge::Merger;
use crate::model::{Action, DeviceQuery, DeviceRecord, MergedSpec, PipelineOutcome, SpecSource, STATUS_ACTIVE};
use crate::sanitize::sanitize_source;

const DISPLAY_OFFSET_SECS: i32 = 8 * 3600;

/// Everything the pipeline derives before touching the store.
#[derive(Debug, Clone, Serialize)]
pub struct Prepared {
    pub identity: Identity,
    pub merged: MergedSpec,
    pub enrichment: EnrichReport,
    /// Sanitized origin snapshots, persisted as-is.
    #[serde(skip)]
    pub official: SpecSource,
    #[serde(skip)]
    pub unofficial: SpecSource,
}

/// sanitize → merge → identify → enrich → upsert.
pub struct Pipeline<S> {
    store: S,
    merger: Merger,
    identity: IdentityExtractor,
    clock: fn() -> DateTime<Utc>,
}

impl<S: RecordStore> Pipeline<S> {
    pub fn new(store: S, heuristics: &Heuristics) -> Result<Self, PipelineError> {
        Ok(Pipeline {
            store,
            merger: Merger::new(heuristics),
            identity: IdentityExtractor::new(heuristics)?,
            clock: Utc::now,
        })
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run every stage except persistence. `None` when both origins are empty.
    pub fn prepare(
        &self,
        official: &SpecSource,
        unofficial: &SpecSource,
        query: &DeviceQuery,
    ) -> Option<Prepared> {
        let clean_official = sanitize_source(official);
        let clean_unofficial = sanitize_source(unofficial);

        let mut merged = self.merger.merge(&clean_official, &clean_unofficial, query)?;
        let mut identity = self
            .identity
            .identify(&clean_official.name, &clean_unofficial.name, query);

        let enrichment = enrich::enrich(&mut merged, &[official, unofficial]);

        if identity.model == UNKNOWN {
            if let Some(code) = &enrichment.model_code {
                debug!(brand = %identity.brand, code = %code, "model unresolved, using model code");
                identity.model = code.clone();
            }
        }

        Some(Prepared {
            identity,
            merged,
            enrichment,
            official: clean_official,
            unofficial: clean_unofficial,
        })
    }

    pub fn run(
        &self,
        existing_id: Option<i64>,
        official: &SpecSource,
        unofficial: &SpecSource,
        query: &DeviceQuery,
    ) -> Result<PipelineOutcome, PipelineError> {
        let Some(prepared) = self.prepare(official, unofficial, query) else {
            debug!(brand = %query.brand, model = %query.model, "no data from either origin, skipping");
            return Ok(PipelineOutcome::no_op());
        };
        let Prepared {
            identity,
            merged,
            official,
            unofficial,
            ..
        } = prepared;
        let official_specs = (!official.is_empty()).then_some(official);
        let unofficial_specs = (!unofficial.is_empty()).then_some(unofficial);

        let target = match existing_id {
            Some(id) => Some(id),
            None => {
                if !identity.is_resolved() {
                    warn!(
                        brand = %identity.brand,
                        model = %identity.model,
                        "identity unresolved, looking up by sentinel pair"
                    );
                }
                self.lookup(&identity)
            }
        };

        let now = (self.clock)().to_rfc3339_opts(SecondsFormat::Millis, true);
        let (action, row) = match target {
            Some(id) => {
                let changes = DeviceChanges {
                    official_specs,
                    unofficial_specs,
                    merged_specs: merged.clone(),
                    updated_at: now,
                };
                let row = self
                    .store
                    .update(id, &changes)
                    .map_err(|source| PipelineError::Update { id, source })?;
                info!(id, brand = %row.brand, model = %row.model, "updated device");
                (Action::Update, row)
            }
            None => {
                let device = NewDevice {
                    brand: identity.brand.clone(),
                    model: identity.model.clone(),
                    official_specs,
                    unofficial_specs,
                    merged_specs: merged.clone(),
                    status: STATUS_ACTIVE.to_string(),
                    created_at: now,
                };
                let row = self.store.insert(&device).map_err(|source| PipelineError::Insert {
                    brand: identity.brand.clone(),
                    model: identity.model.clone(),
                    source,
                })?;
                info!(id = row.id, brand = %row.brand, model = %row.model, "inserted device");
                (Action::Insert, row)
            }
        };

        Ok(PipelineOutcome {
            action,
            row: Some(for_display(row)),
            merged: Some(merged),
        })
    }

    /// A failed lookup counts as "not found"; the caller then inserts and may
    /// create a duplicate `(brand, model)` row.
    fn lookup(&self, identity: &Identity) -> Option<i64> {
        match self.store.find_by_brand_model(&identity.brand, &identity.model) {
            Ok(found) => found.map(|r| r.id),
            Err(e) => {
                warn!(brand = %identity.brand, model = %identity.model, "lookup failed, inserting: {e}");
                None
            }
        }
    }
}

/// Copy of `row` with both timestamps rendered at +08:00.
pub fn for_display(mut row: DeviceRecord) -> DeviceRecord {
    row.created_at = render_display_timestamp(&row.created_at);
    row.updated_at = render_display_timestamp(&row.updated_at);
    row
}

/// `2024-01-01T00:00:00.000Z` → `2024-01-01T08:00:00.000+08:00`.
/// Unparseable input is returned unchanged.
pub fn render_display_timestamp(stored: &str) -> String {
    let Some(offset) = FixedOffset::east_opt(DISPLAY_OFFSET_SECS) else {
        return stored.to_string();
    };
    match DateTime::parse_from_rfc3339(stored) {
        Ok(ts) => ts
            .with_timezone(&offset)
            .format("%Y-%m-%dT%H:%M:%S%.3f%:z")
            .to_string(),
        Err(e) => {
            debug!(stored, "timestamp not RFC 3339: {e}");
            stored.to_string()
        }
    }
}
