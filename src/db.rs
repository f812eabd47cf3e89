use std::path::Path;

use rusqlite::{params, types::Value as SqlValue, Connection, OptionalExtension, ToSql};

use crate::error::{StoreError, StoreOp};
use crate::model::{DeviceRecord, MergedSpec, SpecSource};

/// Columns for a brand-new row.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub brand: String,
    pub model: String,
    pub official_specs: Option<SpecSource>,
    pub unofficial_specs: Option<SpecSource>,
    pub merged_specs: MergedSpec,
    pub status: String,
    pub created_at: String,
}

/// Partial update. `None` origin snapshots leave the stored column alone.
#[derive(Debug, Clone)]
pub struct DeviceChanges {
    pub official_specs: Option<SpecSource>,
    pub unofficial_specs: Option<SpecSource>,
    pub merged_specs: MergedSpec,
    pub updated_at: String,
}

/// The record store the upsert manager writes through.
///
/// Each call is atomic on its own; nothing coordinates a lookup with the
/// write that follows it.
pub trait RecordStore {
    fn find_by_brand_model(&self, brand: &str, model: &str) -> Result<Option<DeviceRecord>, StoreError>;
    fn find_by_id(&self, id: i64) -> Result<Option<DeviceRecord>, StoreError>;
    fn insert(&self, device: &NewDevice) -> Result<DeviceRecord, StoreError>;
    fn update(&self, id: i64, changes: &DeviceChanges) -> Result<DeviceRecord, StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

const SELECT_COLUMNS: &str = "id, brand, model, official_specs, unofficial_specs, merged_specs,
                              status, created_at, updated_at";

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable {
                op: StoreOp::Schema,
                message: format!("cannot create {}: {}", parent.display(), e),
            })?;
        }
        let conn = Connection::open(path).map_err(StoreError::sqlite(StoreOp::Schema))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(StoreError::sqlite(StoreOp::Schema))?;
        Ok(SqliteStore { conn })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::sqlite(StoreOp::Schema))?;
        Ok(SqliteStore { conn })
    }

    /// No UNIQUE(brand, model): the pre-insert lookup is the only dedup.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS devices (
                    id               INTEGER PRIMARY KEY,
                    brand            TEXT NOT NULL,
                    model            TEXT NOT NULL,
                    official_specs   TEXT,
                    unofficial_specs TEXT,
                    merged_specs     TEXT NOT NULL,
                    status           TEXT NOT NULL DEFAULT 'active',
                    created_at       TEXT NOT NULL,
                    updated_at       TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_devices_brand_model ON devices(brand, model);
                ",
            )
            .map_err(StoreError::sqlite(StoreOp::Schema))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn fetch_one(
        &self,
        op: StoreOp,
        where_clause: &str,
        params: &[&dyn ToSql],
    ) -> Result<Option<DeviceRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM devices WHERE {} ORDER BY id LIMIT 1",
            SELECT_COLUMNS, where_clause
        );
        let raw = self
            .conn
            .query_row(&sql, params, RawRow::from_row)
            .optional()
            .map_err(StoreError::sqlite(op))?;
        raw.map(RawRow::decode).transpose()
    }
}

impl RecordStore for SqliteStore {
    fn find_by_brand_model(&self, brand: &str, model: &str) -> Result<Option<DeviceRecord>, StoreError> {
        self.fetch_one(StoreOp::Lookup, "brand = ?1 AND model = ?2", &[&brand, &model])
    }

    fn find_by_id(&self, id: i64) -> Result<Option<DeviceRecord>, StoreError> {
        self.fetch_one(StoreOp::Fetch, "id = ?1", &[&id])
    }

    fn insert(&self, device: &NewDevice) -> Result<DeviceRecord, StoreError> {
        let official = encode_opt("official_specs", device.official_specs.as_ref())?;
        let unofficial = encode_opt("unofficial_specs", device.unofficial_specs.as_ref())?;
        let merged = encode("merged_specs", &device.merged_specs)?;
        self.conn
            .execute(
                "INSERT INTO devices
                 (brand, model, official_specs, unofficial_specs, merged_specs, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    device.brand,
                    device.model,
                    official,
                    unofficial,
                    merged,
                    device.status,
                    device.created_at,
                ],
            )
            .map_err(StoreError::sqlite(StoreOp::Insert))?;
        let id = self.conn.last_insert_rowid();
        self.find_by_id(id)?.ok_or(StoreError::NotFound(id))
    }

    fn update(&self, id: i64, changes: &DeviceChanges) -> Result<DeviceRecord, StoreError> {
        let mut fields: Vec<(&str, SqlValue)> = Vec::new();
        if let Some(official) = &changes.official_specs {
            fields.push(("official_specs", SqlValue::from(encode("official_specs", official)?)));
        }
        if let Some(unofficial) = &changes.unofficial_specs {
            fields.push(("unofficial_specs", SqlValue::from(encode("unofficial_specs", unofficial)?)));
        }
        fields.push(("merged_specs", SqlValue::from(encode("merged_specs", &changes.merged_specs)?)));
        fields.push(("updated_at", SqlValue::from(changes.updated_at.clone())));

        let set_clause: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (k, _))| format!("{} = ?{}", k, i + 1))
            .collect();
        let sql = format!(
            "UPDATE devices SET {} WHERE id = ?{}",
            set_clause.join(", "),
            fields.len() + 1
        );

        let params_owned: Vec<SqlValue> = fields.into_iter().map(|(_, v)| v).collect();
        let mut params: Vec<&dyn ToSql> = params_owned.iter().map(|v| v as &dyn ToSql).collect();
        params.push(&id as &dyn ToSql);
        let touched = self
            .conn
            .execute(&sql, params.as_slice())
            .map_err(StoreError::sqlite(StoreOp::Update))?;
        if touched == 0 {
            return Err(StoreError::NotFound(id));
        }
        self.find_by_id(id)?.ok_or(StoreError::NotFound(id))
    }
}

struct RawRow {
    id: i64,
    brand: String,
    model: String,
    official_specs: Option<String>,
    unofficial_specs: Option<String>,
    merged_specs: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawRow {
            id: row.get(0)?,
            brand: row.get(1)?,
            model: row.get(2)?,
            official_specs: row.get(3)?,
            unofficial_specs: row.get(4)?,
            merged_specs: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<DeviceRecord, StoreError> {
        let id = self.id;
        let parse = |column: &'static str, text: &str| {
            serde_json::from_str::<SpecSource>(text)
                .map_err(|source| StoreError::Decode { id, column, source })
        };
        Ok(DeviceRecord {
            id,
            brand: self.brand,
            model: self.model,
            official_specs: self
                .official_specs
                .as_deref()
                .map(|t| parse("official_specs", t))
                .transpose()?,
            unofficial_specs: self
                .unofficial_specs
                .as_deref()
                .map(|t| parse("unofficial_specs", t))
                .transpose()?,
            merged_specs: parse("merged_specs", &self.merged_specs)?,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn encode(column: &'static str, spec: &SpecSource) -> Result<String, StoreError> {
    serde_json::to_string(spec).map_err(|source| StoreError::Encode { column, source })
}

fn encode_opt(column: &'static str, spec: Option<&SpecSource>) -> Result<Option<String>, StoreError> {
    spec.map(|s| encode(column, s)).transpose()
}

// ── Reports ──

pub struct Stats {
    pub total: usize,
    pub unresolved: usize,
    pub by_brand: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> rusqlite::Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM devices", [], |r| r.get(0))?;
    let unresolved: usize = conn.query_row(
        "SELECT COUNT(*) FROM devices WHERE brand = 'unknown' OR model = 'unknown'",
        [],
        |r| r.get(0),
    )?;
    let mut stmt = conn.prepare(
        "SELECT brand, COUNT(*) FROM devices GROUP BY brand ORDER BY COUNT(*) DESC, brand",
    )?;
    let by_brand = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stats {
        total,
        unresolved,
        by_brand,
    })
}

/// A `(brand, model)` pair stored more than once.
pub struct DuplicateGroup {
    pub brand: String,
    pub model: String,
    pub ids: Vec<i64>,
}

pub fn find_duplicates(conn: &Connection) -> rusqlite::Result<Vec<DuplicateGroup>> {
    let mut stmt = conn.prepare(
        "SELECT brand, model, GROUP_CONCAT(id)
         FROM (SELECT id, brand, model FROM devices ORDER BY id)
         GROUP BY brand, model
         HAVING COUNT(*) > 1
         ORDER BY brand, model",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let ids: String = row.get(2)?;
            Ok(DuplicateGroup {
                brand: row.get(0)?,
                model: row.get(1)?,
                ids: ids.split(',').filter_map(|s| s.trim().parse().ok()).collect(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SpecCategory, SpecEntry};

    fn store() -> SqliteStore {
        let s = SqliteStore::in_memory().unwrap();
        s.init_schema().unwrap();
        s
    }

    fn merged(name: &str) -> MergedSpec {
        MergedSpec {
            name: name.into(),
            detail_spec: vec![SpecCategory::new("Battery", vec![SpecEntry::new("Type", "5000 mAh")])],
            ..Default::default()
        }
    }

    fn new_device(brand: &str, model: &str) -> NewDevice {
        NewDevice {
            brand: brand.into(),
            model: model.into(),
            official_specs: Some(merged("official")),
            unofficial_specs: None,
            merged_specs: merged("merged"),
            status: "active".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn insert_then_lookup() {
        let s = store();
        let row = s.insert(&new_device("Samsung", "Galaxy A34")).unwrap();
        assert_eq!(row.created_at, row.updated_at);
        assert!(row.unofficial_specs.is_none());

        let found = s.find_by_brand_model("Samsung", "Galaxy A34").unwrap().unwrap();
        assert_eq!(found, row);
        assert!(s.find_by_brand_model("Samsung", "Galaxy A35").unwrap().is_none());
        assert!(s.find_by_brand_model("samsung", "Galaxy A34").unwrap().is_none());
    }

    #[test]
    fn update_only_touches_given_columns() {
        let s = store();
        let row = s.insert(&new_device("Samsung", "Galaxy A34")).unwrap();
        let changes = DeviceChanges {
            official_specs: None,
            unofficial_specs: Some(merged("unofficial")),
            merged_specs: merged("merged again"),
            updated_at: "2026-01-02T00:00:00.000Z".into(),
        };
        let updated = s.update(row.id, &changes).unwrap();
        assert_eq!(updated.official_specs, row.official_specs);
        assert_eq!(updated.unofficial_specs.unwrap().name, "unofficial");
        assert_eq!(updated.merged_specs.name, "merged again");
        assert_eq!(updated.created_at, "2026-01-01T00:00:00.000Z");
        assert_eq!(updated.updated_at, "2026-01-02T00:00:00.000Z");
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let s = store();
        let changes = DeviceChanges {
            official_specs: None,
            unofficial_specs: None,
            merged_specs: merged("m"),
            updated_at: "2026-01-02T00:00:00.000Z".into(),
        };
        assert!(matches!(s.update(42, &changes), Err(StoreError::NotFound(42))));
    }

    #[test]
    fn lookup_without_schema_is_sqlite_error() {
        let s = SqliteStore::in_memory().unwrap();
        let err = s.find_by_brand_model("Samsung", "Galaxy A34").unwrap_err();
        assert!(matches!(err, StoreError::Sqlite { op: StoreOp::Lookup, .. }));
        assert!(err.to_string().contains("lookup by brand/model"));
    }

    #[test]
    fn corrupt_json_reported_with_column() {
        let s = store();
        s.connection()
            .execute(
                "INSERT INTO devices (brand, model, merged_specs, created_at, updated_at)
                 VALUES ('X', 'Y', 'not json', 't', 't')",
                [],
            )
            .unwrap();
        let err = s.find_by_brand_model("X", "Y").unwrap_err();
        assert!(matches!(err, StoreError::Decode { column: "merged_specs", .. }));
    }

    #[test]
    fn duplicates_and_stats() {
        let s = store();
        s.insert(&new_device("Samsung", "Galaxy A34")).unwrap();
        s.insert(&new_device("Samsung", "Galaxy A34")).unwrap();
        s.insert(&new_device("Google", "Pixel 8")).unwrap();
        s.insert(&new_device("unknown", "unknown")).unwrap();

        let dups = find_duplicates(s.connection()).unwrap();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].brand, "Samsung");
        assert_eq!(dups[0].ids, vec![1, 2]);

        let stats = get_stats(s.connection()).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.by_brand[0], ("Samsung".to_string(), 2));
    }
}
