//! Persisted area catalog.

use rusqlite::{params, Connection, OptionalExtension};

use tenki_core::{RusqliteErrorExt, StorageError};
use tenki_forecast::{Area, AreaCatalog, AreaType};

use crate::store::{write_error, SnapshotStore};

const AREA_COLUMNS: &str =
    "area_code, area_name, area_name_en, area_type, parent_code, office_name";

impl SnapshotStore {
    /// Insert or replace every center and office of `catalog`, keyed by area code.
    ///
    /// Areas missing from `catalog` are left in place.
    pub fn replace_catalog(&self, catalog: &AreaCatalog) -> Result<usize, StorageError> {
        let areas = catalog.areas();
        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(write_error)?;

        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT OR REPLACE INTO areas ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    AREA_COLUMNS
                ))
                .map_err(write_error)?;

            for area in &areas {
                stmt.execute(params![
                    area.area_code,
                    area.area_name,
                    area.area_name_en,
                    area.area_type.map(|t| t.as_str()),
                    area.parent_code,
                    area.office_name,
                ])
                .map_err(write_error)?;
            }
        }

        tx.commit().map_err(write_error)?;
        tracing::info!("Stored {} catalog areas", areas.len());
        Ok(areas.len())
    }

    /// All areas ordered by code.
    pub fn list_areas(&self) -> Result<Vec<Area>, StorageError> {
        let conn = self.connect()?;
        query_areas(
            &conn,
            &format!("SELECT {} FROM areas ORDER BY area_code", AREA_COLUMNS),
            params![],
        )
    }

    pub fn areas_by_type(&self, area_type: AreaType) -> Result<Vec<Area>, StorageError> {
        let conn = self.connect()?;
        query_areas(
            &conn,
            &format!(
                "SELECT {} FROM areas WHERE area_type = ?1 ORDER BY area_code",
                AREA_COLUMNS
            ),
            params![area_type.as_str()],
        )
    }

    /// Offices whose parent is `center_code`.
    pub fn offices_by_center(&self, center_code: &str) -> Result<Vec<Area>, StorageError> {
        let conn = self.connect()?;
        query_areas(
            &conn,
            &format!(
                "SELECT {} FROM areas WHERE parent_code = ?1 ORDER BY area_code",
                AREA_COLUMNS
            ),
            params![center_code],
        )
    }

    pub fn area(&self, area_code: &str) -> Result<Option<Area>, StorageError> {
        let conn = self.connect()?;
        conn.query_row(
            &format!("SELECT {} FROM areas WHERE area_code = ?1", AREA_COLUMNS),
            params![area_code],
            row_to_area,
        )
        .optional()
        .map_err(RusqliteErrorExt::into_storage_error)
    }
}

fn query_areas(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Area>, StorageError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(RusqliteErrorExt::into_storage_error)?;

    let rows = stmt
        .query_map(params, row_to_area)
        .map_err(RusqliteErrorExt::into_storage_error)?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(RusqliteErrorExt::into_storage_error)
}

fn row_to_area(row: &rusqlite::Row) -> rusqlite::Result<Area> {
    let area_type: Option<String> = row.get(3)?;

    Ok(Area {
        area_code: row.get(0)?,
        area_name: row.get(1)?,
        area_name_en: row.get(2)?,
        area_type: area_type.and_then(|t| t.parse().ok()),
        parent_code: row.get(4)?,
        office_name: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, SnapshotStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path().join("weather.db")).unwrap();
        (dir, store)
    }

    fn kanto_catalog() -> AreaCatalog {
        AreaCatalog::from_json(json!({
            "centers": {
                "010300": {
                    "name": "関東甲信地方",
                    "enName": "Kanto Koshin",
                    "officeName": "気象庁",
                    "children": ["130000", "140000"]
                }
            },
            "offices": {
                "130000": {
                    "name": "東京都",
                    "enName": "Tokyo",
                    "officeName": "気象庁",
                    "parent": "010300"
                },
                "140000": {
                    "name": "神奈川県",
                    "enName": "Kanagawa",
                    "officeName": "横浜地方気象台",
                    "parent": "010300"
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_replace_and_list_catalog() {
        let (_dir, store) = temp_store();

        let stored = store.replace_catalog(&kanto_catalog()).unwrap();
        assert_eq!(stored, 3);

        let areas = store.list_areas().unwrap();
        let codes: Vec<&str> = areas.iter().map(|a| a.area_code.as_str()).collect();
        assert_eq!(codes, ["010300", "130000", "140000"]);
    }

    #[test]
    fn test_areas_by_type() {
        let (_dir, store) = temp_store();
        store.replace_catalog(&kanto_catalog()).unwrap();

        let centers = store.areas_by_type(AreaType::Center).unwrap();
        assert_eq!(centers.len(), 1);
        assert_eq!(centers[0].area_name, "関東甲信地方");
        assert_eq!(centers[0].parent_code, None);

        assert_eq!(store.areas_by_type(AreaType::Office).unwrap().len(), 2);
    }

    #[test]
    fn test_offices_by_center() {
        let (_dir, store) = temp_store();
        store.replace_catalog(&kanto_catalog()).unwrap();

        let offices = store.offices_by_center("010300").unwrap();
        assert_eq!(offices.len(), 2);
        assert_eq!(offices[0].area_name_en.as_deref(), Some("Tokyo"));
        assert!(store.offices_by_center("010100").unwrap().is_empty());
    }

    #[test]
    fn test_reload_replaces_by_code_without_pruning() {
        let (_dir, store) = temp_store();
        store.replace_catalog(&kanto_catalog()).unwrap();

        let renamed = AreaCatalog::from_json(json!({
            "offices": {
                "130000": { "name": "東京", "parent": "010300" }
            }
        }))
        .unwrap();
        store.replace_catalog(&renamed).unwrap();

        let tokyo = store.area("130000").unwrap().unwrap();
        assert_eq!(tokyo.area_name, "東京");
        assert_eq!(tokyo.area_name_en, None);
        assert_eq!(tokyo.area_type, Some(AreaType::Office));

        // Absent from the second load, still present
        assert!(store.area("140000").unwrap().is_some());
        assert_eq!(store.list_areas().unwrap().len(), 3);
    }

    #[test]
    fn test_missing_area_is_none() {
        let (_dir, store) = temp_store();
        assert!(store.area("999999").unwrap().is_none());
    }
}
