use fxhash::FxHashMap;
use thiserror::Error;
use tracing::warn;

use crate::distance::Positioned;
use crate::id_map::IdMap;
use crate::location::Location;

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("unknown LOC_ID: {0}")]
    UnknownRow(String),

    #[error("unknown facility column: {0}")]
    UnknownColumn(String),

    #[error("duplicate LOC_ID: {0}")]
    DuplicateRow(String),

    #[error("duplicate facility column: {0}")]
    DuplicateColumn(String),
}

/// One persisted row: the location's coordinates, its recompute flag, and one
/// cell per facility column (`None` = missing, i.e. never queried or failed).
#[derive(Debug, Clone)]
pub struct MatrixRow {
    pub lat: f64,
    pub lon: f64,
    pub needs_update: bool,
    cells: Vec<Option<f64>>,
}

impl MatrixRow {
    pub fn new(lat: f64, lon: f64, needs_update: bool, cells: Vec<Option<f64>>) -> Self {
        Self {
            lat,
            lon,
            needs_update,
            cells,
        }
    }

    pub fn cells(&self) -> &[Option<f64>] {
        &self.cells
    }

    fn is_unqueried(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

/// Location-by-facility travel times in minutes. Row and column insertion
/// order is preserved so checkpoints rewrite a stable file. Rows are never
/// deleted; columns are only ever added (see [`TravelTimeMatrix::reconcile`]).
#[derive(Debug, Clone, Default)]
pub struct TravelTimeMatrix {
    facility_ids: Vec<String>,
    col_index: FxHashMap<String, usize>,
    row_ids: Vec<String>,
    rows: FxHashMap<String, MatrixRow>,
}

impl TravelTimeMatrix {
    pub fn from_parts(
        facility_ids: Vec<String>,
        rows: Vec<(String, MatrixRow)>,
    ) -> Result<Self, MatrixError> {
        let mut matrix = TravelTimeMatrix::default();
        for id in facility_ids {
            matrix.push_column(id)?;
        }
        for (id, row) in rows {
            matrix.push_row(id, row)?;
        }
        Ok(matrix)
    }

    fn push_column(&mut self, facility_id: String) -> Result<(), MatrixError> {
        if self.col_index.contains_key(&facility_id) {
            return Err(MatrixError::DuplicateColumn(facility_id));
        }
        self.col_index
            .insert(facility_id.clone(), self.facility_ids.len());
        self.facility_ids.push(facility_id);
        for row in self.rows.values_mut() {
            row.cells.push(None);
        }
        Ok(())
    }

    fn push_row(&mut self, loc_id: String, mut row: MatrixRow) -> Result<(), MatrixError> {
        if self.rows.contains_key(&loc_id) {
            return Err(MatrixError::DuplicateRow(loc_id));
        }
        row.cells.resize(self.facility_ids.len(), None);
        self.row_ids.push(loc_id.clone());
        self.rows.insert(loc_id, row);
        Ok(())
    }

    /// Brings the matrix in line with the current inputs: unseen locations
    /// become all-missing rows, facilities new to the registry become
    /// all-missing columns. Columns with no facility left in the registry are
    /// retained (dropping them would discard already-paid-for results) and
    /// reported once.
    pub fn reconcile(&mut self, locations: &[Location], facility_ids: &[String]) {
        for facility_id in facility_ids {
            if !self.col_index.contains_key(facility_id) {
                // cannot collide, we just checked
                let _ = self.push_column(facility_id.clone());
            }
        }

        let stale: Vec<&String> = self
            .facility_ids
            .iter()
            .filter(|id| !facility_ids.contains(id))
            .collect();
        if !stale.is_empty() {
            warn!(
                "retaining {} facility columns no longer in the registry: {:?}",
                stale.len(),
                stale
            );
        }

        for location in locations {
            if !self.rows.contains_key(location.id()) {
                let cells = vec![None; self.facility_ids.len()];
                let row = MatrixRow::new(location.lat(), location.lon(), false, cells);
                let _ = self.push_row(location.id().to_string(), row);
            }
        }
    }

    pub fn facility_ids(&self) -> &[String] {
        &self.facility_ids
    }

    pub fn location_ids(&self) -> &[String] {
        &self.row_ids
    }

    pub fn row(&self, loc_id: &str) -> Option<&MatrixRow> {
        self.rows.get(loc_id)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &MatrixRow)> {
        self.row_ids.iter().map(|id| (id.as_str(), &self.rows[id]))
    }

    pub fn get(&self, loc_id: &str, facility_id: &str) -> Option<f64> {
        let row = self.rows.get(loc_id)?;
        let col = *self.col_index.get(facility_id)?;
        row.cells[col]
    }

    /// Rows needing (re)computation: every facility cell missing, or flagged
    /// by the operator. Rows with any value and a clear flag are settled.
    pub fn work_set(&self) -> Vec<String> {
        self.row_ids
            .iter()
            .filter(|id| {
                let row = &self.rows[*id];
                row.is_unqueried() || row.needs_update
            })
            .cloned()
            .collect()
    }

    /// Writes newly obtained values into one row, overwriting whatever the
    /// touched cells held; cells outside `values` are left alone.
    pub fn merge_row(&mut self, loc_id: &str, values: &[(String, f64)]) -> Result<(), MatrixError> {
        if !self.rows.contains_key(loc_id) {
            return Err(MatrixError::UnknownRow(loc_id.to_string()));
        }
        let mut cols = Vec::with_capacity(values.len());
        for (facility_id, minutes) in values {
            let col = *self
                .col_index
                .get(facility_id)
                .ok_or_else(|| MatrixError::UnknownColumn(facility_id.clone()))?;
            cols.push((col, *minutes));
        }

        let row = self.rows.get_mut(loc_id).unwrap();
        for (col, minutes) in cols {
            row.cells[col] = Some(minutes);
        }
        Ok(())
    }

    pub fn clear_needs_update(&mut self, loc_id: &str) -> Result<(), MatrixError> {
        let row = self
            .rows
            .get_mut(loc_id)
            .ok_or_else(|| MatrixError::UnknownRow(loc_id.to_string()))?;
        row.needs_update = false;
        Ok(())
    }

    /// Operator directive: flag (or unflag) the named rows for recomputation
    /// without touching their stored values.
    pub fn set_needs_update(&mut self, loc_ids: &[String], flag: bool) -> Result<(), MatrixError> {
        // validate everything before mutating anything
        for loc_id in loc_ids {
            if !self.rows.contains_key(loc_id) {
                return Err(MatrixError::UnknownRow(loc_id.clone()));
            }
        }
        for loc_id in loc_ids {
            self.rows.get_mut(loc_id).unwrap().needs_update = flag;
        }
        Ok(())
    }

    /// Renames facility columns through the mapping; ids without an entry
    /// keep their name (identity fallback).
    pub fn remap_columns(&mut self, map: &IdMap) -> Result<(), MatrixError> {
        let renamed: Vec<String> = self
            .facility_ids
            .iter()
            .map(|id| map.lookup(id).to_string())
            .collect();

        let mut col_index = FxHashMap::default();
        for (col, id) in renamed.iter().enumerate() {
            if col_index.insert(id.clone(), col).is_some() {
                return Err(MatrixError::DuplicateColumn(id.clone()));
            }
        }

        self.facility_ids = renamed;
        self.col_index = col_index;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_matrix() -> TravelTimeMatrix {
        let locations = vec![
            Location::from_lat_lon("L1", 41.0, -87.0),
            Location::from_lat_lon("L2", 42.0, -88.0),
        ];
        let facility_ids = vec!["17".to_string(), "23".to_string(), "31".to_string()];
        let mut matrix = TravelTimeMatrix::default();
        matrix.reconcile(&locations, &facility_ids);
        matrix
    }

    #[test]
    fn test_fresh_matrix_is_all_missing() {
        let matrix = fresh_matrix();

        assert_eq!(matrix.location_ids(), &["L1", "L2"]);
        assert_eq!(matrix.facility_ids(), &["17", "23", "31"]);
        for (_, row) in matrix.rows() {
            assert!(row.cells().iter().all(Option::is_none));
            assert!(!row.needs_update);
        }
        assert_eq!(matrix.work_set(), vec!["L1", "L2"]);
    }

    #[test]
    fn test_work_set_skips_settled_rows() {
        let mut matrix = fresh_matrix();
        matrix
            .merge_row("L1", &[("17".to_string(), 12.5)])
            .unwrap();

        // L1 has a value and no flag; only L2 is still pending
        assert_eq!(matrix.work_set(), vec!["L2"]);

        matrix.set_needs_update(&["L1".to_string()], true).unwrap();
        assert_eq!(matrix.work_set(), vec!["L1", "L2"]);

        matrix.clear_needs_update("L1").unwrap();
        assert_eq!(matrix.work_set(), vec!["L2"]);
    }

    #[test]
    fn test_merge_touches_only_named_columns() {
        let mut matrix = fresh_matrix();
        matrix
            .merge_row("L1", &[("17".to_string(), 12.5), ("23".to_string(), 48.0)])
            .unwrap();

        // Second merge (another category's results) must not disturb 17/23
        matrix
            .merge_row("L1", &[("31".to_string(), 33.0)])
            .unwrap();

        assert_eq!(matrix.get("L1", "17"), Some(12.5));
        assert_eq!(matrix.get("L1", "23"), Some(48.0));
        assert_eq!(matrix.get("L1", "31"), Some(33.0));
        assert_eq!(matrix.get("L2", "17"), None);
    }

    #[test]
    fn test_merge_overwrites_unconditionally() {
        let mut matrix = fresh_matrix();
        matrix.merge_row("L1", &[("17".to_string(), 12.5)]).unwrap();
        matrix.merge_row("L1", &[("17".to_string(), 9.0)]).unwrap();

        assert_eq!(matrix.get("L1", "17"), Some(9.0));
    }

    #[test]
    fn test_merge_unknown_row_and_column() {
        let mut matrix = fresh_matrix();

        let err = matrix.merge_row("nope", &[]).unwrap_err();
        assert!(matches!(err, MatrixError::UnknownRow(_)));

        let err = matrix
            .merge_row("L1", &[("99".to_string(), 1.0)])
            .unwrap_err();
        assert!(matches!(err, MatrixError::UnknownColumn(id) if id == "99"));
    }

    #[test]
    fn test_set_needs_update_validates_before_mutating() {
        let mut matrix = fresh_matrix();

        let err = matrix
            .set_needs_update(&["L1".to_string(), "nope".to_string()], true)
            .unwrap_err();
        assert!(matches!(err, MatrixError::UnknownRow(id) if id == "nope"));

        // The valid id must not have been flagged
        assert!(!matrix.row("L1").unwrap().needs_update);
    }

    #[test]
    fn test_reconcile_appends_new_columns_and_keeps_stale_ones() {
        let mut matrix = fresh_matrix();
        matrix.merge_row("L1", &[("17".to_string(), 12.5)]).unwrap();

        // Facility 23 disappeared from the registry, 44 is new
        let registry = vec!["17".to_string(), "31".to_string(), "44".to_string()];
        matrix.reconcile(&[], &registry);

        assert_eq!(matrix.facility_ids(), &["17", "23", "31", "44"]);
        assert_eq!(matrix.get("L1", "17"), Some(12.5));
        assert_eq!(matrix.get("L1", "44"), None);
    }

    #[test]
    fn test_remap_columns() {
        let mut matrix = fresh_matrix();
        matrix.merge_row("L1", &[("17".to_string(), 12.5)]).unwrap();

        let map: IdMap = [("17".to_string(), "H001".to_string())].into_iter().collect();
        matrix.remap_columns(&map).unwrap();

        assert_eq!(matrix.facility_ids(), &["H001", "23", "31"]);
        assert_eq!(matrix.get("L1", "H001"), Some(12.5));
        assert_eq!(matrix.get("L1", "17"), None);
    }

    #[test]
    fn test_remap_rejects_collisions() {
        let mut matrix = fresh_matrix();

        let map: IdMap = [("17".to_string(), "23".to_string())].into_iter().collect();
        let err = matrix.remap_columns(&map).unwrap_err();

        assert!(matches!(err, MatrixError::DuplicateColumn(id) if id == "23"));
        // Failed remap leaves the columns untouched
        assert_eq!(matrix.facility_ids(), &["17", "23", "31"]);
    }
}
