use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::matrix::{MatrixError, MatrixRow, TravelTimeMatrix};

const FIXED_COLUMNS: [&str; 4] = ["LOC_ID", "Latitude", "Longitude", "Need_Update"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error("times file is missing the {0} column")]
    MissingColumn(String),

    #[error("invalid value in row {loc_id}, column {column}: {value}")]
    InvalidCell {
        loc_id: String,
        column: String,
        value: String,
    },
}

/// Durable home of a [`TravelTimeMatrix`]. `checkpoint` is the resumability
/// contract: called after every processed location, it must leave a state
/// that `load` can read back even if the process dies right afterwards.
pub trait TravelTimeStore {
    fn load(&self) -> Result<Option<TravelTimeMatrix>, StoreError>;
    fn checkpoint(&self, matrix: &TravelTimeMatrix) -> Result<(), StoreError>;
}

/// CSV-file store: `LOC_ID,Latitude,Longitude,Need_Update` followed by one
/// column per facility id, missing cells empty. Checkpoints write a sibling
/// temp file and rename it over the target so the file on disk is always a
/// complete matrix.
pub struct CsvTravelTimeStore {
    path: PathBuf,
}

impl CsvTravelTimeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn parse_flag(loc_id: &str, value: &str) -> Result<bool, StoreError> {
    // Accepts pandas-style True/False from legacy files
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        _ => Err(StoreError::InvalidCell {
            loc_id: loc_id.to_string(),
            column: "Need_Update".to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_float(loc_id: &str, column: &str, value: &str) -> Result<f64, StoreError> {
    value.parse().map_err(|_| StoreError::InvalidCell {
        loc_id: loc_id.to_string(),
        column: column.to_string(),
        value: value.to_string(),
    })
}

impl TravelTimeStore for CsvTravelTimeStore {
    fn load(&self) -> Result<Option<TravelTimeMatrix>, StoreError> {
        if !self.path.is_file() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();

        for (i, expected) in FIXED_COLUMNS.iter().enumerate() {
            if headers.get(i) != Some(*expected) {
                return Err(StoreError::MissingColumn(expected.to_string()));
            }
        }
        let facility_ids: Vec<String> = headers
            .iter()
            .skip(FIXED_COLUMNS.len())
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let loc_id = record.get(0).unwrap_or_default().to_string();
            let lat = parse_float(&loc_id, "Latitude", record.get(1).unwrap_or_default())?;
            let lon = parse_float(&loc_id, "Longitude", record.get(2).unwrap_or_default())?;
            let needs_update = parse_flag(&loc_id, record.get(3).unwrap_or_default())?;

            let mut cells = Vec::with_capacity(facility_ids.len());
            for (col, facility_id) in facility_ids.iter().enumerate() {
                let value = record.get(FIXED_COLUMNS.len() + col).unwrap_or_default();
                if value.is_empty() || value == "NaN" {
                    cells.push(None);
                } else {
                    cells.push(Some(parse_float(&loc_id, facility_id, value)?));
                }
            }

            rows.push((loc_id, MatrixRow::new(lat, lon, needs_update, cells)));
        }

        let matrix = TravelTimeMatrix::from_parts(facility_ids, rows)?;
        debug!(
            "loaded travel-time matrix: {} rows, {} facility columns",
            matrix.location_ids().len(),
            matrix.facility_ids().len()
        );
        Ok(Some(matrix))
    }

    fn checkpoint(&self, matrix: &TravelTimeMatrix) -> Result<(), StoreError> {
        let tmp_path = self.tmp_path();
        let mut writer = csv::Writer::from_path(&tmp_path)?;

        let mut header: Vec<&str> = FIXED_COLUMNS.to_vec();
        header.extend(matrix.facility_ids().iter().map(String::as_str));
        writer.write_record(&header)?;

        for (loc_id, row) in matrix.rows() {
            let mut record = vec![
                loc_id.to_string(),
                row.lat.to_string(),
                row.lon.to_string(),
                row.needs_update.to_string(),
            ];
            record.extend(
                row.cells()
                    .iter()
                    .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }

        writer.flush()?;
        drop(writer);
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;

    fn store_in(dir: &tempfile::TempDir) -> CsvTravelTimeStore {
        CsvTravelTimeStore::new(dir.path().join("times.csv"))
    }

    fn sample_matrix() -> TravelTimeMatrix {
        let locations = vec![
            Location::from_lat_lon("L1", 41.0, -87.0),
            Location::from_lat_lon("L2", 42.0, -88.0),
        ];
        let facility_ids = vec!["17".to_string(), "23".to_string()];
        let mut matrix = TravelTimeMatrix::default();
        matrix.reconcile(&locations, &facility_ids);
        matrix
    }

    #[test]
    fn test_load_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut matrix = sample_matrix();
        matrix.merge_row("L1", &[("17".to_string(), 12.5)]).unwrap();
        matrix.set_needs_update(&["L2".to_string()], true).unwrap();
        store.checkpoint(&matrix).unwrap();

        // No stray temp file after the rename
        assert!(store.path().exists());
        assert!(!store.tmp_path().exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.facility_ids(), &["17", "23"]);
        assert_eq!(loaded.location_ids(), &["L1", "L2"]);
        assert_eq!(loaded.get("L1", "17"), Some(12.5));
        assert_eq!(loaded.get("L1", "23"), None);
        assert!(!loaded.row("L1").unwrap().needs_update);
        assert!(loaded.row("L2").unwrap().needs_update);
        assert_eq!(loaded.row("L1").unwrap().lat, 41.0);
        assert_eq!(loaded.row("L1").unwrap().lon, -87.0);
    }

    #[test]
    fn test_checkpoint_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut matrix = sample_matrix();
        store.checkpoint(&matrix).unwrap();
        matrix.merge_row("L2", &[("23".to_string(), 7.25)]).unwrap();
        store.checkpoint(&matrix).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.get("L2", "23"), Some(7.25));
    }

    #[test]
    fn test_load_legacy_pandas_flags_and_nans() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("times.csv");
        std::fs::write(
            &path,
            "LOC_ID,Latitude,Longitude,Need_Update,17,23\n\
             L1,41.0,-87.0,True,12.5,NaN\n\
             L2,42.0,-88.0,False,,\n",
        )
        .unwrap();

        let store = CsvTravelTimeStore::new(path);
        let loaded = store.load().unwrap().unwrap();

        assert!(loaded.row("L1").unwrap().needs_update);
        assert_eq!(loaded.get("L1", "17"), Some(12.5));
        assert_eq!(loaded.get("L1", "23"), None);
        assert_eq!(loaded.work_set(), vec!["L1", "L2"]);
    }

    #[test]
    fn test_load_rejects_wrong_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("times.csv");
        std::fs::write(&path, "ID,Latitude,Longitude,Need_Update\n").unwrap();

        let store = CsvTravelTimeStore::new(path);
        let err = store.load().unwrap_err();

        assert!(matches!(err, StoreError::MissingColumn(c) if c == "LOC_ID"));
    }

    #[test]
    fn test_load_rejects_garbage_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("times.csv");
        std::fs::write(
            &path,
            "LOC_ID,Latitude,Longitude,Need_Update,17\nL1,41.0,-87.0,false,fast\n",
        )
        .unwrap();

        let store = CsvTravelTimeStore::new(path);
        let err = store.load().unwrap_err();

        assert!(matches!(err, StoreError::InvalidCell { column, .. } if column == "17"));
    }
}
