use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::distance::Positioned;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("duplicate LOC_ID: {0}")]
    DuplicateId(String),
}

/// A query point travel times are wanted for.
#[derive(Debug, Clone)]
pub struct Location {
    id: String,
    point: geo::Point,
}

impl Location {
    pub fn from_lat_lon(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            point: geo::Point::new(lon, lat),
        }
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }
}

impl Positioned for Location {
    fn id(&self) -> &str {
        &self.id
    }

    fn point(&self) -> geo::Point {
        self.point
    }
}

#[derive(Deserialize)]
struct LocationRecord {
    #[serde(rename = "LOC_ID")]
    loc_id: String,

    #[serde(rename = "Latitude")]
    latitude: f64,

    #[serde(rename = "Longitude")]
    longitude: f64,
}

/// Reads a point file: CSV with `LOC_ID`, `Latitude`, `Longitude` columns.
pub fn load_locations(path: impl AsRef<Path>) -> Result<Vec<Location>, LocationError> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;

    let mut locations: Vec<Location> = Vec::new();
    for record in reader.deserialize() {
        let record: LocationRecord = record?;
        if locations.iter().any(|l| l.id() == record.loc_id) {
            return Err(LocationError::DuplicateId(record.loc_id));
        }
        locations.push(Location::from_lat_lon(
            record.loc_id,
            record.latitude,
            record.longitude,
        ));
    }

    Ok(locations)
}
