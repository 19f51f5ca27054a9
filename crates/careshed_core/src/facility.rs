use std::{fmt::Display, path::Path, str::FromStr};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::distance::Positioned;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("unknown facility category: {0}")]
    UnknownCategory(String),

    #[error("duplicate facility id: {0}")]
    DuplicateId(String),
}

/// Certification level of a facility. Pruning and querying happen per
/// category so one never crowds the other out of a candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacilityCategory {
    Primary,
    Comprehensive,
}

impl FacilityCategory {
    pub const ALL: [FacilityCategory; 2] =
        [FacilityCategory::Primary, FacilityCategory::Comprehensive];
}

impl Display for FacilityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FacilityCategory::Primary => "Primary",
                FacilityCategory::Comprehensive => "Comprehensive",
            }
        )
    }
}

impl FromStr for FacilityCategory {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Primary" => Ok(FacilityCategory::Primary),
            "Comprehensive" => Ok(FacilityCategory::Comprehensive),
            other => Err(RegistryError::UnknownCategory(other.to_string())),
        }
    }
}

/// A registry entry (hospital) with a category and coordinates.
#[derive(Debug, Clone)]
pub struct Facility {
    id: String,
    point: geo::Point,
    category: FacilityCategory,
}

impl Facility {
    pub fn from_lat_lon(
        id: impl Into<String>,
        lat: f64,
        lon: f64,
        category: FacilityCategory,
    ) -> Self {
        Self {
            id: id.into(),
            point: geo::Point::new(lon, lat),
            category,
        }
    }

    pub fn category(&self) -> FacilityCategory {
        self.category
    }
}

impl Positioned for Facility {
    fn id(&self) -> &str {
        &self.id
    }

    fn point(&self) -> geo::Point {
        self.point
    }
}

#[derive(Deserialize)]
struct FacilityRecord {
    #[serde(rename = "CenterID", alias = "HOSP_ID")]
    center_id: String,

    #[serde(rename = "CenterType")]
    center_type: String,

    #[serde(rename = "Latitude")]
    latitude: Option<f64>,

    #[serde(rename = "Longitude")]
    longitude: Option<f64>,
}

/// Reads a facility registry: pipe-delimited with `CenterID` (or `HOSP_ID`),
/// `CenterType`, `Latitude`, `Longitude` columns; other metadata columns are
/// ignored. Rows without coordinates (failed geocoding upstream) are skipped
/// with a warning.
pub fn load_facilities(path: impl AsRef<Path>) -> Result<Vec<Facility>, RegistryError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .from_path(path.as_ref())?;

    let mut facilities: Vec<Facility> = Vec::new();
    for record in reader.deserialize() {
        let record: FacilityRecord = record?;
        let (Some(lat), Some(lon)) = (record.latitude, record.longitude) else {
            warn!("skipping facility {} with no coordinates", record.center_id);
            continue;
        };
        if facilities.iter().any(|f| f.id() == record.center_id) {
            return Err(RegistryError::DuplicateId(record.center_id));
        }
        facilities.push(Facility::from_lat_lon(
            record.center_id,
            lat,
            lon,
            record.center_type.parse()?,
        ));
    }

    Ok(facilities)
}
