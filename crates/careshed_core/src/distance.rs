use geo::{Distance, Haversine};
use thiserror::Error;

const METERS_PER_MILE: f64 = 1_609.344;

#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("invalid coordinate for {id}: ({lat}, {lon})")]
    InvalidCoordinate { id: String, lat: f64, lon: f64 },
}

/// Something with an id and a position. Implemented by locations and
/// facilities so the distance matrix can be built over either.
pub trait Positioned {
    fn id(&self) -> &str;
    fn point(&self) -> geo::Point;
}

impl<T: Positioned> Positioned for &T {
    fn id(&self) -> &str {
        (*self).id()
    }

    fn point(&self) -> geo::Point {
        (*self).point()
    }
}

/// Dense great-circle distance matrix in miles, stored row-major:
/// `index = row * num_cols + col`.
#[derive(Debug)]
pub struct DistanceMatrix {
    row_ids: Vec<String>,
    col_ids: Vec<String>,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Builds a matrix from precomputed row-major values.
    pub fn from_values(row_ids: Vec<String>, col_ids: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), row_ids.len() * col_ids.len());
        Self {
            row_ids,
            col_ids,
            values,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.row_ids.len()
    }

    pub fn num_cols(&self) -> usize {
        self.col_ids.len()
    }

    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    pub fn col_ids(&self) -> &[String] {
        &self.col_ids
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.col_ids.len() + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let num_cols = self.col_ids.len();
        &self.values[row * num_cols..(row + 1) * num_cols]
    }
}

fn check_coordinates(item: &impl Positioned) -> Result<geo::Point, DistanceError> {
    let point = item.point();
    let (lat, lon) = (point.y(), point.x());
    if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
        return Err(DistanceError::InvalidCoordinate {
            id: item.id().to_string(),
            lat,
            lon,
        });
    }
    Ok(point)
}

/// Computes straight-line distances between every row/column pair.
///
/// Fails with [`DistanceError::InvalidCoordinate`] on non-finite or
/// out-of-range coordinates rather than propagating NaN, which would
/// otherwise surface much later as an empty candidate set.
pub fn distance_matrix<R, C>(rows: &[R], cols: &[C]) -> Result<DistanceMatrix, DistanceError>
where
    R: Positioned,
    C: Positioned,
{
    let row_points = rows
        .iter()
        .map(|row| check_coordinates(row))
        .collect::<Result<Vec<_>, _>>()?;
    let col_points = cols
        .iter()
        .map(|col| check_coordinates(col))
        .collect::<Result<Vec<_>, _>>()?;

    let mut values = Vec::with_capacity(rows.len() * cols.len());
    for from in &row_points {
        for to in &col_points {
            values.push(Haversine.distance(*from, *to) / METERS_PER_MILE);
        }
    }

    Ok(DistanceMatrix {
        row_ids: rows.iter().map(|r| r.id().to_string()).collect(),
        col_ids: cols.iter().map(|c| c.id().to_string()).collect(),
        values,
    })
}
