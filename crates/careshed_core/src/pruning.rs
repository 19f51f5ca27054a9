use careshed_matrix_providers::route_matrix_provider::MAX_DESTINATIONS;

use crate::distance::DistanceMatrix;

/// One facility selected for routing, by its column in the distance matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub col: usize,
    pub miles: f64,
}

/// Adaptive proximity threshold, relative to the nearest facility. Widens
/// geometrically so sparse regions keep more candidates than dense ones, and
/// always admits the closest facility.
pub fn cutoff(min_dist: f64) -> f64 {
    (min_dist * 1.5).max(min_dist + 30.0)
}

/// Selects the facilities in one row of the distance matrix worth routing:
/// everything strictly closer than the cutoff, truncated to the
/// [`MAX_DESTINATIONS`] nearest (ties broken by column order) because the
/// routing call cannot take more destinations than that.
pub fn candidates(distances: &DistanceMatrix, row: usize) -> Vec<Candidate> {
    let row = distances.row(row);
    let Some(min_dist) = row.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let cutoff = cutoff(min_dist);

    let mut selected: Vec<Candidate> = row
        .iter()
        .enumerate()
        .filter(|&(_, &miles)| miles < cutoff)
        .map(|(col, &miles)| Candidate { col, miles })
        .collect();

    if selected.len() > MAX_DESTINATIONS {
        selected.sort_by(|a, b| a.miles.total_cmp(&b.miles).then(a.col.cmp(&b.col)));
        selected.truncate(MAX_DESTINATIONS);
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_with_row(miles: &[f64]) -> DistanceMatrix {
        let col_ids = (0..miles.len()).map(|i| format!("f{i}")).collect();
        DistanceMatrix::from_values(vec!["origin".to_string()], col_ids, miles.to_vec())
    }

    #[test]
    fn test_cutoff_rule() {
        // Close nearest facility: the +30 arm dominates
        assert_eq!(cutoff(10.0), 40.0);
        // Far nearest facility: the *1.5 arm dominates
        assert_eq!(cutoff(100.0), 150.0);
        // Break-even at 60 miles
        assert_eq!(cutoff(60.0), 90.0);
    }

    #[test]
    fn test_selection_is_strictly_below_cutoff() {
        // min = 10, cutoff = 40; 40.0 itself must be excluded
        let matrix = matrix_with_row(&[10.0, 39.9, 40.0, 41.0]);

        let selected = candidates(&matrix, 0);

        let cols: Vec<usize> = selected.iter().map(|c| c.col).collect();
        assert_eq!(cols, vec![0, 1]);
    }

    #[test]
    fn test_closest_facility_is_always_included() {
        let matrix = matrix_with_row(&[500.0, 800.0, 900.0]);

        let selected = candidates(&matrix, 0);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].col, 0);
    }

    #[test]
    fn test_truncation_keeps_the_nearest() {
        // min = 1, cutoff = 31, all 30 columns pass the cutoff
        let miles: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let matrix = matrix_with_row(&miles);

        let selected = candidates(&matrix, 0);

        assert_eq!(selected.len(), MAX_DESTINATIONS);
        let cols: Vec<usize> = selected.iter().map(|c| c.col).collect();
        assert_eq!(cols, (0..MAX_DESTINATIONS).collect::<Vec<_>>());
    }

    #[test]
    fn test_truncation_ties_break_by_column_order() {
        // 26 equidistant columns; the last one loses
        let miles = vec![5.0; 26];
        let matrix = matrix_with_row(&miles);

        let selected = candidates(&matrix, 0);

        assert_eq!(selected.len(), MAX_DESTINATIONS);
        let cols: Vec<usize> = selected.iter().map(|c| c.col).collect();
        assert_eq!(cols, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_row() {
        let matrix = matrix_with_row(&[]);

        assert!(candidates(&matrix, 0).is_empty());
    }
}
