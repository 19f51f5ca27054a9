use geo::{Distance, Haversine};

use crate::route_matrix_provider::{
    DestinationResult, MAX_DESTINATIONS, ProviderError, RouteMatrixProvider, TravelMode,
};

const METERS_PER_MILE: f64 = 1_609.344;

/// Offline provider: great-circle distance at a constant speed. Useful when
/// no API key is available and for deterministic tests.
pub struct AsTheCrowFlies {
    pub speed_mph: f64,
}

impl RouteMatrixProvider for AsTheCrowFlies {
    async fn route_matrix(
        &self,
        origin: geo_types::Point,
        destinations: &[geo_types::Point],
        _mode: TravelMode,
        _departure: Option<jiff::Timestamp>,
    ) -> Result<Vec<DestinationResult>, ProviderError> {
        if destinations.len() > MAX_DESTINATIONS {
            return Err(ProviderError::TooManyDestinations {
                count: destinations.len(),
            });
        }

        Ok(destinations
            .iter()
            .map(|destination| {
                let miles = Haversine.distance(origin, *destination) / METERS_PER_MILE;
                DestinationResult::Ok {
                    minutes: miles / self.speed_mph * 60.0,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_constant_speed_estimate() {
        let provider = AsTheCrowFlies { speed_mph: 60.0 };
        let origin = geo_types::Point::new(-87.0, 41.0);
        // One degree of latitude is roughly 69.1 miles
        let destinations = vec![geo_types::Point::new(-87.0, 42.0), origin];

        let results = provider
            .route_matrix(origin, &destinations, TravelMode::Driving, None)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        let minutes = results[0].minutes().unwrap();
        assert!((minutes - 69.1).abs() < 0.5, "got {minutes}");
        assert_eq!(results[1].minutes().unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_rejects_oversized_batches() {
        let provider = AsTheCrowFlies { speed_mph: 60.0 };
        let origin = geo_types::Point::new(0.0, 0.0);
        let destinations = vec![origin; MAX_DESTINATIONS + 1];

        let err = provider
            .route_matrix(origin, &destinations, TravelMode::Driving, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProviderError::TooManyDestinations { count: 26 }
        ));
    }
}
