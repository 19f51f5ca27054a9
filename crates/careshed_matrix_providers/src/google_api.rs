use serde::Deserialize;
use tracing::debug;

use crate::route_matrix_provider::{
    DestinationResult, MAX_DESTINATIONS, ProviderError, RouteMatrixProvider, TravelMode,
};

pub const GOOGLE_DISTANCE_MATRIX_API_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";

const ELEMENT_STATUS_OK: &str = "OK";

#[derive(Deserialize)]
struct DurationValue {
    /// Seconds
    value: f64,
}

#[derive(Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<DurationValue>,
    duration_in_traffic: Option<DurationValue>,
}

#[derive(Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    error_message: Option<String>,
    rows: Vec<MatrixRow>,
}

pub struct GoogleMatrixClientParams {
    pub api_key: String,
}

pub struct GoogleMatrixClient {
    params: GoogleMatrixClientParams,
    client: reqwest::Client,
}

fn format_point(point: &geo_types::Point) -> String {
    // The API wants "lat,lng"
    format!("{},{}", point.y(), point.x())
}

/// Maps one response onto destination-aligned results. Any element status
/// other than `OK` (no route, not found, ...) is a per-destination failure.
fn decode_response(
    response: DistanceMatrixResponse,
    num_destinations: usize,
) -> Result<Vec<DestinationResult>, ProviderError> {
    if response.status != ELEMENT_STATUS_OK {
        let message = response.error_message.unwrap_or(response.status);
        return Err(ProviderError::CallFailed(message));
    }

    let mut results = Vec::with_capacity(num_destinations);
    for row in response.rows {
        for element in row.elements {
            let duration = element.duration_in_traffic.or(element.duration);
            match duration {
                Some(duration) if element.status == ELEMENT_STATUS_OK => {
                    results.push(DestinationResult::Ok {
                        minutes: duration.value / 60.0,
                    });
                }
                _ => results.push(DestinationResult::Failed),
            }
        }
    }

    if results.len() != num_destinations {
        return Err(ProviderError::CallFailed(format!(
            "expected {} elements, got {}",
            num_destinations,
            results.len()
        )));
    }

    Ok(results)
}

impl GoogleMatrixClient {
    pub fn new(params: GoogleMatrixClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }
}

impl RouteMatrixProvider for GoogleMatrixClient {
    async fn route_matrix(
        &self,
        origin: geo_types::Point,
        destinations: &[geo_types::Point],
        mode: TravelMode,
        departure: Option<jiff::Timestamp>,
    ) -> Result<Vec<DestinationResult>, ProviderError> {
        if destinations.len() > MAX_DESTINATIONS {
            return Err(ProviderError::TooManyDestinations {
                count: destinations.len(),
            });
        }

        let destinations_param = destinations
            .iter()
            .map(format_point)
            .collect::<Vec<_>>()
            .join("|");

        let mut query = vec![
            ("origins", format_point(&origin)),
            ("destinations", destinations_param),
            ("mode", mode.to_string()),
            ("key", self.params.api_key.clone()),
        ];
        if let Some(departure) = departure {
            query.push(("departure_time", departure.as_second().to_string()));
        }

        debug!(
            "GoogleMatrixApi: requesting {} destinations",
            destinations.len()
        );

        let response = self
            .client
            .get(GOOGLE_DISTANCE_MATRIX_API_URL)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, message });
        }

        let body: DistanceMatrixResponse = response.json().await?;

        decode_response(body, destinations.len())
    }
}
