use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling on destinations per routing call, imposed by the upstream
/// distance-matrix APIs.
pub const MAX_DESTINATIONS: usize = 25;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TravelMode::Driving => "driving",
                TravelMode::Walking => "walking",
                TravelMode::Bicycling => "bicycling",
                TravelMode::Transit => "transit",
            }
        )
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driving" => Ok(TravelMode::Driving),
            "walking" => Ok(TravelMode::Walking),
            "bicycling" => Ok(TravelMode::Bicycling),
            "transit" => Ok(TravelMode::Transit),
            other => Err(format!("unknown travel mode: {other}")),
        }
    }
}

/// Outcome for a single destination within one routing call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DestinationResult {
    Ok { minutes: f64 },
    Failed,
}

impl DestinationResult {
    pub fn minutes(&self) -> Option<f64> {
        match self {
            DestinationResult::Ok { minutes } => Some(*minutes),
            DestinationResult::Failed => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("routing call failed with status: {0}")]
    CallFailed(String),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("{count} destinations exceeds the per-call limit of {MAX_DESTINATIONS}")]
    TooManyDestinations { count: usize },
}

/// A point-to-points travel-time backend.
///
/// One call routes a single origin against up to [`MAX_DESTINATIONS`]
/// destinations. The returned vector is aligned to the destination order; a
/// destination that cannot be routed comes back as
/// [`DestinationResult::Failed`] without affecting its siblings. Whole-call
/// failures are the error path, and nothing is retried here.
pub trait RouteMatrixProvider {
    fn route_matrix(
        &self,
        origin: geo_types::Point,
        destinations: &[geo_types::Point],
        mode: TravelMode,
        departure: Option<jiff::Timestamp>,
    ) -> impl Future<Output = Result<Vec<DestinationResult>, ProviderError>>;
}
