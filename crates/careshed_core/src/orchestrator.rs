use careshed_matrix_providers::route_matrix_provider::{RouteMatrixProvider, TravelMode};
use thiserror::Error;
use tracing::{info, warn};

use crate::distance::{DistanceError, Positioned, distance_matrix};
use crate::facility::{Facility, FacilityCategory};
use crate::location::Location;
use crate::matrix::{MatrixError, TravelTimeMatrix};
use crate::pruning;
use crate::store::{StoreError, TravelTimeStore};

/// Runs larger than this need the explicit override; each location can issue
/// one routing call per category, each worth up to 25 destinations.
pub const DEFAULT_MAX_LOCATIONS: usize = 10;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no facilities found in the registry")]
    NoFacilitiesFound,

    #[error(
        "{locations} locations to process exceeds the limit of {limit} \
         (up to 50 routed destinations each); rerun with the large-run override"
    )]
    VolumeLimitExceeded { locations: usize, limit: usize },

    #[error(transparent)]
    Distance(#[from] DistanceError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct OrchestratorParams {
    pub mode: TravelMode,
    /// Forwarded to the provider as a traffic hint (e.g. a future peak hour).
    pub departure: Option<jiff::Timestamp>,
    pub max_locations: usize,
    pub allow_large: bool,
}

impl Default for OrchestratorParams {
    fn default() -> Self {
        Self {
            mode: TravelMode::Driving,
            departure: None,
            max_locations: DEFAULT_MAX_LOCATIONS,
            allow_large: false,
        }
    }
}

/// Drives the whole computation: for every work-set location, prune the
/// registry per category, route the survivors, merge the minutes into the
/// matrix, and checkpoint before moving on. Strictly sequential — one
/// location, one call at a time — so the per-row checkpoint is a true
/// resume point. Running two processes against the same store is not
/// supported; the store has no locking.
pub struct Orchestrator<P, S> {
    provider: P,
    store: S,
    params: OrchestratorParams,
    facilities: Vec<Facility>,
    matrix: TravelTimeMatrix,
}

impl<P, S> Orchestrator<P, S>
where
    P: RouteMatrixProvider,
    S: TravelTimeStore,
{
    /// Loads (or starts) the persisted matrix and reconciles it against the
    /// current inputs. Nothing is written until a location is processed.
    pub fn new(
        provider: P,
        store: S,
        facilities: Vec<Facility>,
        locations: &[Location],
        params: OrchestratorParams,
    ) -> Result<Self, OrchestratorError> {
        if facilities.is_empty() {
            return Err(OrchestratorError::NoFacilitiesFound);
        }

        let mut matrix = store.load()?.unwrap_or_default();
        let facility_ids: Vec<String> = facilities.iter().map(|f| f.id().to_string()).collect();
        matrix.reconcile(locations, &facility_ids);

        Ok(Self {
            provider,
            store,
            params,
            facilities,
            matrix,
        })
    }

    pub fn matrix(&self) -> &TravelTimeMatrix {
        &self.matrix
    }

    pub fn work_set(&self) -> Vec<String> {
        self.matrix.work_set()
    }

    /// Cost-control circuit breaker, checked before any query is issued.
    pub fn check_volume(&self) -> Result<(), OrchestratorError> {
        let locations = self.matrix.work_set().len();
        if !self.params.allow_large && locations > self.params.max_locations {
            return Err(OrchestratorError::VolumeLimitExceeded {
                locations,
                limit: self.params.max_locations,
            });
        }
        Ok(())
    }

    /// Processes a single location end to end and checkpoints the store.
    ///
    /// A whole-call routing failure is tolerated: the category's cells stay
    /// missing and the run continues. Per-destination failures just leave
    /// their one cell missing. The recompute flag is cleared once any call
    /// for the row succeeds, so a fully failed row stays in the work set.
    pub async fn process_location(&mut self, loc_id: &str) -> Result<(), OrchestratorError> {
        let row = self
            .matrix
            .row(loc_id)
            .ok_or_else(|| MatrixError::UnknownRow(loc_id.to_string()))?;
        let origin = Location::from_lat_lon(loc_id, row.lat, row.lon);

        let mut merged: Vec<(String, f64)> = Vec::new();
        let mut any_call_succeeded = false;

        for category in FacilityCategory::ALL {
            let subset: Vec<&Facility> = self
                .facilities
                .iter()
                .filter(|f| f.category() == category)
                .collect();
            if subset.is_empty() {
                continue;
            }

            let distances = distance_matrix(std::slice::from_ref(&origin), &subset)?;
            let selected = pruning::candidates(&distances, 0);
            if selected.is_empty() {
                continue;
            }

            let destinations: Vec<geo::Point> =
                selected.iter().map(|c| subset[c.col].point()).collect();

            let result = self
                .provider
                .route_matrix(
                    origin.point(),
                    &destinations,
                    self.params.mode,
                    self.params.departure,
                )
                .await;

            match result {
                Ok(results) => {
                    any_call_succeeded = true;
                    for (candidate, result) in selected.iter().zip(results) {
                        if let Some(minutes) = result.minutes() {
                            merged.push((subset[candidate.col].id().to_string(), minutes));
                        }
                    }
                }
                Err(error) => {
                    warn!("routing call failed for {loc_id} ({category}): {error}");
                }
            }
        }

        self.matrix.merge_row(loc_id, &merged)?;
        if any_call_succeeded {
            self.matrix.clear_needs_update(loc_id)?;
        }
        self.store.checkpoint(&self.matrix)?;
        Ok(())
    }

    /// Processes the whole work set. Returns the number of locations
    /// processed; zero means the matrix was already up to date.
    pub async fn run(&mut self) -> Result<usize, OrchestratorError> {
        self.check_volume()?;

        let work_set = self.work_set();
        for loc_id in &work_set {
            info!("processing {loc_id}");
            self.process_location(loc_id).await?;
        }
        Ok(work_set.len())
    }
}
