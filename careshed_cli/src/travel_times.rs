use std::path::PathBuf;

use clap::Args;
use indicatif::ProgressBar;
use tracing::info;

use careshed_core::{
    facility::load_facilities,
    location::load_locations,
    orchestrator::{Orchestrator, OrchestratorParams},
    store::CsvTravelTimeStore,
};
use careshed_matrix_providers::{
    as_the_crow_flies::AsTheCrowFlies,
    google_api::{GoogleMatrixClient, GoogleMatrixClientParams},
    route_matrix_provider::{RouteMatrixProvider, TravelMode},
};

use crate::parsers;

const API_KEY_ENV_VAR: &str = "GOOGLE_MAPS_API_KEY";

#[derive(Args)]
pub struct TravelTimesArgs {
    /// CSV of points with LOC_ID, Latitude, Longitude columns
    point_file: PathBuf,

    /// Pipe-delimited facility registry
    #[arg(short = 'f', long)]
    facility_file: PathBuf,

    /// Persisted travel-time matrix, created on first use
    #[arg(short = 't', long)]
    times_file: PathBuf,

    /// Allow processing more than 10 points in one run
    #[arg(long)]
    allow_large: bool,

    /// Travel mode passed to the routing service
    #[arg(long, default_value_t = TravelMode::Driving, value_parser = parsers::parse_mode)]
    mode: TravelMode,

    /// RFC 3339 departure time used as a traffic hint (e.g. a future peak hour)
    #[arg(long, value_parser = parsers::parse_timestamp)]
    depart: Option<jiff::Timestamp>,

    /// Skip the routing API and estimate times at a constant speed
    #[arg(long)]
    offline: bool,

    /// Straight-line speed for --offline estimates
    #[arg(long, default_value_t = 45.0)]
    speed_mph: f64,
}

async fn drive<P: RouteMatrixProvider>(provider: P, args: &TravelTimesArgs) -> anyhow::Result<()> {
    let locations = load_locations(&args.point_file)?;
    let facilities = load_facilities(&args.facility_file)?;
    let store = CsvTravelTimeStore::new(&args.times_file);

    let params = OrchestratorParams {
        mode: args.mode,
        departure: args.depart,
        allow_large: args.allow_large,
        ..Default::default()
    };

    let mut orchestrator = Orchestrator::new(provider, store, facilities, &locations, params)?;
    orchestrator.check_volume()?;

    let work_set = orchestrator.work_set();
    if work_set.is_empty() {
        info!("travel times are already up to date");
        return Ok(());
    }

    let progress = ProgressBar::new(work_set.len() as u64);
    for loc_id in &work_set {
        progress.set_message(loc_id.clone());
        orchestrator.process_location(loc_id).await?;
        progress.inc(1);
    }
    progress.finish();

    info!(
        "processed {} locations into {}",
        work_set.len(),
        args.times_file.display()
    );
    Ok(())
}

pub async fn run(args: TravelTimesArgs) -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    if args.offline {
        drive(
            AsTheCrowFlies {
                speed_mph: args.speed_mph,
            },
            &args,
        )
        .await
    } else {
        let api_key = std::env::var(API_KEY_ENV_VAR)
            .map_err(|_| anyhow::anyhow!("{API_KEY_ENV_VAR} is not set (or use --offline)"))?;
        drive(
            GoogleMatrixClient::new(GoogleMatrixClientParams { api_key }),
            &args,
        )
        .await
    }
}
