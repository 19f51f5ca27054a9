use std::path::PathBuf;

use clap::Args;
use tracing::info;

use careshed_core::store::{CsvTravelTimeStore, TravelTimeStore};

#[derive(Args)]
pub struct MarkStaleArgs {
    /// Persisted travel-time matrix to edit
    times_file: PathBuf,

    /// LOC_IDs to flag
    #[arg(required = true)]
    loc_ids: Vec<String>,

    /// Clear the flag instead of setting it
    #[arg(long)]
    clear: bool,
}

pub fn run(args: MarkStaleArgs) -> anyhow::Result<()> {
    let store = CsvTravelTimeStore::new(&args.times_file);
    let mut matrix = store
        .load()?
        .ok_or_else(|| anyhow::anyhow!("no times file at {}", args.times_file.display()))?;

    matrix.set_needs_update(&args.loc_ids, !args.clear)?;
    store.checkpoint(&matrix)?;

    info!(
        "set Need_Update to {} for {}",
        !args.clear,
        args.loc_ids.join(", ")
    );
    Ok(())
}
