use clap::{Parser, Subcommand};

use crate::{mark_stale::MarkStaleArgs, travel_times::TravelTimesArgs};

mod mark_stale;
mod parsers;
mod travel_times;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute travel times from each point to its nearby facilities
    #[command(visible_alias = "tt")]
    TravelTimes {
        #[command(flatten)]
        args: TravelTimesArgs,
    },
    /// Flag rows of a times file for recomputation on the next run
    MarkStale {
        #[command(flatten)]
        args: MarkStaleArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Commands::TravelTimes { args } => travel_times::run(args).await?,
        Commands::MarkStale { args } => mark_stale::run(args)?,
    }

    Ok(())
}
