#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the displacement snapshot tool.

use std::time::Instant;

use clap::{Parser, Subcommand};
use displacement_globe_blob::BlobClient;
use displacement_globe_cache::SnapshotStore;
use displacement_globe_fetch::{
    default_conflict_countries, generate_conflict_snapshots, generate_coordinates,
    generate_flow_snapshots, generate_idp_snapshot,
};

#[derive(Parser)]
#[command(name = "displacement_globe_fetch", about = "Displacement snapshot tool")]
struct Cli {
    /// Snapshot output directory
    #[arg(long, global = true, default_value = "snapshots")]
    out: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch UNHCR and UNRWA population history and write flow snapshots
    Flows {
        /// First year to fetch
        #[arg(long, default_value = "2015")]
        from: i32,
        /// Last year to fetch (default: current year)
        #[arg(long)]
        to: Option<i32>,
    },
    /// Fetch ACLED conflict events and write per-country snapshots.
    /// Requires `ACLED_USERNAME` and `ACLED_PASSWORD`.
    Conflict {
        /// Comma-separated ISO3 codes (default: all known countries)
        #[arg(long)]
        countries: Option<String>,
        /// First year to fetch
        #[arg(long, default_value = "2018")]
        from: i32,
        /// Last year to fetch (default: current year)
        #[arg(long)]
        to: Option<i32>,
    },
    /// Fetch IOM DTM data for all countries and write the IDP snapshot
    Idp,
    /// Write the country-coordinate table
    Coords,
    /// Upload the snapshot directory to object storage and write the
    /// URL manifest. Requires the `BLOB_*` environment variables.
    Upload,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let store = SnapshotStore::new(&cli.out);
    let started = Instant::now();

    match cli.command {
        Commands::Flows { from, to } => {
            let to = to.unwrap_or_else(current_year);
            generate_flow_snapshots(&store, from, to).await?;
        }
        Commands::Conflict {
            countries,
            from,
            to,
        } => {
            let to = to.unwrap_or_else(current_year);
            let countries = countries.map_or_else(default_conflict_countries, |list| {
                list.split(',')
                    .map(|c| c.trim().to_uppercase())
                    .filter(|c| !c.is_empty())
                    .collect()
            });
            generate_conflict_snapshots(&store, &countries, from, to).await?;
        }
        Commands::Idp => {
            generate_idp_snapshot(&store).await?;
        }
        Commands::Coords => {
            generate_coordinates(&store)?;
        }
        Commands::Upload => {
            let blob = BlobClient::from_env()?;
            let stats = blob.push_snapshots(store.dir()).await?;
            log::info!("upload finished: {stats}");
        }
    }

    log::info!("done in {:.1?}", started.elapsed());
    Ok(())
}

fn current_year() -> i32 {
    use chrono::Datelike;
    chrono::Utc::now().year()
}
