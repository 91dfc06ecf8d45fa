// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use vehicle_locations::LocationStore;
use vehicle_locations::config::VehicleFeedConfig;
use vehicle_locations::feed_poller::{FeedPoller, HttpFeedSource};
use vehicle_locations::transit_index::StaticTransitIndex;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Keeps the live positions of a transit fleet", long_about = None)]
struct Args {
    #[command(flatten)]
    feed: VehicleFeedConfig,

    /// Static GTFS archive (zip or folder) realtime ids are checked against
    #[arg(long, env = "GTFS_PATH")]
    gtfs_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    args.feed.validate()?;

    info!("Loading static schedule from {}", args.gtfs_path);
    let gtfs = gtfs_structures::Gtfs::from_path(&args.gtfs_path)
        .with_context(|| format!("could not read GTFS archive {}", args.gtfs_path))?;

    let transit_index = StaticTransitIndex::from_gtfs(&gtfs, &args.feed.default_agency_id);
    drop(gtfs);

    let store = Arc::new(LocationStore::new(Arc::new(transit_index)));

    let source = HttpFeedSource::new(args.feed.url.clone(), args.feed.timeout())?;
    info!("Fetching vehicle positions from {}", source.url());

    let poller = FeedPoller::new(source, store.clone(), &args.feed)?;

    poller
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    info!(
        "Shut down with {} vehicles, last updated at {}",
        store.len(),
        store.get_last_update_time()
    );

    Ok(())
}
