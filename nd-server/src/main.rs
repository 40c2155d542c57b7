use std::{path::PathBuf, sync::Arc, thread};

use clap::Parser;
use crossbeam::channel;
use dashmap::DashMap;
use nd_server::{
	messages::{FrameDataSnapshot, FrameMetadata, Side, SimulatorLink},
	server::handle_request,
	worker::RenderWorker,
};
use terrain::{TerrainMap, TileStore, DEFAULT_VISIBILITY_RANGE_NM};

#[derive(Parser)]
#[clap(name = "nd-server")]
struct Options {
	/// Path of the terrain-map file.
	terrain_map: PathBuf,
	/// Address the control-plane endpoints listen on.
	#[clap(long, default_value = "0.0.0.0:42070")]
	listen: String,
	/// Radius of the tile visibility disc, in nautical miles.
	#[clap(long, default_value_t = DEFAULT_VISIBILITY_RANGE_NM)]
	visibility_range: f64,
}

/// Stands in for the simulator connector; emissions only go to the log.
struct LoggingLink;

impl SimulatorLink for LoggingLink {
	fn send_metadata(&self, side: Side, metadata: &FrameMetadata) {
		log::debug!(
			"{}: min {} ft, max {} ft, range {}, first {}, {} bytes",
			side.letter(),
			metadata.minimum_elevation,
			metadata.maximum_elevation,
			metadata.display_range,
			metadata.first_frame,
			metadata.frame_byte_count,
		);
	}

	fn send_frame(&self, side: Side, png: &[u8]) {
		log::trace!("{}: frame of {} bytes", side.letter(), png.len());
	}
}

fn main() {
	env_logger::init();
	let options = Options::parse();

	let map = match TerrainMap::load(&options.terrain_map) {
		Ok(map) => {
			let meta = map.metadata();
			log::info!(
				"terrain map loaded: {} tiles over a {}x{} degree lattice",
				map.tile_count(),
				meta.lat_range,
				meta.lon_range,
			);
			Some(map)
		},
		Err(e) => {
			log::error!("failed to load terrain map {}: {}", options.terrain_map.display(), e);
			None
		},
	};
	let store = TileStore::new(map, options.visibility_range);

	let (tx, rx) = channel::unbounded();
	let snapshots: Arc<DashMap<Side, FrameDataSnapshot>> = Arc::new(DashMap::new());

	let worker_snapshots = snapshots.clone();
	let worker =
		thread::spawn(move || RenderWorker::new(store, rx, Box::new(LoggingLink), worker_snapshots).run());

	let listen = options.listen.clone();
	thread::spawn(move || {
		rouille::start_server_with_pool(
			listen,
			std::thread::available_parallelism().ok().map(std::num::NonZeroUsize::get),
			move |req| handle_request(req, &snapshots, &tx),
		)
	});

	let _ = worker.join();
	std::process::exit(0);
}
