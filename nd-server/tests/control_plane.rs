use std::{
	sync::Arc,
	thread,
	time::{Duration, Instant},
};

use crossbeam::channel;
use dashmap::DashMap;
use nd_server::{
	messages::{AircraftStatus, FrameDataSnapshot, FrameMetadata, Side, SimulatorLink, WorkerMessage},
	server::handle_request,
	worker::RenderWorker,
};
use render::{NavigationDisplayConfig, TerrainRenderingMode};
use terrain::{TerrainMap, TerrainMapBuilder, TerrainMapMetadata, TileStore};

struct NullLink;

impl SimulatorLink for NullLink {
	fn send_metadata(&self, _side: Side, _metadata: &FrameMetadata) {}

	fn send_frame(&self, _side: Side, _png: &[u8]) {}
}

fn innsbruck_store(dir: &tempfile::TempDir) -> TileStore {
	let path = dir.path().join("map.terrain");

	let mut builder = TerrainMapBuilder::new(TerrainMapMetadata {
		lat_range: 180,
		lon_range: 360,
		angular_step_lat: 1,
		angular_step_lon: 1,
		elevation_resolution: 1,
	});
	for lat in 46..=48i16 {
		for lon in 10..=12i16 {
			let samples: Vec<i16> = (0..400).map(|i| 1800 + (i / 20) as i16 * 150 + (lon - 10) * 200).collect();
			builder.add_tile(lat, lon, 20, 20, &samples);
		}
	}
	builder.write(&path).unwrap();

	TileStore::new(Some(TerrainMap::load(&path).unwrap()), 40.0)
}

fn innsbruck_status() -> AircraftStatus {
	AircraftStatus {
		adiru_data_valid: true,
		latitude: 47.26081085,
		longitude: 11.34965897,
		altitude_ft: 1904,
		heading_deg: 260.0,
		vertical_speed_fpm: 0,
		gear_is_down: true,
		destination_data_valid: false,
		destination_latitude: 0.0,
		destination_longitude: 0.0,
		navigation_display_capt: NavigationDisplayConfig::new(true, true, 10, 0),
		navigation_display_fo: NavigationDisplayConfig::inactive(),
		navigation_display_rendering_mode: TerrainRenderingMode::ArcMode,
	}
}

#[test]
fn frame_data_and_shutdown_flow_over_the_wire() {
	let dir = tempfile::tempdir().unwrap();
	let store = innsbruck_store(&dir);

	let (tx, rx) = channel::unbounded();
	let snapshots: Arc<DashMap<Side, FrameDataSnapshot>> = Arc::new(DashMap::new());

	let worker_snapshots = snapshots.clone();
	let worker = thread::spawn(move || RenderWorker::new(store, rx, Box::new(NullLink), worker_snapshots).run());

	let server_tx = tx.clone();
	let server = rouille::Server::new("127.0.0.1:0", move |req| handle_request(req, &snapshots, &server_tx))
		.unwrap();
	let addr = server.server_addr();
	thread::spawn(move || server.run());

	tx.send(WorkerMessage::AircraftStatusUpdate(Box::new(innsbruck_status())))
		.unwrap();

	// Wait out warm-up and the first sweep ticks.
	let client = reqwest::blocking::Client::new();
	let deadline = Instant::now() + Duration::from_secs(30);
	let frame_data = loop {
		let response = client
			.get(format!("http://{}/frame-data?side=L", addr))
			.send()
			.unwrap();
		if response.status().as_u16() == 200 {
			break response.json::<serde_json::Value>().unwrap();
		}
		assert!(Instant::now() < deadline, "no frame data within the deadline");
		thread::sleep(Duration::from_millis(50));
	};

	assert_eq!(frame_data["side"], "L");
	assert!(!frame_data["frames"].as_array().unwrap().is_empty());
	assert!(frame_data["timestampMs"].is_u64());
	// Bounded below by the look-ahead band over the terrain floor.
	assert!(frame_data["thresholds"]["minElevation"].as_i64().unwrap() >= 1904 - 2000);

	// The first officer's side never rendered.
	let response = client
		.get(format!("http://{}/frame-data?side=R", addr))
		.send()
		.unwrap();
	assert_eq!(response.status().as_u16(), 404);

	// Bad side and unknown paths are rejected.
	let response = client
		.get(format!("http://{}/frame-data?side=X", addr))
		.send()
		.unwrap();
	assert_eq!(response.status().as_u16(), 400);
	let response = client.get(format!("http://{}/nonsense", addr)).send().unwrap();
	assert_eq!(response.status().as_u16(), 404);

	// Graceful teardown over the wire.
	let response = client.get(format!("http://{}/shutdown", addr)).send().unwrap();
	assert_eq!(response.status().as_u16(), 200);
	worker.join().unwrap();
}
