use geodesy::LatLon;
use terrain::{TileStore, WorldMapCache};

use crate::{
	analyze_histogram,
	colorize,
	compute_histogram,
	compute_local_map,
	cut_off_altitude,
	AircraftState,
	ColorizedFrame,
	NavigationDisplayConfig,
	PatternMap,
	RenderThresholds,
};

/// Everything one render tick produces for a side.
pub struct RenderedFrame {
	pub image: ColorizedFrame,
	pub thresholds: RenderThresholds,
	pub cut_off_altitude: i32,
}

/// Runs the full per-frame pipeline: local map, histogram, cut-off,
/// thresholds, colorization.
pub fn render_navigation_display(
	world: &WorldMapCache, aircraft: &AircraftState, config: &NavigationDisplayConfig, pattern: &PatternMap,
) -> RenderedFrame {
	tracy::zone!("Render navigation display");

	let local_map = compute_local_map(world, aircraft.position, aircraft.heading_deg, config);
	let histogram = compute_histogram(&local_map);
	let cut_off = cut_off_altitude(world, aircraft.position, aircraft.altitude_ft, aircraft.destination);
	let thresholds = analyze_histogram(
		&histogram,
		aircraft.altitude_ft,
		aircraft.vertical_speed_fpm,
		aircraft.gear_is_down,
		cut_off,
	);
	let image = colorize(&local_map, &thresholds, cut_off, pattern);

	RenderedFrame {
		image,
		thresholds,
		cut_off_altitude: cut_off,
	}
}

/// Primes the thread pool, the tile cache, and the world grid with one
/// discarded render so the first real frame meets latency.
pub fn warm_up(world: &mut WorldMapCache, store: &mut TileStore, pattern: &PatternMap) {
	tracy::zone!("Warm up");

	let aircraft = AircraftState {
		position: LatLon::new(47.26, 11.35),
		altitude_ft: 1904,
		heading_deg: 260.0,
		vertical_speed_fpm: 0,
		gear_is_down: false,
		destination: None,
	};
	let config = NavigationDisplayConfig::new(true, true, 10, 0);

	world.update_position(store, aircraft.position);
	let _ = render_navigation_display(world, &aircraft, &config, pattern);
}

#[cfg(test)]
mod tests {
	use terrain::{TerrainMap, TerrainMapBuilder, TerrainMapMetadata};

	use super::*;
	use crate::{MapImage, RenderingMode, TerrainRenderingMode};

	fn innsbruck_store() -> (tempfile::TempDir, TileStore) {
		let dir = tempfile::tempdir().unwrap();
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
				// A coarse alpine valley: ridges rise with the row index.
				let samples: Vec<i16> = (0..400)
					.map(|i| {
						let row = i / 20;
						1800 + row as i16 * 150 + (lon - 10) * 200
					})
					.collect();
				builder.add_tile(lat, lon, 20, 20, &samples);
			}
		}
		builder.write(&path).unwrap();

		let store = TileStore::new(Some(TerrainMap::load(&path).unwrap()), 40.0);
		(dir, store)
	}

	#[test]
	fn pipeline_is_deterministic() {
		let (_dir, mut store) = innsbruck_store();
		let mut world = WorldMapCache::new();
		let pattern = PatternMap::for_mode(TerrainRenderingMode::ArcMode);

		let aircraft = AircraftState {
			position: LatLon::new(47.26081085, 11.34965897),
			altitude_ft: 1904,
			heading_deg: 260.0,
			vertical_speed_fpm: 0,
			gear_is_down: true,
			destination: None,
		};
		let config = NavigationDisplayConfig::new(true, true, 10, 0);
		world.update_position(&mut store, aircraft.position);

		let first = render_navigation_display(&world, &aircraft, &config, &pattern);
		let second = render_navigation_display(&world, &aircraft, &config, &pattern);

		assert_eq!(first.thresholds, second.thresholds);
		assert_eq!(first.image.data, second.image.data);
		assert_eq!(
			MapImage::from_colorized(&first.image).data,
			MapImage::from_colorized(&second.image).data
		);
	}

	#[test]
	fn low_flight_over_the_alps_renders_in_normal_mode() {
		let (_dir, mut store) = innsbruck_store();
		let mut world = WorldMapCache::new();
		let pattern = PatternMap::for_mode(TerrainRenderingMode::ArcMode);

		let aircraft = AircraftState {
			position: LatLon::new(47.26081085, 11.34965897),
			altitude_ft: 1904,
			heading_deg: 260.0,
			vertical_speed_fpm: 0,
			gear_is_down: true,
			destination: None,
		};
		let config = NavigationDisplayConfig::new(true, true, 10, 0);
		world.update_position(&mut store, aircraft.position);

		let frame = render_navigation_display(&world, &aircraft, &config, &pattern);
		assert_eq!(frame.thresholds.mode, RenderingMode::Normal);
		assert_eq!(frame.cut_off_altitude, -500);
		// The terrain floor bounds the reported minimum from below.
		assert!(frame.thresholds.min_elevation >= 1800);
		assert_eq!(frame.image.width, 756);
		assert_eq!(frame.image.height, 493);
	}

	#[test]
	fn warm_up_runs_without_terrain_data() {
		let mut store = TileStore::new(None, 40.0);
		let mut world = WorldMapCache::new();
		let pattern = PatternMap::for_mode(TerrainRenderingMode::ArcMode);

		warm_up(&mut world, &mut store, &pattern);
		assert!(world.is_empty());
	}
}
