use geodesy::{normalize_heading, project_wgs84, rad2deg, LatLon, METERS_PER_NAUTICAL_MILE};
use rayon::prelude::*;
use terrain::WorldMapCache;

use crate::NavigationDisplayConfig;

/// Elevations sampled under every display pixel, row-major with row 0 at the
/// top of the display.
pub struct LocalElevationMap {
	pub width: usize,
	pub height: usize,
	pub elevations: Vec<i16>,
}

impl LocalElevationMap {
	pub fn sample(&self, x: usize, y: usize) -> i16 { self.elevations[y * self.width + x] }
}

/// Ground meters covered by one display pixel. The arc's vertical extent
/// shows half the range on the visible chord, so arc mode doubles the base
/// scale.
pub fn meters_per_pixel(range_nm: u32, nd_height: usize, arc_mode: bool) -> i32 {
	let base = (range_nm as f64 * METERS_PER_NAUTICAL_MILE / nd_height as f64).round() as i32;
	if arc_mode {
		base * 2
	} else {
		base
	}
}

/// Projects every display pixel onto the earth and samples the world grid
/// under it.
pub fn compute_local_map(
	world: &WorldMapCache, position: LatLon, heading_deg: f64, config: &NavigationDisplayConfig,
) -> LocalElevationMap {
	tracy::zone!("Local map");

	let width = config.map_width;
	let height = config.map_height;
	let scale = meters_per_pixel(config.range_nm, height, config.arc_mode) as f64;

	let mut elevations = vec![0i16; width * height];
	elevations.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
		for (x, out) in row.iter_mut().enumerate() {
			*out = sample_pixel(world, position, heading_deg, config, scale, x, y);
		}
	});

	LocalElevationMap {
		width,
		height,
		elevations,
	}
}

fn sample_pixel(
	world: &WorldMapCache, position: LatLon, heading_deg: f64, config: &NavigationDisplayConfig, scale: f64,
	x: usize, y: usize,
) -> i16 {
	let dx = x as f64 - config.map_width as f64 / 2.0;
	let dy = (config.map_height - y) as f64;

	let distance_px = (dx * dx + dy * dy).sqrt();
	if config.arc_mode && distance_px > config.map_height as f64 {
		return terrain::ELEVATION_INVALID;
	}

	let distance_m = distance_px * scale / 2.0;

	let mut angle = rad2deg((dy / distance_px).acos());
	if dx < 0.0 {
		angle = 360.0 - angle;
	}
	let bearing = normalize_heading(angle + heading_deg);

	world.extract_elevation(project_wgs84(position, bearing, distance_m))
}

#[cfg(test)]
mod tests {
	use geodesy::project_wgs84;
	use terrain::{TerrainMap, TerrainMapBuilder, TerrainMapMetadata, TileStore, ELEVATION_INVALID};

	use super::*;

	fn world_around(position: LatLon) -> (tempfile::TempDir, WorldMapCache) {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("map.terrain");

		let mut builder = TerrainMapBuilder::new(TerrainMapMetadata {
			lat_range: 180,
			lon_range: 360,
			angular_step_lat: 1,
			angular_step_lon: 1,
			elevation_resolution: 1,
		});
		let base_lat = position.lat.floor() as i16;
		let base_lon = position.lon.floor() as i16;
		for lat in base_lat - 1..=base_lat + 1 {
			for lon in base_lon - 1..=base_lon + 1 {
				// Each tile is flat at a height derived from its corner.
				let height = (lat as i16 - base_lat + 2) * 1000 + (lon - base_lon) * 100;
				builder.add_tile(lat, lon, 10, 10, &vec![height; 100]);
			}
		}
		builder.write(&path).unwrap();

		let mut store = TileStore::new(Some(TerrainMap::load(&path).unwrap()), 40.0);
		let mut world = WorldMapCache::new();
		world.update_position(&mut store, position);
		(dir, world)
	}

	#[test]
	fn arc_fan_cuts_the_corners() {
		let position = LatLon::new(47.26, 11.35);
		let (_dir, world) = world_around(position);
		let config = NavigationDisplayConfig::new(true, true, 10, 0);

		let map = compute_local_map(&world, position, 0.0, &config);
		assert_eq!(map.sample(0, 0), ELEVATION_INVALID);
		assert_eq!(map.sample(config.map_width - 1, 0), ELEVATION_INVALID);
		assert_ne!(map.sample(config.map_width / 2, 0), ELEVATION_INVALID);
	}

	#[test]
	fn straight_ahead_pixels_sample_along_the_heading() {
		let position = LatLon::new(47.26, 11.35);
		let (_dir, world) = world_around(position);
		let config = NavigationDisplayConfig::new(true, true, 10, 0);
		let heading = 260.0;

		let map = compute_local_map(&world, position, heading, &config);

		// Pixel one third up the boresight line.
		let y = config.map_height - config.map_height / 3;
		let distance_px = (config.map_height - y) as f64;
		let distance_m = distance_px * meters_per_pixel(config.range_nm, config.map_height, true) as f64 / 2.0;
		let expected = world.extract_elevation(project_wgs84(position, heading, distance_m));
		assert_eq!(map.sample(config.map_width / 2, y), expected);
	}

	#[test]
	fn identical_inputs_produce_identical_maps() {
		let position = LatLon::new(47.26, 11.35);
		let (_dir, world) = world_around(position);
		let config = NavigationDisplayConfig::new(true, false, 20, 0);

		let first = compute_local_map(&world, position, 123.0, &config);
		let second = compute_local_map(&world, position, 123.0, &config);
		assert_eq!(first.elevations, second.elevations);
	}

	#[test]
	fn scale_doubles_in_arc_mode() {
		assert_eq!(meters_per_pixel(10, 492, false), 38);
		assert_eq!(meters_per_pixel(10, 492, true), 76);
	}
}
