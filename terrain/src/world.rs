use geodesy::LatLon;

use crate::{TileStore, ELEVATION_INVALID, ELEVATION_UNKNOWN, ELEVATION_WATER};

/// Assumed when no active tile carries a decoded shape.
const FALLBACK_SAMPLES_PER_TILE: usize = 300;

/// A single contiguous elevation grid covering the active tiles around the
/// aircraft, along with the aircraft's sub-pixel location inside it.
///
/// The grid is rebuilt only when new tiles were decoded or the active tile
/// count changed; the ego pixel is recomputed on every position update.
#[derive(Default)]
pub struct WorldMapCache {
	grid: Vec<i16>,
	width: usize,
	height: usize,
	min_samples_x: usize,
	min_samples_y: usize,
	southwest: LatLon,
	northeast: LatLon,
	/// Degrees of latitude per sample row.
	lat_step: f64,
	/// Degrees of longitude per sample column.
	lon_step: f64,
	ego_pixel: (f64, f64),
	aircraft: LatLon,
	active: Vec<Vec<(usize, usize)>>,
	last_tile_count: usize,
	rebuilds: usize,
}

impl WorldMapCache {
	pub fn new() -> Self { Self::default() }

	pub fn width(&self) -> usize { self.width }

	pub fn height(&self) -> usize { self.height }

	pub fn is_empty(&self) -> bool { self.grid.is_empty() }

	pub fn ego_pixel(&self) -> (f64, f64) { self.ego_pixel }

	pub fn southwest(&self) -> LatLon { self.southwest }

	pub fn northeast(&self) -> LatLon { self.northeast }

	pub fn lat_step(&self) -> f64 { self.lat_step }

	pub fn lon_step(&self) -> f64 { self.lon_step }

	pub fn aircraft(&self) -> LatLon { self.aircraft }

	/// Refreshes the cache for a new aircraft position: loads the visible
	/// tiles, rebuilds the contiguous grid when the active set changed, and
	/// recomputes the ego pixel.
	pub fn update_position(&mut self, store: &mut TileStore, position: LatLon) {
		tracy::zone!("World map update");

		self.aircraft = position;

		let grid = store.create_grid_lookup_table(position);
		if grid.is_empty() || grid[0].is_empty() {
			self.clear_grid();
			return;
		}

		let loaded = store.update_position(&grid);
		let tile_count = grid.iter().map(|row| row.len()).sum::<usize>();
		if loaded || tile_count != self.last_tile_count {
			self.rebuild(store, &grid);
			store.cleanup_elevation_cache(&grid);
			self.active = grid;
		}
		self.last_tile_count = tile_count;

		self.update_ego_pixel(store, position);
	}

	/// Samples the grid at a geographic coordinate. Out-of-range lookups
	/// return `ELEVATION_UNKNOWN`; an empty cache returns
	/// `ELEVATION_INVALID`.
	pub fn extract_elevation(&self, coordinate: LatLon) -> i16 {
		if self.grid.is_empty() {
			return ELEVATION_INVALID;
		}

		let mut lon_delta = coordinate.lon - self.aircraft.lon;
		if lon_delta > 180.0 {
			lon_delta -= 360.0;
		} else if lon_delta < -180.0 {
			lon_delta += 360.0;
		}

		let x = (self.ego_pixel.0 + lon_delta / self.lon_step).floor();
		let y = (self.ego_pixel.1 + (self.aircraft.lat - coordinate.lat) / self.lat_step).floor();
		if x < 0.0 || y < 0.0 || x >= self.width as f64 || y >= self.height as f64 {
			return ELEVATION_UNKNOWN;
		}

		self.grid[y as usize * self.width + x as usize]
	}

	/// Releases the grid entirely, e.g. when the simulator connection drops.
	pub fn clear(&mut self) { *self = Self::default(); }

	fn clear_grid(&mut self) {
		self.grid = Vec::new();
		self.width = 0;
		self.height = 0;
		self.active = Vec::new();
		self.last_tile_count = 0;
		self.ego_pixel = (0.0, 0.0);
	}

	fn rebuild(&mut self, store: &TileStore, grid: &[Vec<(usize, usize)>]) {
		tracy::zone!("World map rebuild");

		let meta = match store.metadata() {
			Some(x) => x,
			None => return,
		};

		let mut min_x = usize::MAX;
		let mut min_y = usize::MAX;
		for &(row, col) in grid.iter().flatten() {
			if let Some(tile) = store.tile(row, col).filter(|x| x.is_present()) {
				min_x = min_x.min(tile.cols as usize);
				min_y = min_y.min(tile.rows as usize);
			}
		}
		if min_x == usize::MAX {
			min_x = FALLBACK_SAMPLES_PER_TILE;
			min_y = FALLBACK_SAMPLES_PER_TILE;
		}

		let grid_rows = grid.len();
		let grid_cols = grid[0].len();
		self.min_samples_x = min_x;
		self.min_samples_y = min_y;
		self.width = min_x * grid_cols;
		self.height = min_y * grid_rows;

		let mut samples = vec![0i16; self.width * self.height];
		for (grid_y, cells) in grid.iter().enumerate() {
			for (grid_x, &(row, col)) in cells.iter().enumerate() {
				let tile = store.tile(row, col).filter(|x| x.is_present());
				let elevations = tile.and_then(|x| x.elevation_map());
				for sub_y in 0..min_y {
					let base = (grid_y * min_y + sub_y) * self.width + grid_x * min_x;
					match (tile, elevations) {
						(Some(_), Some(map)) => {
							let src = sub_y * map.cols as usize;
							samples[base..base + min_x].copy_from_slice(&map.samples[src..src + min_x]);
						},
						(Some(_), None) => samples[base..base + min_x].fill(ELEVATION_UNKNOWN),
						(None, _) => samples[base..base + min_x].fill(ELEVATION_WATER),
					}
				}
			}
		}
		self.grid = samples;

		let (sw_row, sw_col) = grid[grid_rows - 1][0];
		let (ne_row, ne_col) = grid[0][grid_cols - 1];
		let ne_corner = meta.southwest_corner(ne_row, ne_col);
		self.southwest = meta.southwest_corner(sw_row, sw_col);
		self.northeast = LatLon {
			lat: ne_corner.lat + meta.angular_step_lat as f64,
			lon: ne_corner.lon + meta.angular_step_lon as f64,
		};

		self.lat_step = meta.angular_step_lat as f64 / min_y as f64;
		self.lon_step = meta.angular_step_lon as f64 / min_x as f64;

		self.rebuilds += 1;
		log::debug!(
			"world map rebuilt: {}x{} samples, {} tiles",
			self.width,
			self.height,
			grid_rows * grid_cols
		);
	}

	fn update_ego_pixel(&mut self, store: &TileStore, position: LatLon) {
		let meta = match store.metadata() {
			Some(x) => x,
			None => return,
		};

		let cell = meta.tile_indices(position);
		let mut found = None;
		for (row_idx, cells) in self.active.iter().enumerate() {
			for (col_idx, &active_cell) in cells.iter().enumerate() {
				if active_cell == cell {
					found = Some((row_idx, col_idx));
				}
			}
		}

		self.ego_pixel = match found {
			Some((row_idx, col_idx)) => {
				let southwest = meta.southwest_corner(cell.0, cell.1);
				let lat_delta = position.lat - southwest.lat;
				let mut lon_delta = position.lon - southwest.lon;
				if lon_delta < 0.0 {
					lon_delta += 360.0;
				}

				(
					col_idx as f64 * self.min_samples_x as f64 + lon_delta / self.lon_step,
					row_idx as f64 * self.min_samples_y as f64
						+ (self.min_samples_y as f64 - lat_delta / self.lat_step),
				)
			},
			None => (self.width as f64 / 2.0, self.height as f64 / 2.0),
		};
	}
}
