use std::collections::HashSet;

use geodesy::{project_wgs84, LatLon, METERS_PER_NAUTICAL_MILE};

use crate::{TerrainMap, TerrainMapMetadata, Tile};

/// Matches the largest display range the consumer requests.
pub const DEFAULT_VISIBILITY_RANGE_NM: f64 = 40.0;

/// Owns the decoded tiles and answers which lattice cells cover the
/// visibility disc around a position.
pub struct TileStore {
	map: Option<TerrainMap>,
	visibility_range_nm: f64,
}

impl TileStore {
	pub fn new(map: Option<TerrainMap>, visibility_range_nm: f64) -> Self {
		Self {
			map,
			visibility_range_nm,
		}
	}

	pub fn metadata(&self) -> Option<TerrainMapMetadata> { self.map.as_ref().map(|x| x.metadata()) }

	pub fn tile(&self, row: usize, col: usize) -> Option<&Tile> { self.map.as_ref().and_then(|x| x.tile(row, col)) }

	pub fn tile_count(&self) -> usize { self.map.as_ref().map(|x| x.tile_count()).unwrap_or(0) }

	/// The smallest axis-aligned rectangle of lattice cells containing the
	/// visibility disc around `position`. Rows run north to south, matching
	/// the raster layout of the world-map grid; columns wrap eastwards over
	/// the antimeridian.
	pub fn create_grid_lookup_table(&self, position: LatLon) -> Vec<Vec<(usize, usize)>> {
		let map = match &self.map {
			Some(x) => x,
			None => return Vec::new(),
		};
		let meta = map.metadata();

		let range_m = self.visibility_range_nm * METERS_PER_NAUTICAL_MILE;
		let southwest = project_wgs84(position, 225.0, range_m);
		let northeast = project_wgs84(position, 45.0, range_m);

		let (sw_row, sw_col) = meta.tile_indices(southwest);
		let (ne_row, ne_col) = meta.tile_indices(northeast);

		let cols = meta.lattice_cols();
		let col_count = (ne_col + cols - sw_col) % cols + 1;

		(sw_row..=ne_row)
			.rev()
			.map(|row| (0..col_count).map(|offset| (row, (sw_col + offset) % cols)).collect())
			.collect()
	}

	/// Decodes the elevation maps of any tiles in `grid` that are missing
	/// them. Returns true iff new tiles were decoded.
	pub fn update_position(&mut self, grid: &[Vec<(usize, usize)>]) -> bool {
		let map = match &mut self.map {
			Some(x) => x,
			None => return false,
		};

		tracy::zone!("Tile population");

		let mut loaded = false;
		for row in grid {
			for &(tile_row, tile_col) in row {
				loaded |= map.ensure_loaded(tile_row, tile_col);
			}
		}
		loaded
	}

	/// Evicts cached elevation maps that are no longer referenced by `grid`.
	pub fn cleanup_elevation_cache(&mut self, grid: &[Vec<(usize, usize)>]) {
		let map = match &mut self.map {
			Some(x) => x,
			None => return,
		};

		let keep: HashSet<_> = grid.iter().flatten().copied().collect();
		map.evict_except(&keep);
	}

	/// Drops every cached elevation map.
	pub fn release_all(&mut self) {
		if let Some(map) = &mut self.map {
			map.release_elevation_cache();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{TerrainMapBuilder, TerrainMapMetadata};

	fn store_with_tiles(tiles: &[(i16, i16)]) -> TileStore {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("map.terrain");

		let mut builder = TerrainMapBuilder::new(TerrainMapMetadata {
			lat_range: 180,
			lon_range: 360,
			angular_step_lat: 1,
			angular_step_lon: 1,
			elevation_resolution: 1,
		});
		for &(lat, lon) in tiles {
			builder.add_tile(lat, lon, 2, 2, &[100, 200, 300, 400]);
		}
		builder.write(&path).unwrap();

		TileStore::new(Some(TerrainMap::load(&path).unwrap()), 10.0)
	}

	#[test]
	fn grid_encloses_the_visibility_disc() {
		let store = store_with_tiles(&[(47, 11)]);
		let grid = store.create_grid_lookup_table(LatLon::new(47.26, 11.35));

		// 10 nm around the middle of a one degree tile stays within the
		// neighbouring cells.
		assert!(!grid.is_empty());
		let rows = grid.len();
		let cols = grid[0].len();
		assert!(rows <= 3 && cols <= 3);

		// Rows run north to south.
		assert!(grid[0][0].0 >= grid[rows - 1][0].0);
		// The aircraft's tile is inside the rectangle.
		assert!(grid.iter().flatten().any(|&cell| cell == (137, 191)));
	}

	#[test]
	fn grid_wraps_over_the_antimeridian() {
		let store = store_with_tiles(&[(0, 179), (0, -180)]);
		let grid = store.create_grid_lookup_table(LatLon::new(0.5, 179.95));

		let cols: Vec<_> = grid[0].iter().map(|&(_, col)| col).collect();
		assert!(cols.contains(&359) && cols.contains(&0));
	}

	#[test]
	fn update_loads_once_and_cleanup_evicts() {
		let mut store = store_with_tiles(&[(47, 11)]);
		let grid = store.create_grid_lookup_table(LatLon::new(47.26, 11.35));

		assert!(store.update_position(&grid));
		assert!(!store.update_position(&grid));
		assert!(store.tile(137, 191).unwrap().elevation_map().is_some());

		store.cleanup_elevation_cache(&[]);
		assert!(store.tile(137, 191).unwrap().elevation_map().is_none());
	}
}
