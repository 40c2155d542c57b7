use std::{fs::File, path::Path};

use geodesy::LatLon;
use memmap2::Mmap;

use crate::{
	ElevationGrid,
	LoadError,
	TerrainMapMetadata,
	Tile,
	ELEVATION_INVALID,
	ELEVATION_UNKNOWN,
	ELEVATION_WATER,
};

pub(crate) const HEADER_SIZE: usize = 8;
const TILE_HEADER_SIZE: usize = 8;

/// The decoded representation of a terrain-map file: the full tile lattice
/// plus a memory mapping the per-tile samples are read out of on demand.
pub struct TerrainMap {
	metadata: TerrainMapMetadata,
	tiles: Vec<Tile>,
	data: Mmap,
}

impl TerrainMap {
	pub fn load(path: &Path) -> Result<Self, LoadError> {
		let file = File::open(path)?;
		let data = unsafe { Mmap::map(&file)? };
		if data.len() < HEADER_SIZE {
			return Err(LoadError::InvalidFileSize);
		}

		let metadata = TerrainMapMetadata {
			lat_range: i16::from_le_bytes(data[0..2].try_into().unwrap()),
			lon_range: i16::from_le_bytes(data[2..4].try_into().unwrap()),
			angular_step_lat: data[4],
			angular_step_lon: data[5],
			elevation_resolution: u16::from_le_bytes(data[6..8].try_into().unwrap()),
		};
		if metadata.lat_range <= 0
			|| metadata.lon_range <= 0
			|| metadata.angular_step_lat == 0
			|| metadata.angular_step_lon == 0
			|| metadata.lat_range % metadata.angular_step_lat as i16 != 0
			|| metadata.lon_range % metadata.angular_step_lon as i16 != 0
		{
			return Err(LoadError::InvalidHeader);
		}

		let rows = metadata.lattice_rows();
		let cols = metadata.lattice_cols();
		let mut tiles: Vec<_> = (0..rows * cols)
			.map(|index| {
				let (row, col) = (index / cols, index % cols);
				Tile::absent(row, col, metadata.southwest_corner(row, col))
			})
			.collect();

		let mut offset = HEADER_SIZE;
		let mut tile_index = 0;
		while offset < data.len() {
			if offset + TILE_HEADER_SIZE > data.len() {
				return Err(LoadError::TruncatedTile);
			}
			let sw_lat = i16::from_le_bytes(data[offset..offset + 2].try_into().unwrap());
			let sw_lon = i16::from_le_bytes(data[offset + 2..offset + 4].try_into().unwrap());
			let tile_rows = u16::from_le_bytes(data[offset + 4..offset + 6].try_into().unwrap());
			let tile_cols = u16::from_le_bytes(data[offset + 6..offset + 8].try_into().unwrap());

			let samples = tile_rows as usize * tile_cols as usize * 2;
			if offset + TILE_HEADER_SIZE + samples > data.len() {
				return Err(LoadError::TruncatedTile);
			}

			let southwest = LatLon::new(sw_lat as f64, sw_lon as f64);
			let (row, col) = metadata.tile_indices(southwest);
			if metadata.southwest_corner(row, col) != southwest {
				return Err(LoadError::TileOutsideLattice);
			}

			let tile = &mut tiles[row * cols + col];
			tile.rows = tile_rows;
			tile.cols = tile_cols;
			tile.tile_index = tile_index;
			tile.data_offset = offset + TILE_HEADER_SIZE;

			offset += TILE_HEADER_SIZE + samples;
			tile_index += 1;
		}

		Ok(Self { metadata, tiles, data })
	}

	pub fn metadata(&self) -> TerrainMapMetadata { self.metadata }

	pub fn tile_count(&self) -> usize { self.tiles.iter().filter(|x| x.is_present()).count() }

	pub fn tile(&self, row: usize, col: usize) -> Option<&Tile> {
		self.tiles.get(row * self.metadata.lattice_cols() + col)
	}

	/// Decodes the tile's elevation map if it is present and not cached yet.
	/// Returns whether a decode happened.
	pub(crate) fn ensure_loaded(&mut self, row: usize, col: usize) -> bool {
		let cols = self.metadata.lattice_cols();
		let index = row * cols + col;
		if !self.tiles[index].is_present() || self.tiles[index].elevation_map.is_some() {
			return false;
		}

		tracy::zone!("Decode tile");

		let (tile_rows, tile_cols, base) = {
			let tile = &self.tiles[index];
			(tile.rows, tile.cols, tile.data_offset)
		};
		let count = tile_rows as usize * tile_cols as usize;
		let resolution = self.metadata.elevation_resolution;
		let samples = self.data[base..base + count * 2]
			.chunks_exact(2)
			.map(|raw| scale_elevation(i16::from_le_bytes(raw.try_into().unwrap()), resolution))
			.collect();

		self.tiles[index].elevation_map = Some(ElevationGrid {
			rows: tile_rows,
			cols: tile_cols,
			samples,
		});
		true
	}

	pub(crate) fn evict_except(&mut self, keep: &std::collections::HashSet<(usize, usize)>) {
		for tile in self.tiles.iter_mut() {
			if tile.elevation_map.is_some() && !keep.contains(&(tile.row, tile.col)) {
				tile.elevation_map = None;
			}
		}
	}

	pub(crate) fn release_elevation_cache(&mut self) {
		for tile in self.tiles.iter_mut() {
			tile.elevation_map = None;
		}
	}
}

fn scale_elevation(raw: i16, resolution: u16) -> i16 {
	match raw {
		ELEVATION_INVALID | ELEVATION_UNKNOWN | ELEVATION_WATER => raw,
		_ => (raw as i32 * resolution as i32).clamp(i16::MIN as i32, (ELEVATION_UNKNOWN - 1) as i32) as i16,
	}
}
