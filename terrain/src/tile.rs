use geodesy::LatLon;

/// Decoded elevation samples of one tile, row-major with row 0 at the
/// northern edge.
pub struct ElevationGrid {
	pub rows: u16,
	pub cols: u16,
	pub samples: Vec<i16>,
}

impl ElevationGrid {
	pub fn sample(&self, row: usize, col: usize) -> i16 { self.samples[row * self.cols as usize + col] }
}

/// One cell of the tile lattice.
///
/// Created when the terrain map is loaded; the elevation map is filled
/// lazily when the tile becomes visible and dropped again when the store
/// evicts it.
pub struct Tile {
	pub row: usize,
	pub col: usize,
	pub southwest: LatLon,
	pub rows: u16,
	pub cols: u16,
	/// Index of the tile record in the source file, -1 when the file has no
	/// data for this cell.
	pub tile_index: i32,
	pub(crate) data_offset: usize,
	pub(crate) elevation_map: Option<ElevationGrid>,
}

impl Tile {
	pub(crate) fn absent(row: usize, col: usize, southwest: LatLon) -> Self {
		Self {
			row,
			col,
			southwest,
			rows: 0,
			cols: 0,
			tile_index: -1,
			data_offset: 0,
			elevation_map: None,
		}
	}

	pub fn is_present(&self) -> bool { self.tile_index >= 0 }

	pub fn elevation_map(&self) -> Option<&ElevationGrid> { self.elevation_map.as_ref() }
}
