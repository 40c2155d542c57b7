use std::{fs::File, io::Write, path::Path};

use crate::{map::HEADER_SIZE, TerrainMapMetadata};

/// Writes terrain-map files. Samples are the raw file values; the loader
/// multiplies them by the height resolution.
pub struct TerrainMapBuilder {
	metadata: TerrainMapMetadata,
	tiles: Vec<TileRecord>,
}

struct TileRecord {
	sw_lat: i16,
	sw_lon: i16,
	rows: u16,
	cols: u16,
	samples: Vec<i16>,
}

impl TerrainMapBuilder {
	pub fn new(metadata: TerrainMapMetadata) -> Self {
		Self {
			metadata,
			tiles: Vec::new(),
		}
	}

	pub fn add_tile(&mut self, sw_lat: i16, sw_lon: i16, rows: u16, cols: u16, samples: &[i16]) {
		assert_eq!(samples.len(), rows as usize * cols as usize, "sample count must match the tile shape");
		self.tiles.push(TileRecord {
			sw_lat,
			sw_lon,
			rows,
			cols,
			samples: samples.to_vec(),
		});
	}

	pub fn write(&self, path: &Path) -> Result<(), std::io::Error> {
		let mut file = File::create(path)?;

		let mut header = [0; HEADER_SIZE];
		header[0..2].copy_from_slice(&self.metadata.lat_range.to_le_bytes());
		header[2..4].copy_from_slice(&self.metadata.lon_range.to_le_bytes());
		header[4] = self.metadata.angular_step_lat;
		header[5] = self.metadata.angular_step_lon;
		header[6..8].copy_from_slice(&self.metadata.elevation_resolution.to_le_bytes());
		file.write_all(&header)?;

		for tile in self.tiles.iter() {
			file.write_all(&tile.sw_lat.to_le_bytes())?;
			file.write_all(&tile.sw_lon.to_le_bytes())?;
			file.write_all(&tile.rows.to_le_bytes())?;
			file.write_all(&tile.cols.to_le_bytes())?;
			let mut samples = Vec::with_capacity(tile.samples.len() * 2);
			for sample in tile.samples.iter() {
				samples.extend_from_slice(&sample.to_le_bytes());
			}
			file.write_all(&samples)?;
		}

		file.flush()
	}
}
