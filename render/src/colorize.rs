use rayon::prelude::*;
use terrain::{ELEVATION_INVALID, ELEVATION_UNKNOWN, ELEVATION_WATER};

use crate::{LocalElevationMap, PatternMap, RenderThresholds, RenderingMode};

const TRANSPARENT: [i32; 4] = [0, 0, 0, 0];
const RED: [i32; 4] = [255, 0, 0, 255];
const YELLOW: [i32; 4] = [255, 255, 50, 255];
const GREEN: [i32; 4] = [0, 255, 0, 255];
const WATER_CYAN: [i32; 4] = [0, 255, 255, 255];
const UNKNOWN_MAGENTA: [i32; 4] = [255, 148, 255, 255];

/// The colorizer's raster. Map rows hold 0-255 channel values; the final
/// row carries the frame statistics and is split off by the compositor.
pub struct ColorizedFrame {
	pub width: usize,
	pub height: usize,
	pub data: Vec<[i32; 4]>,
}

impl ColorizedFrame {
	pub fn pixel(&self, x: usize, y: usize) -> [i32; 4] { self.data[y * self.width + x] }

	pub fn metadata_row(&self) -> &[[i32; 4]] { &self.data[self.width * (self.height - 1)..] }
}

/// Classifies every local-map sample against the thresholds and stipples it
/// with the pattern map, then embeds the statistics row.
pub fn colorize(
	map: &LocalElevationMap, thresholds: &RenderThresholds, cut_off_altitude: i32, pattern: &PatternMap,
) -> ColorizedFrame {
	tracy::zone!("Colorize");

	let mut data = vec![TRANSPARENT; map.width * (map.height + 1)];

	data[..map.width * map.height]
		.par_chunks_mut(map.width)
		.enumerate()
		.for_each(|(y, row)| {
			for (x, out) in row.iter_mut().enumerate() {
				*out = classify_pixel(map.sample(x, y), x, y, thresholds, cut_off_altitude, pattern);
			}
		});

	let metadata = &mut data[map.width * map.height..];
	match thresholds.mode {
		RenderingMode::Normal => {
			metadata[0] = [
				0,
				thresholds.min_elevation,
				thresholds.max_elevation,
				thresholds.high_density_red,
			];
			metadata[1] = [
				thresholds.high_density_yellow,
				thresholds.low_density_yellow,
				thresholds.high_density_green,
				thresholds.low_density_green,
			];
		},
		RenderingMode::Peaks => {
			metadata[0] = [
				1,
				thresholds.min_elevation,
				thresholds.max_elevation,
				thresholds.solid_density,
			];
			metadata[1] = [thresholds.higher_density, thresholds.lower_density, 0, 0];
		},
	}

	ColorizedFrame {
		width: map.width,
		height: map.height + 1,
		data,
	}
}

fn classify_pixel(
	elevation: i16, x: usize, y: usize, thresholds: &RenderThresholds, cut_off_altitude: i32,
	pattern: &PatternMap,
) -> [i32; 4] {
	match elevation {
		ELEVATION_INVALID => TRANSPARENT,
		ELEVATION_WATER => {
			if pattern.water_set(x, y) {
				WATER_CYAN
			} else {
				TRANSPARENT
			}
		},
		ELEVATION_UNKNOWN => {
			if pattern.high_density_set(x, y) {
				UNKNOWN_MAGENTA
			} else {
				TRANSPARENT
			}
		},
		_ => {
			let elevation = elevation as i32;
			if elevation < cut_off_altitude {
				return TRANSPARENT;
			}

			match thresholds.mode {
				RenderingMode::Normal => {
					if elevation >= thresholds.high_density_red {
						stipple(pattern.high_density_set(x, y), RED)
					} else if elevation >= thresholds.high_density_yellow {
						stipple(pattern.high_density_set(x, y), YELLOW)
					} else if elevation >= thresholds.low_density_yellow {
						stipple(pattern.low_density_set(x, y), YELLOW)
					} else if elevation >= thresholds.high_density_green {
						stipple(pattern.high_density_set(x, y), GREEN)
					} else if elevation >= thresholds.low_density_green {
						stipple(pattern.low_density_set(x, y), GREEN)
					} else {
						TRANSPARENT
					}
				},
				RenderingMode::Peaks => {
					if elevation >= thresholds.solid_density {
						GREEN
					} else if elevation >= thresholds.higher_density {
						stipple(pattern.high_density_set(x, y), GREEN)
					} else if elevation >= thresholds.lower_density {
						stipple(pattern.low_density_set(x, y), GREEN)
					} else {
						TRANSPARENT
					}
				},
			}
		},
	}
}

fn stipple(set: bool, color: [i32; 4]) -> [i32; 4] {
	if set {
		color
	} else {
		TRANSPARENT
	}
}
