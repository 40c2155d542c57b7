use rayon::prelude::*;
use terrain::{ELEVATION_INVALID, ELEVATION_UNKNOWN, ELEVATION_WATER};

use crate::LocalElevationMap;

pub const HIST_MIN_ELEV: i32 = -500;
pub const HIST_MAX_ELEV: i32 = 29040;
pub const HIST_BIN_WIDTH: i32 = 100;
pub const HIST_BIN_COUNT: usize = 296;
pub const HIST_PATCH_SIZE: usize = 128;

/// Whether a sample participates in the elevation statistics. Sentinels and
/// out-of-range values are colorized but never counted.
pub fn histogram_eligible(elevation: i16) -> bool {
	!matches!(elevation, ELEVATION_INVALID | ELEVATION_UNKNOWN | ELEVATION_WATER)
		&& (HIST_MIN_ELEV..=HIST_MAX_ELEV).contains(&(elevation as i32))
}

pub fn elevation_bin(elevation: i16) -> usize { ((elevation as i32 - HIST_MIN_ELEV) / HIST_BIN_WIDTH) as usize }

/// Pass 1: one histogram per 128x128 patch of the local map, reduced in
/// parallel.
pub fn patch_histograms(map: &LocalElevationMap) -> Vec<Vec<u32>> {
	tracy::zone!("Histogram patches");

	let patches_x = (map.width + HIST_PATCH_SIZE - 1) / HIST_PATCH_SIZE;
	let patches_y = (map.height + HIST_PATCH_SIZE - 1) / HIST_PATCH_SIZE;

	(0..patches_x * patches_y)
		.into_par_iter()
		.map(|patch| {
			let x_start = (patch % patches_x) * HIST_PATCH_SIZE;
			let y_start = (patch / patches_x) * HIST_PATCH_SIZE;

			let mut bins = vec![0u32; HIST_BIN_COUNT];
			for y in y_start..(y_start + HIST_PATCH_SIZE).min(map.height) {
				for x in x_start..(x_start + HIST_PATCH_SIZE).min(map.width) {
					let elevation = map.elevations[y * map.width + x];
					if histogram_eligible(elevation) {
						bins[elevation_bin(elevation)] += 1;
					}
				}
			}
			bins
		})
		.collect()
}

/// Pass 2: columnwise sum of the patch histograms.
pub fn sum_histograms(patches: &[Vec<u32>]) -> Vec<u32> {
	tracy::zone!("Histogram sum");

	let mut bins = vec![0u32; HIST_BIN_COUNT];
	for patch in patches {
		for (total, &count) in bins.iter_mut().zip(patch.iter()) {
			*total += count;
		}
	}
	bins
}

pub fn compute_histogram(map: &LocalElevationMap) -> Vec<u32> { sum_histograms(&patch_histograms(map)) }
