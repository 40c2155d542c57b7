use crate::{HIST_BIN_COUNT, HIST_BIN_WIDTH, HIST_MIN_ELEV};

/// Hazard coloring when nearby terrain approaches the aircraft's altitude,
/// relative-peaks coloring when everything is safely below it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RenderingMode {
	Normal,
	Peaks,
}

/// Severity attached to the reported minimum/maximum elevations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElevationMode {
	PeaksMode,
	Caution,
	Warning,
}

impl ElevationMode {
	pub fn is_warning(&self) -> bool { matches!(self, Self::Warning) }

	pub fn is_caution(&self) -> bool { matches!(self, Self::Caution) }
}

/// Color thresholds for one frame, derived from the histogram and the
/// aircraft's trajectory.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderThresholds {
	pub mode: RenderingMode,
	pub min_elevation: i32,
	pub max_elevation: i32,
	pub lower_percentile_elevation: i32,
	pub upper_percentile_elevation: i32,
	// Normal mode bands.
	pub low_density_green: i32,
	pub high_density_green: i32,
	pub low_density_yellow: i32,
	pub high_density_yellow: i32,
	pub high_density_red: i32,
	// Peaks mode bands.
	pub lower_density: i32,
	pub higher_density: i32,
	pub solid_density: i32,
}

/// Selects the rendering mode and derives the color bands.
///
/// A strong descent looks 30 seconds ahead of the aircraft; the gear state
/// tightens the caution band.
pub fn analyze_histogram(
	histogram: &[u32], altitude_ft: i32, vertical_speed_fpm: i32, gear_is_down: bool, cut_off_altitude: i32,
) -> RenderThresholds {
	tracy::zone!("Analyze histogram");

	let gear_down_altitude_offset = if gear_is_down { 250 } else { 500 };
	let reference_altitude = altitude_ft
		+ if vertical_speed_fpm <= -1000 {
			vertical_speed_fpm / 2
		} else {
			0
		};

	let cut_off_bin = (((cut_off_altitude - HIST_MIN_ELEV) / HIST_BIN_WIDTH).max(0) as usize).min(HIST_BIN_COUNT);
	let total: u64 = histogram[cut_off_bin..].iter().map(|&x| x as u64).sum();

	let mut min_bin = None;
	let mut max_bin = None;
	let mut lower_bin = None;
	let mut upper_bin = None;
	let mut cumulative = 0u64;
	for (bin, &count) in histogram.iter().enumerate().skip(cut_off_bin) {
		if count > 0 {
			min_bin.get_or_insert(bin);
			max_bin = Some(bin);
		}
		cumulative += count as u64;
		if total > 0 {
			if lower_bin.is_none() && cumulative as f64 >= total as f64 * 0.85 {
				lower_bin = Some(bin);
			}
			if upper_bin.is_none() && cumulative as f64 >= total as f64 * 0.95 {
				upper_bin = Some(bin);
			}
		}
	}

	let min_elevation = min_bin.map(|bin| bin as i32 * HIST_BIN_WIDTH + HIST_MIN_ELEV).unwrap_or(-1);
	let max_elevation = max_bin
		.map(|bin| (bin as i32 + 1) * HIST_BIN_WIDTH + HIST_MIN_ELEV)
		.unwrap_or(0);
	let lower_percentile_elevation =
		lower_bin.unwrap_or(HIST_BIN_COUNT - 1) as i32 * HIST_BIN_WIDTH + HIST_MIN_ELEV;
	let upper_percentile_elevation =
		upper_bin.unwrap_or(HIST_BIN_COUNT - 1) as i32 * HIST_BIN_WIDTH + HIST_MIN_ELEV;

	let flat_earth = 100 - (max_elevation - min_elevation);
	let half_elevation = max_elevation / 2;

	let mode = if max_elevation >= reference_altitude - gear_down_altitude_offset {
		RenderingMode::Normal
	} else {
		RenderingMode::Peaks
	};

	let mut thresholds = RenderThresholds {
		mode,
		min_elevation,
		max_elevation,
		lower_percentile_elevation,
		upper_percentile_elevation,
		low_density_green: 0,
		high_density_green: 0,
		low_density_yellow: 0,
		high_density_yellow: 0,
		high_density_red: 0,
		lower_density: 0,
		higher_density: 0,
		solid_density: 0,
	};

	match mode {
		RenderingMode::Normal => {
			let mut low_density_green = (min_elevation + 200).max(reference_altitude - 2000);
			if flat_earth >= 0 {
				let ceiling = half_elevation.min(lower_percentile_elevation);
				if low_density_green > ceiling {
					low_density_green = ceiling;
				}
			}

			thresholds.low_density_green = low_density_green;
			thresholds.high_density_green = (min_elevation + 200).max(reference_altitude - 1000);
			thresholds.low_density_yellow = (min_elevation + 200).max(reference_altitude - gear_down_altitude_offset);
			thresholds.high_density_yellow = reference_altitude + 1000;
			thresholds.high_density_red = reference_altitude + 2000;
		},
		RenderingMode::Peaks => {
			let relief = (max_elevation - min_elevation) as f64;
			let mut higher_density =
				upper_percentile_elevation.min((relief * 0.65).round() as i32 + min_elevation);
			let mut solid_density = (relief * 0.95).round() as i32 + min_elevation;
			let lower_density = lower_percentile_elevation.min(half_elevation);

			let increasing = lower_density < higher_density && higher_density < solid_density;
			if !increasing || lower_percentile_elevation > upper_percentile_elevation {
				log::debug!("peaks bands not strictly increasing, upper bands disabled");
				higher_density = max_elevation + 100;
				solid_density = max_elevation + 100;
			}

			thresholds.lower_density = lower_density;
			thresholds.higher_density = higher_density;
			thresholds.solid_density = solid_density;
		},
	}

	thresholds
}

/// The elevations and severities reported alongside every emitted frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ElevationSummary {
	pub minimum_elevation: i32,
	pub minimum_elevation_mode: ElevationMode,
	pub maximum_elevation: i32,
	pub maximum_elevation_mode: ElevationMode,
}

pub fn summarize_elevations(thresholds: &RenderThresholds, cut_off_altitude: i32) -> ElevationSummary {
	match thresholds.mode {
		RenderingMode::Normal => ElevationSummary {
			minimum_elevation: cut_off_altitude.max(thresholds.low_density_green),
			minimum_elevation_mode: if thresholds.low_density_yellow <= thresholds.high_density_green {
				ElevationMode::Warning
			} else {
				ElevationMode::PeaksMode
			},
			maximum_elevation: thresholds.max_elevation,
			maximum_elevation_mode: if thresholds.max_elevation >= thresholds.high_density_red {
				ElevationMode::Caution
			} else {
				ElevationMode::Warning
			},
		},
		RenderingMode::Peaks => {
			let (minimum_elevation, maximum_elevation) = if thresholds.max_elevation < 0 {
				(-1, 0)
			} else {
				(
					thresholds.lower_density.max(thresholds.min_elevation),
					thresholds.max_elevation,
				)
			};

			ElevationSummary {
				minimum_elevation,
				minimum_elevation_mode: ElevationMode::PeaksMode,
				maximum_elevation,
				maximum_elevation_mode: ElevationMode::PeaksMode,
			}
		},
	}
}
