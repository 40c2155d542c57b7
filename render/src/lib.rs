//! The navigation-display terrain rasterizer.
//!
//! Projects the world-map cache into the display frame, classifies every
//! pixel against the aircraft's trajectory, and composes the radar-sweep
//! canvas. The per-pixel kernels run on the rayon thread pool and are
//! bit-deterministic regardless of thread count.

use geodesy::LatLon;

mod colorize;
mod cutoff;
mod frame;
mod histogram;
mod localmap;
mod pattern;
mod pipeline;
mod thresholds;

pub use colorize::*;
pub use cutoff::*;
pub use frame::*;
pub use histogram::*;
pub use localmap::*;
pub use pattern::*;
pub use pipeline::*;
pub use thresholds::*;

pub const RENDERING_CANVAS_WIDTH: usize = 768;
pub const RENDERING_CANVAS_HEIGHT: usize = 768;
pub const RENDERING_MAP_START_OFFSET_Y: usize = 128;
pub const RENDERING_BACKGROUND_COLOR: [u8; 4] = [4, 4, 5, 255];

pub const ARC_MODE_MAP_WIDTH: usize = 756;
pub const ARC_MODE_MAP_HEIGHT: usize = 492;
pub const ROSE_MODE_MAP_WIDTH: usize = 678;
pub const ROSE_MODE_MAP_HEIGHT: usize = 250;

/// Selects the stipple pattern set frames are drawn with; an extension point
/// for future display presentations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TerrainRenderingMode {
	ArcMode,
}

/// Per-side display setup, with the canvas placement derived from the
/// presentation style.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NavigationDisplayConfig {
	pub active: bool,
	pub arc_mode: bool,
	pub range_nm: u32,
	pub efis_mode: u8,
	pub map_width: usize,
	pub map_height: usize,
	pub map_offset_x: usize,
}

impl NavigationDisplayConfig {
	pub fn new(active: bool, arc_mode: bool, range_nm: u32, efis_mode: u8) -> Self {
		let (map_width, map_height) = if arc_mode {
			(ARC_MODE_MAP_WIDTH, ARC_MODE_MAP_HEIGHT)
		} else {
			(ROSE_MODE_MAP_WIDTH, ROSE_MODE_MAP_HEIGHT)
		};

		Self {
			active,
			arc_mode,
			range_nm,
			efis_mode,
			map_width,
			map_height,
			map_offset_x: (RENDERING_CANVAS_WIDTH - map_width) / 2,
		}
	}

	pub fn inactive() -> Self { Self::new(false, true, 10, 0) }
}

/// The live aircraft state a frame is rendered against.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AircraftState {
	pub position: LatLon,
	pub altitude_ft: i32,
	pub heading_deg: f64,
	pub vertical_speed_fpm: i32,
	pub gear_is_down: bool,
	pub destination: Option<LatLon>,
}
