use render::{ElevationMode, ElevationSummary, NavigationDisplayConfig, TerrainRenderingMode};
use serde::Serialize;

/// The two navigation displays, captain and first officer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Side {
	Capt,
	Fo,
}

impl Side {
	pub fn letter(&self) -> &'static str {
		match self {
			Self::Capt => "L",
			Self::Fo => "R",
		}
	}

	pub fn from_letter(letter: &str) -> Option<Self> {
		match letter {
			"L" => Some(Self::Capt),
			"R" => Some(Self::Fo),
			_ => None,
		}
	}
}

/// Ground-truth position pushed by the simulator.
#[derive(Copy, Clone, Debug)]
pub struct PositionData {
	pub lat: f64,
	pub lon: f64,
}

/// The full simulator state snapshot, including both sides' display setup.
#[derive(Clone, Debug)]
pub struct AircraftStatus {
	pub adiru_data_valid: bool,
	pub latitude: f64,
	pub longitude: f64,
	pub altitude_ft: i32,
	pub heading_deg: f64,
	pub vertical_speed_fpm: i32,
	pub gear_is_down: bool,
	pub destination_data_valid: bool,
	pub destination_latitude: f64,
	pub destination_longitude: f64,
	pub navigation_display_capt: NavigationDisplayConfig,
	pub navigation_display_fo: NavigationDisplayConfig,
	pub navigation_display_rendering_mode: TerrainRenderingMode,
}

/// Mailbox messages of the render worker.
pub enum WorkerMessage {
	ConnectionLost,
	PositionUpdate(PositionData),
	AircraftStatusUpdate(Box<AircraftStatus>),
	Shutdown,
}

/// The statistics sent alongside every emitted frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameMetadata {
	pub minimum_elevation: i32,
	pub minimum_elevation_mode: ElevationMode,
	pub maximum_elevation: i32,
	pub maximum_elevation_mode: ElevationMode,
	pub first_frame: bool,
	pub display_range: u32,
	pub display_mode: u8,
	pub frame_byte_count: u32,
}

impl FrameMetadata {
	/// Tells the consumer there is no frame any more.
	pub fn reset() -> Self {
		Self {
			minimum_elevation: -1,
			minimum_elevation_mode: ElevationMode::PeaksMode,
			maximum_elevation: -1,
			maximum_elevation_mode: ElevationMode::PeaksMode,
			first_frame: true,
			display_range: 0,
			display_mode: 0,
			frame_byte_count: 0,
		}
	}
}

/// Where emitted frames and their metadata go. The simulator connector
/// plugs in here.
pub trait SimulatorLink: Send {
	fn send_metadata(&self, side: Side, metadata: &FrameMetadata);
	fn send_frame(&self, side: Side, png: &[u8]);
}

/// The severity flags reported over the control plane.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSnapshot {
	pub min_elevation: i32,
	pub min_elevation_is_warning: bool,
	pub min_elevation_is_caution: bool,
	pub max_elevation: i32,
	pub max_elevation_is_warning: bool,
	pub max_elevation_is_caution: bool,
}

impl ThresholdSnapshot {
	pub fn from_summary(summary: &ElevationSummary) -> Self {
		Self {
			min_elevation: summary.minimum_elevation,
			min_elevation_is_warning: summary.minimum_elevation_mode.is_warning(),
			min_elevation_is_caution: summary.minimum_elevation_mode.is_caution(),
			max_elevation: summary.maximum_elevation,
			max_elevation_is_warning: summary.maximum_elevation_mode.is_warning(),
			// TODO: mirrors the warning flag; needs product clarification.
			max_elevation_is_caution: summary.maximum_elevation_mode.is_warning(),
		}
	}
}

/// A deep copy of one side's last transition, served over the control
/// plane.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDataSnapshot {
	pub side: &'static str,
	pub timestamp_ms: u64,
	pub thresholds: ThresholdSnapshot,
	pub frames: Vec<Vec<u8>>,
}
