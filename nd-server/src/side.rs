use std::time::Instant;

use render::{MapImage, NavigationDisplayConfig, RenderThresholds};

use crate::messages::Side;

/// What a pushed display configuration means for a side.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigChange {
	Unchanged,
	Activated,
	Reset,
}

/// A sweep in progress: the freshly rendered frame being revealed over the
/// previous one, plus the transition frames buffered for pull requests.
pub struct ActiveSweep {
	pub image: MapImage,
	pub thresholds: RenderThresholds,
	pub cut_off_altitude: i32,
	pub config: NavigationDisplayConfig,
	pub start_angle: f64,
	pub end_angle: f64,
	pub emitted: u32,
	pub frames: Vec<Vec<u8>>,
}

/// Per-side scheduler state.
pub struct SideState {
	pub side: Side,
	pub config: Option<NavigationDisplayConfig>,
	pub last_frame: Option<MapImage>,
	pub sweep: Option<ActiveSweep>,
	pub startup: Instant,
	pub reset_rendering_data: bool,
	/// Bumped to cancel every timer scheduled for this side.
	pub generation: u64,
}

impl SideState {
	pub fn new(side: Side, startup: Instant) -> Self {
		Self {
			side,
			config: None,
			last_frame: None,
			sweep: None,
			startup,
			reset_rendering_data: false,
			generation: 0,
		}
	}

	pub fn is_active(&self) -> bool { self.config.map(|x| x.active).unwrap_or(false) }

	/// Applies a pushed configuration and classifies the transition.
	///
	/// Any change while the side is active supersedes the running state and
	/// forces a reset; changes while idle only take effect once the side
	/// activates.
	pub fn apply_config(&mut self, config: NavigationDisplayConfig) -> ConfigChange {
		match self.config.replace(config) {
			None if config.active => ConfigChange::Activated,
			None => ConfigChange::Unchanged,
			Some(previous) if previous == config => ConfigChange::Unchanged,
			Some(previous) if previous.active => ConfigChange::Reset,
			Some(_) if config.active => ConfigChange::Activated,
			Some(_) => ConfigChange::Unchanged,
		}
	}

	/// Cancels pending work and clears the sweep source so the next render
	/// starts from scratch.
	pub fn reset(&mut self) {
		self.generation += 1;
		self.sweep = None;
		self.last_frame = None;
		self.reset_rendering_data = true;
	}
}
