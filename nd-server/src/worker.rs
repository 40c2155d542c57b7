use std::{
	cmp::{Ordering, Reverse},
	collections::BinaryHeap,
	sync::Arc,
	time::{Duration, Instant},
};

use crossbeam::channel::{Receiver, RecvTimeoutError};
use dashmap::DashMap;
use geodesy::LatLon;
use render::{
	compose_frame,
	render_navigation_display,
	summarize_elevations,
	AircraftState,
	ElevationMode,
	MapImage,
	PatternMap,
	TerrainRenderingMode,
	FRAME_VALIDITY_MS,
	RENDERING_CANVAS_HEIGHT,
	RENDERING_CANVAS_WIDTH,
	RENDER_INTERVAL_MS,
	STARTUP_STAGGER_MS,
	SWEEP_ANGULAR_STEP_DEG,
	SWEEP_INTERVAL_MS,
	SWEEP_TOTAL_ANGLE_DEG,
};
use terrain::{TileStore, WorldMapCache};

use crate::{
	messages::{AircraftStatus, FrameDataSnapshot, FrameMetadata, Side, SimulatorLink, ThresholdSnapshot, WorkerMessage},
	side::{ActiveSweep, ConfigChange, SideState},
};

#[derive(Copy, Clone, Eq, PartialEq)]
enum TimerAction {
	Render,
	Sweep,
}

struct TimerEntry {
	deadline: Instant,
	side: Side,
	action: TimerAction,
	generation: u64,
}

impl PartialEq for TimerEntry {
	fn eq(&self, other: &Self) -> bool { self.deadline == other.deadline }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for TimerEntry {
	fn cmp(&self, other: &Self) -> Ordering { self.deadline.cmp(&other.deadline) }
}

/// The dedicated render task: owns the world-map cache and the pattern map,
/// drains the simulator mailbox, and drives both sides' sweeps off a timer
/// queue.
pub struct RenderWorker {
	store: TileStore,
	world: WorldMapCache,
	pattern: Option<PatternMap>,
	aircraft: Option<AircraftState>,
	capt: SideState,
	fo: SideState,
	rx: Receiver<WorkerMessage>,
	link: Box<dyn SimulatorLink>,
	snapshots: Arc<DashMap<Side, FrameDataSnapshot>>,
	timers: BinaryHeap<Reverse<TimerEntry>>,
	epoch: Instant,
}

impl RenderWorker {
	pub fn new(
		store: TileStore, rx: Receiver<WorkerMessage>, link: Box<dyn SimulatorLink>,
		snapshots: Arc<DashMap<Side, FrameDataSnapshot>>,
	) -> Self {
		let epoch = Instant::now();
		let stagger = Duration::from_millis(STARTUP_STAGGER_MS);

		Self {
			store,
			world: WorldMapCache::new(),
			pattern: None,
			aircraft: None,
			capt: SideState::new(Side::Capt, epoch),
			// Side R leads so the two sweep phases interleave.
			fo: SideState::new(Side::Fo, epoch.checked_sub(stagger).unwrap_or(epoch)),
			rx,
			link,
			snapshots,
			timers: BinaryHeap::new(),
			epoch,
		}
	}

	pub fn run(mut self) {
		{
			let pattern = PatternMap::for_mode(TerrainRenderingMode::ArcMode);
			let start = Instant::now();
			render::warm_up(&mut self.world, &mut self.store, &pattern);
			log::info!("kernel warm-up took {:?}", start.elapsed());
		}

		loop {
			self.fire_due_timers();

			let timeout = self
				.timers
				.peek()
				.map(|Reverse(entry)| entry.deadline.saturating_duration_since(Instant::now()));
			let message = match timeout {
				Some(timeout) => match self.rx.recv_timeout(timeout) {
					Ok(x) => Some(x),
					Err(RecvTimeoutError::Timeout) => None,
					Err(RecvTimeoutError::Disconnected) => {
						log::warn!("simulator mailbox closed");
						self.shutdown();
						return;
					},
				},
				None => match self.rx.recv() {
					Ok(x) => Some(x),
					Err(_) => {
						log::warn!("simulator mailbox closed");
						self.shutdown();
						return;
					},
				},
			};

			match message {
				Some(WorkerMessage::Shutdown) => {
					self.shutdown();
					return;
				},
				Some(message) => self.dispatch(message),
				None => {},
			}
		}
	}

	fn dispatch(&mut self, message: WorkerMessage) {
		match message {
			WorkerMessage::ConnectionLost => self.connection_lost(),
			WorkerMessage::PositionUpdate(position) => {
				let position = LatLon::new(position.lat, position.lon);
				if let Some(aircraft) = &mut self.aircraft {
					aircraft.position = position;
				}
				self.world.update_position(&mut self.store, position);
			},
			WorkerMessage::AircraftStatusUpdate(status) => self.aircraft_status_update(*status),
			WorkerMessage::Shutdown => {},
		}
	}

	fn aircraft_status_update(&mut self, status: AircraftStatus) {
		if self.pattern.is_none() {
			self.pattern = Some(PatternMap::for_mode(status.navigation_display_rendering_mode));
		}

		if status.adiru_data_valid {
			let position = LatLon::new(status.latitude, status.longitude);
			self.aircraft = Some(AircraftState {
				position,
				altitude_ft: status.altitude_ft,
				heading_deg: status.heading_deg,
				vertical_speed_fpm: status.vertical_speed_fpm,
				gear_is_down: status.gear_is_down,
				destination: status
					.destination_data_valid
					.then(|| LatLon::new(status.destination_latitude, status.destination_longitude)),
			});
			self.world.update_position(&mut self.store, position);
		}

		self.apply_side_config(Side::Capt, status.navigation_display_capt);
		self.apply_side_config(Side::Fo, status.navigation_display_fo);
	}

	fn apply_side_config(&mut self, side: Side, config: render::NavigationDisplayConfig) {
		match self.side_mut(side).apply_config(config) {
			ConfigChange::Unchanged => {},
			ConfigChange::Activated => self.schedule(side, TimerAction::Render, Duration::ZERO),
			ConfigChange::Reset => {
				self.side_mut(side).reset();
				self.snapshots.remove(&side);
				self.link.send_metadata(side, &FrameMetadata::reset());
				if config.active {
					self.schedule(side, TimerAction::Render, Duration::ZERO);
				}
			},
		}
	}

	fn connection_lost(&mut self) {
		for side in [Side::Capt, Side::Fo] {
			let was_active = self.side(side).is_active();
			self.side_mut(side).reset();
			self.side_mut(side).config = None;
			self.snapshots.remove(&side);
			if was_active {
				self.link.send_metadata(side, &FrameMetadata::reset());
			}
		}

		// A reconnect replays the staggered startup.
		let now = Instant::now();
		let stagger = Duration::from_millis(STARTUP_STAGGER_MS);
		self.capt.startup = now;
		self.fo.startup = now.checked_sub(stagger).unwrap_or(now);

		self.aircraft = None;
		self.world.clear();
		self.store.release_all();
	}

	fn shutdown(&mut self) {
		for side in [Side::Capt, Side::Fo] {
			if self.side(side).is_active() {
				self.link.send_metadata(side, &FrameMetadata::reset());
			}
			self.side_mut(side).reset();
		}
		log::info!("render worker shut down");
	}

	fn side(&self, side: Side) -> &SideState {
		match side {
			Side::Capt => &self.capt,
			Side::Fo => &self.fo,
		}
	}

	fn side_mut(&mut self, side: Side) -> &mut SideState {
		match side {
			Side::Capt => &mut self.capt,
			Side::Fo => &mut self.fo,
		}
	}

	fn schedule(&mut self, side: Side, action: TimerAction, delay: Duration) {
		let generation = self.side(side).generation;
		self.timers.push(Reverse(TimerEntry {
			deadline: Instant::now() + delay,
			side,
			action,
			generation,
		}));
	}

	fn fire_due_timers(&mut self) {
		loop {
			let now = Instant::now();
			match self.timers.peek() {
				Some(Reverse(entry)) if entry.deadline <= now => {},
				_ => break,
			}

			if let Some(Reverse(entry)) = self.timers.pop() {
				// Cancelled by a reconfiguration.
				if entry.generation != self.side(entry.side).generation {
					continue;
				}
				match entry.action {
					TimerAction::Render => self.render_tick(entry.side),
					TimerAction::Sweep => self.sweep_tick(entry.side),
				}
			}
		}
	}

	fn render_tick(&mut self, side: Side) {
		let config = match self.side(side).config {
			Some(x) if x.active => x,
			_ => {
				log::warn!("{}: render tick without an active display configuration", side.letter());
				return;
			},
		};
		let aircraft = match self.aircraft {
			Some(x) => x,
			None => {
				log::warn!("{}: render tick without aircraft state", side.letter());
				self.schedule(side, TimerAction::Render, Duration::from_millis(RENDER_INTERVAL_MS));
				return;
			},
		};

		self.world.update_position(&mut self.store, aircraft.position);

		if self.world.is_empty() {
			// Nothing to draw: report the empty statistics and retry later.
			self.link.send_metadata(
				side,
				&FrameMetadata {
					minimum_elevation: -1,
					minimum_elevation_mode: ElevationMode::PeaksMode,
					maximum_elevation: 0,
					maximum_elevation_mode: ElevationMode::PeaksMode,
					first_frame: true,
					display_range: config.range_nm,
					display_mode: config.efis_mode,
					frame_byte_count: 0,
				},
			);
			self.schedule(side, TimerAction::Render, Duration::from_millis(RENDER_INTERVAL_MS));
			return;
		}

		let pattern = match &self.pattern {
			Some(x) => x,
			None => {
				log::warn!("{}: render tick before the pattern map was initialized", side.letter());
				self.schedule(side, TimerAction::Render, Duration::from_millis(RENDER_INTERVAL_MS));
				return;
			},
		};

		let rendered = render_navigation_display(&self.world, &aircraft, &config, pattern);

		let state = self.side_mut(side);
		state.reset_rendering_data = false;

		// The very first emission resyncs onto the continuous sweep phase.
		let start_angle = if state.last_frame.is_none() {
			let elapsed = state.startup.elapsed().as_millis() as u64;
			let fraction = (elapsed % FRAME_VALIDITY_MS) as f64 / FRAME_VALIDITY_MS as f64;
			(fraction * SWEEP_TOTAL_ANGLE_DEG / SWEEP_ANGULAR_STEP_DEG).floor() * SWEEP_ANGULAR_STEP_DEG
		} else {
			0.0
		};

		state.sweep = Some(ActiveSweep {
			image: MapImage::from_colorized(&rendered.image),
			thresholds: rendered.thresholds,
			cut_off_altitude: rendered.cut_off_altitude,
			config,
			start_angle,
			end_angle: start_angle,
			emitted: 0,
			frames: Vec::new(),
		});
		self.schedule(side, TimerAction::Sweep, Duration::ZERO);
	}

	fn sweep_tick(&mut self, side: Side) {
		if self.side(side).reset_rendering_data {
			return;
		}
		let mut sweep = match self.side_mut(side).sweep.take() {
			Some(x) => x,
			None => return,
		};

		sweep.end_angle += SWEEP_ANGULAR_STEP_DEG;
		if sweep.end_angle >= SWEEP_TOTAL_ANGLE_DEG {
			// Sweep complete: latch the frame and wait out the interval.
			let state = self.side_mut(side);
			state.last_frame = Some(sweep.image);
			self.schedule(side, TimerAction::Render, Duration::from_millis(RENDER_INTERVAL_MS));
			return;
		}

		let canvas = compose_frame(
			&sweep.config,
			&sweep.image,
			self.side(side).last_frame.as_ref(),
			sweep.start_angle,
			sweep.end_angle,
		);
		match encode_png(&canvas) {
			Ok(png) => {
				let summary = summarize_elevations(&sweep.thresholds, sweep.cut_off_altitude);
				self.link.send_metadata(
					side,
					&FrameMetadata {
						minimum_elevation: summary.minimum_elevation,
						minimum_elevation_mode: summary.minimum_elevation_mode,
						maximum_elevation: summary.maximum_elevation,
						maximum_elevation_mode: summary.maximum_elevation_mode,
						first_frame: sweep.emitted == 0,
						display_range: sweep.config.range_nm,
						display_mode: sweep.config.efis_mode,
						frame_byte_count: png.len() as u32,
					},
				);
				self.link.send_frame(side, &png);
				sweep.emitted += 1;
				sweep.frames.push(png);
				self.publish_snapshot(side, &sweep);
			},
			// The frame is dropped; the sweep carries on.
			Err(e) => log::error!("{}: frame encode failed: {}", side.letter(), e),
		}

		self.side_mut(side).sweep = Some(sweep);
		self.schedule(side, TimerAction::Sweep, Duration::from_millis(SWEEP_INTERVAL_MS));
	}

	fn publish_snapshot(&self, side: Side, sweep: &ActiveSweep) {
		let summary = summarize_elevations(&sweep.thresholds, sweep.cut_off_altitude);
		self.snapshots.insert(
			side,
			FrameDataSnapshot {
				side: side.letter(),
				timestamp_ms: self.epoch.elapsed().as_millis() as u64,
				thresholds: ThresholdSnapshot::from_summary(&summary),
				frames: sweep.frames.clone(),
			},
		);
	}
}

fn encode_png(rgba: &[u8]) -> Result<Vec<u8>, png::EncodingError> {
	tracy::zone!("Encode PNG");

	let mut out = Vec::new();
	let mut encoder = png::Encoder::new(&mut out, RENDERING_CANVAS_WIDTH as u32, RENDERING_CANVAS_HEIGHT as u32);
	encoder.set_color(png::ColorType::Rgba);
	encoder.set_depth(png::BitDepth::Eight);
	let mut writer = encoder.write_header()?;
	writer.write_image_data(rgba)?;
	writer.finish()?;

	Ok(out)
}
