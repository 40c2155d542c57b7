use geodesy::rad2deg;

use crate::{
	ColorizedFrame,
	NavigationDisplayConfig,
	RENDERING_BACKGROUND_COLOR,
	RENDERING_CANVAS_HEIGHT,
	RENDERING_CANVAS_WIDTH,
	RENDERING_MAP_START_OFFSET_Y,
};

/// One sweep step per 40 ms tick, 4 degrees each, over a 90 degree fan.
pub const SWEEP_ANGULAR_STEP_DEG: f64 = 4.0;
pub const SWEEP_INTERVAL_MS: u64 = 40;
pub const SWEEP_TOTAL_ANGLE_DEG: f64 = 90.0;
/// How long an emitted frame stays representative of the aircraft state.
pub const FRAME_VALIDITY_MS: u64 = 2500;
/// Pause between the end of one sweep and the next render.
pub const RENDER_INTERVAL_MS: u64 = 1500;
/// Offset between the two sides' startup timestamps.
pub const STARTUP_STAGGER_MS: u64 = 1500;

/// An RGBA map payload with the metadata row already stripped.
#[derive(Clone)]
pub struct MapImage {
	pub width: usize,
	pub height: usize,
	pub data: Vec<u8>,
}

impl MapImage {
	/// Splits the statistics row off a colorizer output and narrows the
	/// remaining rows to RGBA bytes.
	pub fn from_colorized(frame: &ColorizedFrame) -> Self {
		let height = frame.height - 1;
		let mut data = Vec::with_capacity(frame.width * height * 4);
		for pixel in &frame.data[..frame.width * height] {
			data.extend(pixel.map(|channel| channel.clamp(0, 255) as u8));
		}

		Self {
			width: frame.width,
			height,
			data,
		}
	}

	fn pixel(&self, x: usize, y: usize) -> &[u8] { &self.data[(y * self.width + x) * 4..][..4] }
}

/// Embeds the map payload into the screen canvas, revealing the wedge
/// between `start_angle` and `end_angle` from the new frame and everything
/// else from the previous one (or the background if there is none).
pub fn compose_frame(
	config: &NavigationDisplayConfig, new: &MapImage, previous: Option<&MapImage>, start_angle: f64,
	end_angle: f64,
) -> Vec<u8> {
	tracy::zone!("Compose frame");

	let mut canvas = RENDERING_BACKGROUND_COLOR.repeat(RENDERING_CANVAS_WIDTH * RENDERING_CANVAS_HEIGHT);

	for y in 0..config.map_height {
		for x in 0..config.map_width {
			let canvas_x = config.map_offset_x + x;
			let canvas_y = RENDERING_MAP_START_OFFSET_Y + y;

			let dx = canvas_x as f64 - (RENDERING_CANVAS_WIDTH / 2) as f64;
			let dy = (config.map_height - y) as f64;
			let angle = rad2deg((dy / (dx * dx + dy * dy).sqrt()).acos());

			let source = if start_angle <= angle && angle <= end_angle {
				Some(new)
			} else {
				previous
			};

			if let Some(image) = source {
				let pixel = image.pixel(x, y);
				if pixel[3] != 0 {
					canvas[(canvas_y * RENDERING_CANVAS_WIDTH + canvas_x) * 4..][..4].copy_from_slice(pixel);
				}
			}
		}
	}

	canvas
}

#[cfg(test)]
mod tests {
	use super::*;

	fn solid_image(config: &NavigationDisplayConfig, color: [u8; 4]) -> MapImage {
		MapImage {
			width: config.map_width,
			height: config.map_height,
			data: color.repeat(config.map_width * config.map_height),
		}
	}

	fn canvas_pixel(canvas: &[u8], x: usize, y: usize) -> &[u8] { &canvas[(y * RENDERING_CANVAS_WIDTH + x) * 4..][..4] }

	#[test]
	fn outside_the_map_region_is_background() {
		let config = NavigationDisplayConfig::new(true, true, 10, 0);
		let new = solid_image(&config, [255, 0, 0, 255]);

		let canvas = compose_frame(&config, &new, None, 0.0, 90.0);
		assert_eq!(canvas.len(), RENDERING_CANVAS_WIDTH * RENDERING_CANVAS_HEIGHT * 4);
		assert_eq!(canvas_pixel(&canvas, 0, 0), RENDERING_BACKGROUND_COLOR);
		assert_eq!(canvas_pixel(&canvas, 383, 127), RENDERING_BACKGROUND_COLOR);
		assert_eq!(canvas_pixel(&canvas, 383, 620 + 1), RENDERING_BACKGROUND_COLOR);
	}

	#[test]
	fn wedge_pixels_come_from_the_new_frame() {
		let config = NavigationDisplayConfig::new(true, true, 10, 0);
		let new = solid_image(&config, [255, 0, 0, 255]);
		let previous = solid_image(&config, [0, 255, 0, 255]);

		let canvas = compose_frame(&config, &new, Some(&previous), 0.0, 45.0);

		// Straight up the boresight lies inside the wedge.
		assert_eq!(canvas_pixel(&canvas, 384, RENDERING_MAP_START_OFFSET_Y + 10), [255, 0, 0, 255]);
		// Near-horizontal pixels are still the previous frame.
		assert_eq!(
			canvas_pixel(&canvas, 384 + 300, RENDERING_MAP_START_OFFSET_Y + config.map_height - 2),
			[0, 255, 0, 255]
		);
	}

	#[test]
	fn without_a_previous_frame_the_rest_is_background() {
		let config = NavigationDisplayConfig::new(true, true, 10, 0);
		let new = solid_image(&config, [255, 0, 0, 255]);

		let canvas = compose_frame(&config, &new, None, 0.0, 45.0);
		assert_eq!(
			canvas_pixel(&canvas, 384 + 300, RENDERING_MAP_START_OFFSET_Y + config.map_height - 2),
			RENDERING_BACKGROUND_COLOR
		);
	}

	#[test]
	fn transparent_map_pixels_leave_the_background() {
		let config = NavigationDisplayConfig::new(true, true, 10, 0);
		let new = solid_image(&config, [0, 0, 0, 0]);

		let canvas = compose_frame(&config, &new, None, 0.0, 90.0);
		assert_eq!(canvas_pixel(&canvas, 384, RENDERING_MAP_START_OFFSET_Y + 10), RENDERING_BACKGROUND_COLOR);
	}

	#[test]
	fn metadata_row_is_stripped() {
		let frame = ColorizedFrame {
			width: 2,
			height: 3,
			data: vec![[300, -5, 0, 255]; 6],
		};
		let image = MapImage::from_colorized(&frame);
		assert_eq!((image.width, image.height), (2, 2));
		assert_eq!(image.data.len(), 16);
		// Channels narrow to the displayable range.
		assert_eq!(&image.data[..4], &[255, 0, 0, 255]);
	}
}
