use geodesy::{distance_wgs84, LatLon, FEET_PER_NAUTICAL_MILE};
use terrain::{WorldMapCache, ELEVATION_INVALID};

use crate::HIST_MIN_ELEV;

pub const CUT_OFF_ALTITUDE_MINIMUM: i32 = 200;
pub const CUT_OFF_ALTITUDE_MAXIMUM: i32 = 400;

/// The altitude floor below which terrain is not drawn.
///
/// Far from the destination the floor stays at the maximum; on a shallow
/// final approach it drops towards the minimum so the runway environment
/// stays visible.
pub fn cut_off_altitude(
	world: &WorldMapCache, position: LatLon, altitude_ft: i32, destination: Option<LatLon>,
) -> i32 {
	let destination = match destination {
		Some(x) => x,
		None => return HIST_MIN_ELEV,
	};

	let destination_elevation = world.extract_elevation(destination);
	if destination_elevation == ELEVATION_INVALID {
		log::warn!("destination elevation unavailable, terrain cut-off disabled");
		return HIST_MIN_ELEV;
	}

	let distance_nm = distance_wgs84(position, destination);
	if distance_nm > 4.0 {
		return CUT_OFF_ALTITUDE_MAXIMUM;
	}

	let glide_rad =
		((altitude_ft - destination_elevation as i32) as f64 / (distance_nm * FEET_PER_NAUTICAL_MILE)).atan();
	if glide_rad >= 3.0_f64.to_radians() {
		return CUT_OFF_ALTITUDE_MAXIMUM;
	}
	if distance_nm <= 1.0 || glide_rad == 0.0 {
		return CUT_OFF_ALTITUDE_MINIMUM;
	}

	let span = (CUT_OFF_ALTITUDE_MAXIMUM - CUT_OFF_ALTITUDE_MINIMUM) as f64;
	let interpolated = CUT_OFF_ALTITUDE_MINIMUM as f64 + (distance_nm - 1.0) / 3.0 * span;
	(interpolated.round() as i32).clamp(CUT_OFF_ALTITUDE_MINIMUM, CUT_OFF_ALTITUDE_MAXIMUM)
}
